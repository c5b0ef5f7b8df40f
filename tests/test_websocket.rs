//! Tests for `WebSocketTransport` against a loopback websocket server

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rtc_chat_session::{
    ChatSession, ConnectionStatus, ConnectionTarget, Connector, OutboundChatMsg, SessionOptions,
    Transport, WebSocketConnector,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

async fn listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("ws://{}/api/chat", listener.local_addr().unwrap());
    (listener, endpoint)
}

#[tokio::test]
async fn test_transport_round_trip() {
    let (listener, endpoint) = listener().await;
    let seen_uri = Arc::new(Mutex::new(String::new()));

    let server = tokio::spawn({
        let seen_uri = Arc::clone(&seen_uri);
        async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                *seen_uri.lock() = req.uri().to_string();
                Ok(resp)
            };
            let mut ws = tokio_tungstenite::accept_hdr_async(tcp, callback)
                .await
                .unwrap();

            let Some(Ok(Message::Text(received))) = ws.next().await else {
                panic!("expected a text frame");
            };
            ws.send(Message::Text(format!("echo:{received}"))).await.unwrap();
            ws.close(None).await.unwrap();
        }
    });

    let target = ConnectionTarget::new("agent-7", "secret").with_endpoint(endpoint);
    let mut transport = WebSocketConnector::new(Duration::from_secs(5))
        .transport(&target)
        .unwrap();
    assert!(!transport.is_ready());

    transport.connect().await.unwrap();
    assert!(transport.is_ready());
    assert!(!format!("{transport:?}").contains("secret"));

    let mut inbound = transport.read_messages();
    transport.write("ping").await.unwrap();

    let reply = inbound.recv().await.unwrap().unwrap();
    assert_eq!(reply, "echo:ping");
    assert!(inbound.recv().await.is_none());

    server.await.unwrap();
    let uri = seen_uri.lock().clone();
    assert!(uri.starts_with("/api/chat?"));
    assert!(uri.contains("agentId=agent-7"));
    assert!(uri.contains("token=secret"));

    transport.close().await.unwrap();
    assert!(!transport.is_ready());
    assert!(transport.write("late").await.is_err());
}

#[tokio::test]
async fn test_connect_refused_is_an_error() {
    let (listener, endpoint) = listener().await;
    drop(listener);

    let target = ConnectionTarget::new("a", "t").with_endpoint(endpoint);
    let mut transport = WebSocketConnector::new(Duration::from_secs(2))
        .transport(&target)
        .unwrap();
    assert!(transport.connect().await.is_err());
    assert!(!transport.is_ready());
}

#[tokio::test]
async fn test_oversized_frames_are_dropped() {
    let (listener, endpoint) = listener().await;

    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        ws.send(Message::Text("x".repeat(64))).await.unwrap();
        ws.send(Message::Text("small".to_string())).await.unwrap();
        ws.close(None).await.unwrap();
    });

    let target = ConnectionTarget::new("a", "t").with_endpoint(endpoint);
    let mut transport = WebSocketConnector::new(Duration::from_secs(5))
        .with_max_frame_size(16)
        .transport(&target)
        .unwrap();
    transport.connect().await.unwrap();

    let mut inbound = transport.read_messages();
    assert_eq!(inbound.recv().await.unwrap().unwrap(), "small");
    assert!(inbound.recv().await.is_none());

    server.await.unwrap();
    transport.close().await.unwrap();
}

#[tokio::test]
async fn test_session_over_websocket() {
    let (listener, endpoint) = listener().await;

    // Streams a reply to every prompt as three cumulative snapshots
    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        while let Some(Ok(message)) = ws.next().await {
            let Message::Text(raw) = message else {
                continue;
            };
            let prompt: OutboundChatMsg = serde_json::from_str(&raw).unwrap();
            let reply = format!("you said {}", prompt.text);
            for end in [3, 8, reply.len()] {
                let frame = json!({
                    "type": "ChatMsg",
                    "id": format!("r-{}", prompt.id),
                    "text": &reply[..end],
                    "sender": "Agent"
                });
                ws.send(Message::Text(frame.to_string())).await.unwrap();
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    });

    let options = SessionOptions::builder()
        .target(ConnectionTarget::new("agent", "token").with_endpoint(endpoint))
        .silence_window(Duration::from_millis(100))
        .build();
    let session = ChatSession::builder(options).spawn();

    session.ensure_open().await.unwrap();
    assert_eq!(session.connection_status(), ConnectionStatus::Open);

    session.submit_user_message("hi").await.unwrap();

    let mut agent_reply = None;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if let Some(message) = session.history().get(1) {
            agent_reply = Some(message.text.clone());
            break;
        }
    }
    assert_eq!(agent_reply.as_deref(), Some("you said hi"));

    session.shutdown().await;
    assert_eq!(session.connection_status(), ConnectionStatus::Closed);
    let _ = server.await;
}
