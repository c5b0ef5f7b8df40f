//! In-memory transport shared by the integration tests
//!
//! `MockConnector` records every open attempt and every written frame, and
//! lets a test inject inbound frames into (or sever) the current connection.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rtc_chat_session::{
    ChatError, ConnectionTarget, Connector, OutboundChatMsg, Result, SessionOptions, Transport,
};
use serde_json::json;
use tokio::sync::mpsc;

#[derive(Default)]
struct MockState {
    opens: AtomicUsize,
    failing: AtomicBool,
    write_failing: AtomicBool,
    delay: Mutex<Duration>,
    close_delay: Mutex<Duration>,
    endpoints: Mutex<Vec<String>>,
    sent: Mutex<Vec<OutboundChatMsg>>,
    inbound: Mutex<Option<mpsc::UnboundedSender<Result<String>>>>,
}

#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<MockState>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of handshakes attempted
    pub fn open_count(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }

    /// Make subsequent handshakes fail
    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }

    /// Delay every handshake by `delay`
    pub fn set_connect_delay(&self, delay: Duration) {
        *self.state.delay.lock() = delay;
    }

    /// Make writes on open connections fail as if the socket broke
    pub fn set_write_failing(&self, failing: bool) {
        self.state.write_failing.store(failing, Ordering::SeqCst);
    }

    /// Delay every close by `delay`
    pub fn set_close_delay(&self, delay: Duration) {
        *self.state.close_delay.lock() = delay;
    }

    /// Endpoint of the most recent transport
    pub fn last_endpoint(&self) -> Option<String> {
        self.state.endpoints.lock().last().cloned()
    }

    /// Frames written so far
    pub fn sent(&self) -> Vec<OutboundChatMsg> {
        self.state.sent.lock().clone()
    }

    /// Texts of the frames written so far
    pub fn sent_texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.text).collect()
    }

    /// Deliver a raw frame on the current connection
    pub fn push(&self, raw: impl Into<String>) -> bool {
        self.state
            .inbound
            .lock()
            .as_ref()
            .is_some_and(|tx| tx.send(Ok(raw.into())).is_ok())
    }

    /// Deliver an agent `ChatMsg` snapshot
    pub fn push_agent(&self, id: &str, text: &str) -> bool {
        self.push(agent_frame(id, text))
    }

    /// Sever the current connection as if the peer went away
    pub fn drop_connection(&self) {
        self.state.inbound.lock().take();
    }
}

impl Connector for MockConnector {
    type Transport = MockTransport;

    fn transport(&self, target: &ConnectionTarget) -> Result<MockTransport> {
        target.url()?;
        self.state.endpoints.lock().push(target.endpoint.clone());
        Ok(MockTransport {
            state: Arc::clone(&self.state),
            ready: false,
            rx: None,
        })
    }
}

pub struct MockTransport {
    state: Arc<MockState>,
    ready: bool,
    rx: Option<mpsc::UnboundedReceiver<Result<String>>>,
}

impl Transport for MockTransport {
    async fn connect(&mut self) -> Result<()> {
        self.state.opens.fetch_add(1, Ordering::SeqCst);
        let delay = *self.state.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.state.failing.load(Ordering::SeqCst) {
            return Err(ChatError::connection("connection refused"));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *self.state.inbound.lock() = Some(tx);
        self.rx = Some(rx);
        self.ready = true;
        Ok(())
    }

    async fn write(&mut self, data: &str) -> Result<()> {
        if !self.ready {
            return Err(ChatError::NotConnected);
        }
        if self.state.write_failing.load(Ordering::SeqCst) {
            return Err(ChatError::transport("broken pipe"));
        }
        let frame: OutboundChatMsg = serde_json::from_str(data)?;
        self.state.sent.lock().push(frame);
        Ok(())
    }

    fn read_messages(&mut self) -> mpsc::UnboundedReceiver<Result<String>> {
        self.rx.take().unwrap_or_else(|| mpsc::unbounded_channel().1)
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    async fn close(&mut self) -> Result<()> {
        let delay = *self.state.close_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.ready = false;
        Ok(())
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Options pointing at a dummy target with the given cadence
pub fn options(cadence_ms: u64) -> SessionOptions {
    init_logging();
    SessionOptions::builder()
        .target(ConnectionTarget::new("agent-1", "token-1").with_endpoint("ws://mock.invalid/chat"))
        .cadence(Duration::from_millis(cadence_ms))
        .build()
}

pub fn agent_frame(id: &str, text: &str) -> String {
    json!({"type": "ChatMsg", "id": id, "text": text, "sender": "Agent"}).to_string()
}

pub fn prompts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// Let spawned tasks run without advancing the paused clock meaningfully
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
