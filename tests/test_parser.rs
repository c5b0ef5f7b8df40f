//! Unit tests for the frame parser
//!
//! Tests decoding of inbound frames and encoding of outbound ones

use rtc_chat_session::{ChatError, InboundFrame, OutboundChatMsg, encode_outbound, parse_frame};
use serde_json::{Value, json};

#[test]
fn test_parse_single_agent_frame() {
    let data = json!({"type": "ChatMsg", "id": "m1", "text": "Hel", "sender": "Agent"});

    let frame = parse_frame(&data.to_string()).unwrap();
    let InboundFrame::Single(msg) = frame else {
        panic!("expected single frame");
    };
    assert_eq!(msg.id.as_deref(), Some("m1"));
    assert_eq!(msg.text(), "Hel");
    assert!(msg.is_agent());
}

#[test]
fn test_parse_batch_frame() {
    let data = json!({
        "type": "ChatMsgList",
        "messages": [
            {"id": "a", "text": "one", "sender": "User"},
            {"id": "b", "text": "two", "sender": "Agent"}
        ]
    });

    let frame = parse_frame(&data.to_string()).unwrap();
    let InboundFrame::Batch { messages } = frame else {
        panic!("expected batch frame");
    };
    assert_eq!(messages.len(), 2);
    assert!(!messages[0].is_agent());
    assert!(messages[1].is_agent());
}

#[test]
fn test_parse_tolerates_missing_fields() {
    let frame = parse_frame(r#"{"type":"ChatMsg","sender":"Agent","extra":1}"#).unwrap();
    let InboundFrame::Single(msg) = frame else {
        panic!("expected single frame");
    };
    assert!(msg.id.is_none());
    assert_eq!(msg.text(), "");

    let frame = parse_frame(r#"{"type":"ChatMsgList"}"#).unwrap();
    assert_eq!(frame, InboundFrame::Batch { messages: vec![] });
}

#[test]
fn test_parse_invalid_frame() {
    let err = parse_frame(r#"{"type":"invalid_type","data":"x"}"#).unwrap_err();
    match err {
        ChatError::MessageParse { data, .. } => {
            assert_eq!(data.as_deref(), Some(r#"{"type":"invalid_type","data":"x"}"#));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(parse_frame("").is_err());
}

#[test]
fn test_encode_outbound_wire_shape() {
    let frame = OutboundChatMsg::with_id("abc".into(), "hello");
    let value: Value = serde_json::from_str(&encode_outbound(&frame).unwrap()).unwrap();

    assert_eq!(value["type"], "ChatMsg");
    assert_eq!(value["id"], "abc");
    assert_eq!(value["text"], "hello");
    assert_eq!(value["sender"], "User");
    assert_eq!(value["messageType"], "text");
    assert_eq!(value["audioEnabled"], false);
    assert_eq!(value["isBuffer"], false);
    assert_eq!(value["files"], json!([]));
    assert!(value["url"].is_null());
    assert!(value["b64Data"].is_null());
    assert!(value["skill"].is_null());
    assert!(value["createdAts"].as_i64().is_some_and(|t| t > 0));
}

#[test]
fn test_generated_ids_are_unique() {
    let a = OutboundChatMsg::user_text("x");
    let b = OutboundChatMsg::user_text("x");
    assert_ne!(a.id, b.id);
    assert_eq!(a.id.as_str().len(), 32);
}
