//! Frame parser for the chat wire protocol

use crate::error::{ChatError, Result};
use crate::types::messages::{InboundFrame, OutboundChatMsg};

/// Parse a raw text payload into a typed inbound frame
///
/// # Arguments
/// * `raw` - Text payload of one websocket message
///
/// # Errors
/// Returns `ChatError::MessageParse` if the payload is not JSON or is not a
/// `ChatMsg`/`ChatMsgList` frame. Callers in the session drop these silently.
pub fn parse_frame(raw: &str) -> Result<InboundFrame> {
    serde_json::from_str(raw).map_err(|e| {
        ChatError::message_parse(format!("Failed to parse frame: {e}"), Some(raw.to_string()))
    })
}

/// Serialize an outbound frame to its JSON text payload
///
/// # Errors
/// Returns error if JSON serialization fails
pub fn encode_outbound(frame: &OutboundChatMsg) -> Result<String> {
    serde_json::to_string(frame)
        .map_err(|e| ChatError::json_encode(format!("Failed to serialize frame: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_without_id() {
        let frame = parse_frame(r#"{"type":"ChatMsg","text":"hi","sender":"Agent"}"#).unwrap();
        match frame {
            InboundFrame::Single(msg) => {
                assert!(msg.id.is_none());
                assert!(msg.is_agent());
                assert_eq!(msg.text(), "hi");
            }
            InboundFrame::Batch { .. } => panic!("expected single frame"),
        }
    }

    #[test]
    fn unknown_type_is_an_error() {
        assert!(parse_frame(r#"{"type":"Typing"}"#).is_err());
        assert!(parse_frame("not json").is_err());
    }
}
