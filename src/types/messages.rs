//! Message-related type definitions
//!
//! This module contains the wire frames exchanged with the chat endpoint and
//! the finalized messages kept in session history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identifiers::MessageId;

// ============================================================================
// Sender Roles
// ============================================================================

/// Author of a finalized message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sender {
    /// Text typed or dispatched by this client
    User,
    /// Text produced by the remote agent
    Agent,
}

impl Sender {
    /// Wire name of the role
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Agent => "Agent",
        }
    }
}

// ============================================================================
// Inbound Frames
// ============================================================================

/// One `ChatMsg` as sent by the server
///
/// `text` is a cumulative snapshot: every frame for an id carries the full
/// text generated so far, not a diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundChatMsg {
    /// Server-assigned message id (may be missing on some frames)
    #[serde(default)]
    pub id: Option<String>,
    /// Cumulative text so far
    #[serde(default)]
    pub text: Option<String>,
    /// Sender role as sent on the wire
    #[serde(default)]
    pub sender: String,
}

impl InboundChatMsg {
    /// Whether this frame was produced by the remote agent
    #[must_use]
    pub fn is_agent(&self) -> bool {
        self.sender == Sender::Agent.as_str()
    }

    /// Cumulative text, empty when absent
    #[must_use]
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

/// Decoded inbound protocol frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundFrame {
    /// A single (possibly partial) message snapshot
    #[serde(rename = "ChatMsg")]
    Single(InboundChatMsg),
    /// A batch of messages; only the last entry is live, earlier ones are replay
    #[serde(rename = "ChatMsgList")]
    Batch {
        /// Messages in server order
        #[serde(default)]
        messages: Vec<InboundChatMsg>,
    },
}

// ============================================================================
// Outbound Frames
// ============================================================================

/// Outbound `ChatMsg` frame
///
/// Fields the server ignores are still sent with their default values so the
/// frame matches what the endpoint expects from first-party clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundChatMsg {
    /// Always `ChatMsg`
    #[serde(rename = "type")]
    pub frame_type: String,
    /// Client-generated id
    pub id: MessageId,
    /// Message text (trimmed)
    pub text: String,
    /// Always `User`
    pub sender: Sender,
    /// Creation time in unix seconds
    pub created_ats: i64,
    /// Attachment URL (unused)
    pub url: Option<String>,
    /// Inline attachment payload (unused)
    pub b64_data: Option<String>,
    /// Skill selector (unused)
    pub skill: Option<String>,
    /// Always `text`
    pub message_type: String,
    /// Whether the reply should include audio
    pub audio_enabled: bool,
    /// Attached files (always empty)
    pub files: Vec<serde_json::Value>,
    /// Buffered-send marker
    pub is_buffer: bool,
}

impl OutboundChatMsg {
    /// Build a user text frame with a fresh id and the current timestamp
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::with_id(MessageId::generate(), text)
    }

    /// Build a user text frame with a known id
    pub fn with_id(id: MessageId, text: impl Into<String>) -> Self {
        Self {
            frame_type: "ChatMsg".to_string(),
            id,
            text: text.into(),
            sender: Sender::User,
            created_ats: Utc::now().timestamp(),
            url: None,
            b64_data: None,
            skill: None,
            message_type: "text".to_string(),
            audio_enabled: false,
            files: Vec::new(),
            is_buffer: false,
        }
    }
}

// ============================================================================
// Session History
// ============================================================================

/// A complete message in session history; never mutated once created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedMessage {
    /// Message id
    pub id: MessageId,
    /// Final text (trimmed)
    pub text: String,
    /// Author
    pub sender: Sender,
    /// When the message entered history
    pub finalized_at: DateTime<Utc>,
}

impl FinalizedMessage {
    /// Create a history entry stamped with the current time
    pub fn new(id: MessageId, text: impl Into<String>, sender: Sender) -> Self {
        Self {
            id,
            text: text.into(),
            sender,
            finalized_at: Utc::now(),
        }
    }
}
