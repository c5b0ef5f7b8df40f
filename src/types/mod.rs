//! Type definitions for the chat session layer
//!
//! - [`identifiers`] - Type-safe ID wrappers (`MessageId`, `AgentId`)
//! - [`messages`] - Wire frames and finalized history entries
//! - [`options`] - Session options, connection target and builder
//! - [`status`] - Observable session state

pub mod identifiers;
pub mod messages;
pub mod options;
pub mod status;

// Re-export commonly used types
pub use identifiers::{AgentId, MessageId};
pub use messages::{FinalizedMessage, InboundChatMsg, InboundFrame, OutboundChatMsg, Sender};
pub use options::{ConnectionTarget, SessionOptions, SessionOptionsBuilder};
pub use status::{ConnectionStatus, PromptWindow, SessionSnapshot};
