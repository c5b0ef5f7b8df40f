//! # Streaming Agent Chat Session
//!
//! Client-side session layer for a real-time agent chat protocol carried over
//! a websocket. The server streams each reply as a sequence of cumulative
//! snapshots; this crate turns them into complete messages and drives an
//! automated prompt queue against the same connection.
//!
//! ## Quick Start
//!
//! ```no_run
//! use futures::StreamExt;
//! use rtc_chat_session::{ChatSession, ConnectionTarget, SessionEvent, SessionOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = SessionOptions::builder()
//!         .target(ConnectionTarget::new("agent-id", "token"))
//!         .build();
//!     let session = ChatSession::builder(options).spawn();
//!
//!     session.submit_user_message("Hello!").await?;
//!
//!     let mut events = Box::pin(session.events());
//!     while let Some(event) = events.next().await {
//!         if let SessionEvent::Message(message) = event {
//!             log::info!("{:?}: {}", message.sender, message.text);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Core Features
//!
//! ### 1. Single-flight connection management
//!
//! [`ChatSession::ensure_open`] opens the connection on demand. Concurrent
//! callers share one attempt, and [`ChatSession::reconnect`] replaces the
//! connection (or the attempt in flight) with a fresh one.
//!
//! ### 2. Stream reassembly
//!
//! Agent frames carry the full text so far. The [`stream`] module extracts the
//! new suffix of each snapshot and finalizes a message once its id has been
//! silent for the silence window (3.5 s by default).
//!
//! ### 3. Prompt dispatch
//!
//! [`ChatSession::start`] sends the prompt at the cursor and then one prompt
//! per cadence until the queue is exhausted, [`ChatSession::stop`] is called,
//! or a user message interrupts the run.
//!
//! ```no_run
//! # use std::time::Duration;
//! # use rtc_chat_session::ChatSession;
//! # async fn example(session: ChatSession) -> rtc_chat_session::Result<()> {
//! session.replace_prompt_queue(vec!["First".into(), "Second".into()]).await?;
//! session.set_cadence(Duration::from_secs(5)).await?;
//! session.start().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ### 4. Configuration
//!
//! Credentials and prompts come from a [`ConfigSource`]. [`FileConfigSource`]
//! reads `config.json` and `questions.json` from the assets directory in
//! development or next to the executable otherwise.
//!
//! ## Architecture
//!
//! - [`session`] - Session handle and the actor that serializes all state changes
//! - [`stream`] - Cumulative-snapshot reassembly with silence-window finalization
//! - [`scheduler`] - Cadence timer, cursor and advance handshake
//! - [`transport`] - Transport abstraction and the websocket implementation
//! - [`message`] - Frame decoding and encoding
//! - [`config`] - Credential and prompt-queue sources
//! - [`types`] - Identifiers, wire frames, options and observable state
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod message;
pub mod scheduler;
pub mod session;
pub mod stream;
pub mod transport;
pub mod types;

// Re-export commonly used types for external API
pub use config::{ChatConfig, ConfigSource, FileConfigSource, StaticConfigSource};
pub use error::{ChatError, Result};
pub use message::{encode_outbound, parse_frame};
pub use scheduler::{AdvanceNotifier, AdvanceTicket, StopReason};
pub use session::{ChatSession, SessionBuilder, SessionEvent};
pub use stream::{FinalizeDue, StreamReassembler};
pub use transport::{Connector, Transport, WebSocketConnector, WebSocketTransport};

// Re-export type submodules for flat public API
pub use types::identifiers::{AgentId, MessageId};
pub use types::messages::{
    FinalizedMessage, InboundChatMsg, InboundFrame, OutboundChatMsg, Sender,
};
pub use types::options::{ConnectionTarget, SessionOptions, SessionOptionsBuilder};
pub use types::status::{ConnectionStatus, PromptWindow, SessionSnapshot};

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
