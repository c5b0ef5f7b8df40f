//! Events published by a session

use serde::Serialize;

use crate::scheduler::StopReason;
use crate::types::identifiers::MessageId;
use crate::types::messages::{FinalizedMessage, InboundChatMsg};
use crate::types::status::ConnectionStatus;

/// Observable change in a session
#[derive(Debug, Clone, Serialize)]
pub enum SessionEvent {
    /// Connection moved to a new lifecycle state
    StatusChanged(ConnectionStatus),
    /// An open attempt failed
    ConnectionFailed {
        /// Failure description
        reason: String,
    },
    /// An open connection was lost
    ConnectionLost {
        /// Failure description, `None` for a clean close by the peer
        reason: Option<String>,
    },
    /// A message entered history
    Message(FinalizedMessage),
    /// The scheduler wrote the prompt at `index`
    Dispatched {
        /// Prompt index
        index: usize,
        /// Outbound message id
        id: MessageId,
    },
    /// The cursor moved
    CursorMoved {
        /// New cursor position
        index: usize,
    },
    /// The scheduler started at `index`
    SchedulerStarted {
        /// First dispatched prompt
        index: usize,
    },
    /// The scheduler stopped
    SchedulerStopped {
        /// Why the run ended
        reason: StopReason,
    },
    /// The prompt queue was reloaded or replaced
    PromptsReloaded {
        /// Number of prompts
        count: usize,
        /// Whether the scheduler can be started
        ready: bool,
    },
    /// Earlier entries of a `ChatMsgList` batch that were not reconstructed
    ///
    /// Only the last batch entry is streamed into history. The entries before
    /// it are published here so an observer can re-sync after a gap.
    HistoryReplayed {
        /// Entries in server order
        entries: Vec<InboundChatMsg>,
    },
    /// The session shut down; no further events follow
    Closed,
}
