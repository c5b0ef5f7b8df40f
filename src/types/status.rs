//! Observable session state
//!
//! Read-only views of the session published for observers. Observers never
//! mutate these; they act through the session handle.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::messages::FinalizedMessage;

/// Lifecycle state of the session's connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConnectionStatus {
    /// No connection and no attempt in flight
    Closed,
    /// An open attempt is in flight
    Opening,
    /// Connected and writable
    Open,
    /// Tearing down the current connection
    Closing,
}

impl ConnectionStatus {
    /// Collapse to the two states shown to users
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Closed => "closed",
            Self::Opening => "opening",
            Self::Open => "open",
            Self::Closing => "closing",
        };
        f.write_str(label)
    }
}

/// Previous, current and next prompt around the cursor; empty when out of range
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PromptWindow {
    /// Prompt before the cursor
    pub previous: String,
    /// Prompt at the cursor
    pub current: String,
    /// Prompt after the cursor
    pub next: String,
}

/// Point-in-time copy of the session state
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    /// Connection lifecycle state
    pub status: ConnectionStatus,
    /// Finalized messages in order
    pub history: Vec<FinalizedMessage>,
    /// Whether the dispatch scheduler is running
    pub scheduler_running: bool,
    /// Active cadence
    #[serde(with = "duration_ms")]
    pub cadence: Duration,
    /// Cursor into the prompt queue, always in `[0, prompts.len()]`
    pub cursor: usize,
    /// Loaded prompt queue
    pub prompts: Arc<[String]>,
    /// False when the prompt queue failed to load or is empty
    pub prompts_ready: bool,
    /// False when no usable connection target is configured
    pub config_ready: bool,
    /// Number of message ids currently being reassembled
    pub streaming: usize,
}

impl SessionSnapshot {
    pub(crate) fn new(cadence: Duration, config_ready: bool) -> Self {
        Self {
            status: ConnectionStatus::Closed,
            history: Vec::new(),
            scheduler_running: false,
            cadence,
            cursor: 0,
            prompts: Arc::from(Vec::new()),
            prompts_ready: false,
            config_ready,
            streaming: 0,
        }
    }

    /// Prompts around the cursor
    #[must_use]
    pub fn prompt_window(&self) -> PromptWindow {
        let at = |index: Option<usize>| {
            index
                .and_then(|i| self.prompts.get(i))
                .cloned()
                .unwrap_or_default()
        };
        PromptWindow {
            previous: at(self.cursor.checked_sub(1)),
            current: at(Some(self.cursor)),
            next: at(self.cursor.checked_add(1)),
        }
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}
