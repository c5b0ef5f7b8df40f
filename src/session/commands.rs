//! Session command protocol
//!
//! Every operation on a session is a command sent to its actor task, which
//! applies commands one at a time. Replies travel back on a oneshot channel.

use std::time::Duration;

use tokio::sync::oneshot;

use crate::error::Result;
use crate::types::identifiers::MessageId;

/// Commands accepted by the session actor
pub(super) enum SessionCommand {
    /// Resolve once the connection is open or the attempt failed
    EnsureOpen {
        response_tx: oneshot::Sender<Result<()>>,
    },
    /// Tear down and open a fresh connection
    Reconnect {
        response_tx: oneshot::Sender<Result<()>>,
    },
    /// Reload credentials from the config source and reconnect
    ReloadConfig {
        response_tx: oneshot::Sender<bool>,
    },
    /// Raw send on the open connection; no history entry
    Send {
        text: String,
        response_tx: oneshot::Sender<Result<MessageId>>,
    },
    /// User-authored message: interrupts autosend, enters history, then sends
    Submit {
        text: String,
        response_tx: oneshot::Sender<Result<MessageId>>,
    },
    /// Start the dispatch scheduler
    Start {
        response_tx: oneshot::Sender<Result<bool>>,
    },
    /// Stop the dispatch scheduler
    Stop {
        response_tx: oneshot::Sender<bool>,
    },
    /// Change the scheduler cadence
    SetCadence {
        cadence: Duration,
        response_tx: oneshot::Sender<()>,
    },
    /// Reload the prompt queue from the config source
    ReloadPrompts {
        response_tx: oneshot::Sender<bool>,
    },
    /// Replace the prompt queue with a caller-supplied list
    ReplacePrompts {
        prompts: Vec<String>,
        response_tx: oneshot::Sender<bool>,
    },
    /// Move the cursor to a prompt and return its text
    SelectPrompt {
        index: usize,
        response_tx: oneshot::Sender<Option<String>>,
    },
    /// Stop everything and end the actor
    Shutdown {
        response_tx: oneshot::Sender<()>,
    },
}
