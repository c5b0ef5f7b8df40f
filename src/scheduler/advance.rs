//! Index-advance collaborator
//!
//! Before the scheduler dispatches the next prompt it tells an external
//! collaborator (typically a view animating the current prompt) that the
//! cursor moved, and waits for it to finish. Ticks that arrive meanwhile are
//! skipped.

use tokio::sync::mpsc;

/// Notified when the scheduler moves the cursor
pub trait AdvanceNotifier: Send + Sync + 'static {
    /// Cursor moved to `ticket.index()`; finish by completing or dropping the ticket
    fn advance(&self, ticket: AdvanceTicket);
}

/// Completion notice for an advance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceDone {
    pub(crate) index: usize,
    pub(crate) run: u64,
}

/// Outstanding advance; completes when [`complete`](Self::complete)d or dropped
#[derive(Debug)]
pub struct AdvanceTicket {
    done: AdvanceDone,
    tx: mpsc::UnboundedSender<AdvanceDone>,
}

impl AdvanceTicket {
    pub(crate) fn new(index: usize, run: u64, tx: mpsc::UnboundedSender<AdvanceDone>) -> Self {
        Self {
            done: AdvanceDone { index, run },
            tx,
        }
    }

    /// Index the cursor moved to
    #[must_use]
    pub const fn index(&self) -> usize {
        self.done.index
    }

    /// Signal that the advance finished
    pub fn complete(self) {
        drop(self);
    }
}

impl Drop for AdvanceTicket {
    fn drop(&mut self) {
        let _ = self.tx.send(self.done);
    }
}
