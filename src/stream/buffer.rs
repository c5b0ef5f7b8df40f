//! Per-message streaming buffer

use tokio::task::JoinHandle;

/// Accumulated text for one in-flight message id
#[derive(Debug, Default)]
pub struct StreamingBuffer {
    pub(super) text: String,
    pub(super) shown_len: usize,
    pub(super) timer_seq: u64,
    pub(super) timer: Option<JoinHandle<()>>,
}

impl StreamingBuffer {
    /// Text accumulated so far
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length of text already surfaced to observers
    #[must_use]
    pub const fn shown_len(&self) -> usize {
        self.shown_len
    }

    /// Whether a finalize timer is armed
    #[must_use]
    pub fn has_pending_timer(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub(super) fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for StreamingBuffer {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}
