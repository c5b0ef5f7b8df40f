//! Cumulative-snapshot reassembly with silence-window finalization

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::types::identifiers::MessageId;
use crate::types::messages::{FinalizedMessage, InboundChatMsg, InboundFrame, Sender};

use super::buffer::StreamingBuffer;

/// Silence window elapsed for a buffer
///
/// Only valid for the buffer state it was armed for; see
/// [`StreamReassembler::finalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeDue {
    /// Message id whose window elapsed
    pub id: MessageId,
    seq: u64,
}

/// What a single snapshot did to the buffers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ingest {
    /// Not an agent frame
    NotAgent,
    /// Agent frame without text
    Empty,
    /// New suffix appended
    Appended {
        /// Message id
        id: MessageId,
        /// Bytes appended
        delta: usize,
    },
    /// Nothing new; only the silence window restarted
    KeptAlive {
        /// Message id
        id: MessageId,
    },
    /// Snapshot did not extend the buffer and was longer; buffer replaced
    Resynced {
        /// Message id
        id: MessageId,
    },
}

/// Result of ingesting one decoded frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameOutcome {
    /// Outcome for the live entry, `None` for an empty batch
    pub ingest: Option<Ingest>,
    /// Batch entries before the last one, not reconstructed
    pub replayed: Vec<InboundChatMsg>,
}

/// Keyed set of streaming buffers for one connection
pub struct StreamReassembler {
    buffers: HashMap<MessageId, StreamingBuffer>,
    silence_window: Duration,
    due_tx: mpsc::UnboundedSender<FinalizeDue>,
    next_seq: u64,
}

impl StreamReassembler {
    /// Create a reassembler whose timers post to `due_tx`
    #[must_use]
    pub fn new(silence_window: Duration, due_tx: mpsc::UnboundedSender<FinalizeDue>) -> Self {
        Self {
            buffers: HashMap::new(),
            silence_window,
            due_tx,
            next_seq: 0,
        }
    }

    /// Ingest a decoded frame
    ///
    /// A batch only feeds its last entry through reconstruction; the earlier
    /// entries are handed back in [`FrameOutcome::replayed`].
    pub fn ingest_frame(&mut self, frame: InboundFrame) -> FrameOutcome {
        match frame {
            InboundFrame::Single(msg) => FrameOutcome {
                ingest: Some(self.ingest(msg)),
                replayed: Vec::new(),
            },
            InboundFrame::Batch { mut messages } => {
                let last = messages.pop();
                FrameOutcome {
                    ingest: last.map(|msg| self.ingest(msg)),
                    replayed: messages,
                }
            }
        }
    }

    /// Ingest one cumulative snapshot
    pub fn ingest(&mut self, msg: InboundChatMsg) -> Ingest {
        if !msg.is_agent() {
            return Ingest::NotAgent;
        }
        let snapshot = msg.text();
        if snapshot.is_empty() {
            return Ingest::Empty;
        }

        let id = msg
            .id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map_or_else(MessageId::generate, MessageId::from);

        let buffer = self.buffers.entry(id.clone()).or_default();
        let outcome = if let Some(delta) = snapshot.strip_prefix(buffer.text.as_str()) {
            if delta.is_empty() {
                Ingest::KeptAlive { id: id.clone() }
            } else {
                buffer.text.push_str(delta);
                buffer.shown_len = buffer.text.len();
                Ingest::Appended {
                    id: id.clone(),
                    delta: delta.len(),
                }
            }
        } else if snapshot.len() > buffer.text.len() {
            log::debug!("snapshot for {id} diverged from buffer; replacing");
            buffer.text = snapshot.to_string();
            buffer.shown_len = buffer.text.len();
            Ingest::Resynced { id: id.clone() }
        } else {
            Ingest::KeptAlive { id: id.clone() }
        };

        self.schedule_finalize(&id);
        outcome
    }

    /// Restart the silence window for `id`
    fn schedule_finalize(&mut self, id: &MessageId) {
        let Some(buffer) = self.buffers.get_mut(id) else {
            return;
        };
        buffer.cancel_timer();

        self.next_seq += 1;
        let seq = self.next_seq;
        buffer.timer_seq = seq;

        let due = FinalizeDue { id: id.clone(), seq };
        let tx = self.due_tx.clone();
        let window = self.silence_window;
        buffer.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let _ = tx.send(due);
        }));
    }

    /// Finalize the buffer a timer fired for
    ///
    /// Returns `None` when the notice is stale (the buffer was rescheduled,
    /// finalized or cleared since) or when the trimmed text is empty. In the
    /// empty case the buffer is still removed.
    pub fn finalize(&mut self, due: FinalizeDue) -> Option<FinalizedMessage> {
        let current = self.buffers.get(&due.id)?;
        if current.timer_seq != due.seq {
            return None;
        }

        let mut buffer = self.buffers.remove(&due.id)?;
        buffer.timer = None;
        let text = buffer.text.trim();
        if text.is_empty() {
            return None;
        }
        Some(FinalizedMessage::new(due.id, text, Sender::Agent))
    }

    /// Discard every buffer and cancel their timers
    ///
    /// Returns the number of partial replies forfeited.
    pub fn clear(&mut self) -> usize {
        let dropped = self.buffers.len();
        self.buffers.clear();
        dropped
    }

    /// Buffer currently held for `id`
    #[must_use]
    pub fn buffer(&self, id: &MessageId) -> Option<&StreamingBuffer> {
        self.buffers.get(id)
    }

    /// Number of in-flight message ids
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Whether no message is being reassembled
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(id: &str, text: &str) -> InboundChatMsg {
        InboundChatMsg {
            id: Some(id.to_string()),
            text: Some(text.to_string()),
            sender: "Agent".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stale_notice_is_ignored_after_reschedule() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut r = StreamReassembler::new(Duration::from_millis(100), tx);

        r.ingest(agent("m", "a"));
        let stale = FinalizeDue {
            id: MessageId::from("m"),
            seq: r.buffer(&MessageId::from("m")).unwrap().timer_seq,
        };
        r.ingest(agent("m", "ab"));

        assert!(r.finalize(stale).is_none());
        assert_eq!(r.len(), 1);

        let due = rx.recv().await.unwrap();
        let msg = r.finalize(due).unwrap();
        assert_eq!(msg.text, "ab");
        assert!(r.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn diverged_longer_snapshot_replaces_buffer() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut r = StreamReassembler::new(Duration::from_millis(100), tx);

        r.ingest(agent("m", "Hello"));
        let outcome = r.ingest(agent("m", "Howdy there"));
        assert_eq!(outcome, Ingest::Resynced { id: MessageId::from("m") });
        assert_eq!(r.buffer(&MessageId::from("m")).unwrap().text(), "Howdy there");

        let outcome = r.ingest(agent("m", "Howdy"));
        assert_eq!(outcome, Ingest::KeptAlive { id: MessageId::from("m") });
        assert_eq!(r.buffer(&MessageId::from("m")).unwrap().text(), "Howdy there");
    }

    #[tokio::test]
    async fn clear_cancels_timers() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut r = StreamReassembler::new(Duration::from_secs(60), tx);
        r.ingest(agent("a", "x"));
        r.ingest(agent("b", "y"));
        assert_eq!(r.clear(), 2);
        assert!(r.is_empty());
    }
}
