//! Reconstruction of streamed agent replies
//!
//! The server streams a reply by resending the full text generated so far
//! under the same message id. [`StreamReassembler`] keeps one
//! [`StreamingBuffer`] per in-flight id, appends only the unseen suffix of each
//! snapshot, and finalizes the buffer once no frame for that id has arrived
//! for the silence window.
//!
//! Timers are plain tokio tasks that post a [`FinalizeDue`] on a channel owned
//! by whoever drives the reassembler; the driver hands each one back to
//! [`StreamReassembler::finalize`]. A rescheduled or cleared buffer makes any
//! earlier `FinalizeDue` for it stale, so a late timer never finalizes twice.

mod buffer;
mod reassembler;

pub use buffer::StreamingBuffer;
pub use reassembler::{FinalizeDue, FrameOutcome, Ingest, StreamReassembler};
