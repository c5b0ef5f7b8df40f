//! Autonomous prompt dispatch
//!
//! A two-state machine (`Idle`, `Running`) that walks the prompt queue one
//! entry per tick. The session actor owns a [`SchedulerState`] and feeds it
//! ticks from the ticker task; the state decides whether a tick skips,
//! advances the cursor or ends the run.

mod advance;
mod state;
mod ticker;

pub use advance::{AdvanceDone, AdvanceNotifier, AdvanceTicket};
pub use state::{SchedulerState, StopReason, TickAction};
pub use ticker::SchedulerTick;
