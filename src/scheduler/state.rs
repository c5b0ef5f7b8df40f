//! Scheduler state machine

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::types::options::MIN_CADENCE;

use super::advance::AdvanceDone;
use super::ticker::{SchedulerTick, Ticker};

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// Explicit stop request
    User,
    /// A manual message interrupted autosend
    ManualSend,
    /// Cursor reached the end of the queue
    Exhausted,
    /// Prompt queue was reloaded or replaced
    Reload,
    /// Prompt selected by the user
    Selection,
    /// Session is shutting down
    Shutdown,
}

/// Decision for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    /// Tick from a cancelled ticker, or scheduler idle
    Stale,
    /// An advance is still in progress
    Skip,
    /// Queue exhausted; the run has ended
    Exhausted,
    /// Cursor moved to `index`; dispatch once the advance completes
    Advance {
        /// New cursor position
        index: usize,
        /// Run the advance belongs to
        run: u64,
    },
}

/// Scheduler state: running flag, cadence, cursor and the armed ticker
///
/// An armed ticker exists only while running.
#[derive(Debug)]
pub struct SchedulerState {
    running: bool,
    cadence: Duration,
    cursor: usize,
    run: u64,
    tick_seq: u64,
    ticker: Option<Ticker>,
    advancing: Option<usize>,
}

impl SchedulerState {
    /// Idle scheduler with the given cadence
    #[must_use]
    pub fn new(cadence: Duration) -> Self {
        Self {
            running: false,
            cadence: cadence.max(MIN_CADENCE),
            cursor: 0,
            run: 0,
            tick_seq: 0,
            ticker: None,
            advancing: None,
        }
    }

    /// Whether a run is active
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Active cadence
    #[must_use]
    pub const fn cadence(&self) -> Duration {
        self.cadence
    }

    /// Cursor into the prompt queue
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Current run number; bumped on every start and stop
    #[must_use]
    pub const fn run(&self) -> u64 {
        self.run
    }

    /// Move the cursor while idle, clamped to `[0, len]`
    pub fn set_cursor(&mut self, index: usize, len: usize) {
        self.cursor = index.min(len);
    }

    /// Start a run at `cursor` (clamped to the last prompt) and arm the ticker
    ///
    /// Returns the index to dispatch immediately, or `None` if already
    /// running or `len` is zero.
    pub fn begin(
        &mut self,
        len: usize,
        tick_tx: &mpsc::UnboundedSender<SchedulerTick>,
    ) -> Option<usize> {
        if self.running || len == 0 {
            return None;
        }
        self.cursor = self.cursor.min(len - 1);
        self.running = true;
        self.run += 1;
        self.advancing = None;
        self.arm(tick_tx);
        Some(self.cursor)
    }

    /// End the run; returns whether anything changed
    pub fn stop(&mut self) -> bool {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
        self.advancing = None;
        if !self.running {
            return false;
        }
        self.running = false;
        self.run += 1;
        true
    }

    /// Change the cadence, re-arming the ticker if running; the cursor is kept
    pub fn set_cadence(
        &mut self,
        cadence: Duration,
        tick_tx: &mpsc::UnboundedSender<SchedulerTick>,
    ) {
        self.cadence = cadence.max(MIN_CADENCE);
        if self.running {
            self.arm(tick_tx);
        }
    }

    fn arm(&mut self, tick_tx: &mpsc::UnboundedSender<SchedulerTick>) {
        if let Some(old) = self.ticker.take() {
            old.cancel();
        }
        self.tick_seq += 1;
        self.ticker = Some(Ticker::spawn(self.cadence, self.tick_seq, tick_tx.clone()));
    }

    /// Decide what a tick does against a queue of `len` prompts
    pub fn on_tick(&mut self, tick: SchedulerTick, len: usize) -> TickAction {
        if !self.running || tick.seq != self.tick_seq {
            return TickAction::Stale;
        }
        if self.advancing.is_some() {
            return TickAction::Skip;
        }

        let next = self.cursor + 1;
        if next >= len {
            self.stop();
            return TickAction::Exhausted;
        }

        self.cursor = next;
        self.advancing = Some(next);
        TickAction::Advance {
            index: next,
            run: self.run,
        }
    }

    /// Accept an advance completion; returns the index to dispatch
    pub fn complete_advance(&mut self, done: AdvanceDone) -> Option<usize> {
        if !self.running || done.run != self.run || self.advancing != Some(done.index) {
            return None;
        }
        self.advancing = None;
        Some(done.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stop_when_idle_changes_nothing() {
        let mut s = SchedulerState::new(Duration::from_millis(100));
        s.set_cursor(2, 5);
        assert!(!s.stop());
        assert!(!s.is_running());
        assert_eq!(s.cursor(), 2);
        assert_eq!(s.run(), 0);
    }

    #[tokio::test]
    async fn begin_on_empty_queue_stays_idle() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut s = SchedulerState::new(Duration::from_millis(100));
        assert_eq!(s.begin(0, &tx), None);
        assert!(!s.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn tick_skips_while_advancing_and_exhausts_at_end() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut s = SchedulerState::new(Duration::from_millis(100));
        assert_eq!(s.begin(2, &tx), Some(0));

        let tick = rx.recv().await.unwrap();
        let TickAction::Advance { index, run } = s.on_tick(tick, 2) else {
            panic!("expected advance");
        };
        assert_eq!(index, 1);

        let tick = rx.recv().await.unwrap();
        assert_eq!(s.on_tick(tick, 2), TickAction::Skip);

        assert_eq!(s.complete_advance(AdvanceDone { index, run }), Some(1));

        let tick = rx.recv().await.unwrap();
        assert_eq!(s.on_tick(tick, 2), TickAction::Exhausted);
        assert!(!s.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn cadence_change_invalidates_queued_ticks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut s = SchedulerState::new(Duration::from_millis(100));
        s.begin(3, &tx);

        let old = rx.recv().await.unwrap();
        s.set_cadence(Duration::from_millis(50), &tx);
        assert_eq!(s.on_tick(old, 3), TickAction::Stale);
        assert_eq!(s.cursor(), 0);
        assert_eq!(s.cadence(), Duration::from_millis(50));
        assert!(s.is_running());
    }
}
