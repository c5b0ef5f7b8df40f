//! Recurring tick timer for the scheduler

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// One elapsed cadence period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerTick {
    pub(super) seq: u64,
}

/// Armed ticker; cancelled on drop
#[derive(Debug)]
pub(super) struct Ticker {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Spawn a ticker that first fires one cadence from now
    pub(super) fn spawn(
        cadence: Duration,
        seq: u64,
        tick_tx: mpsc::UnboundedSender<SchedulerTick>,
    ) -> Self {
        let token = CancellationToken::new();
        let child = token.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + cadence, cadence);
            // Ticks are wall-clock paced; a slow consumer never builds a backlog.
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = child.cancelled() => break,
                    _ = interval.tick() => {
                        if tick_tx.send(SchedulerTick { seq }).is_err() {
                            break;
                        }
                    }
                }
            }
        });
        Self { token, handle }
    }

    pub(super) fn cancel(&self) {
        self.token.cancel();
        self.handle.abort();
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel();
    }
}
