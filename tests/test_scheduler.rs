//! Unit tests for `SchedulerState`
//!
//! Drives the state machine with real ticks from its own ticker

use std::time::Duration;

use rtc_chat_session::scheduler::{SchedulerState, SchedulerTick, TickAction};
use tokio::sync::mpsc;

fn ticks() -> (
    mpsc::UnboundedSender<SchedulerTick>,
    mpsc::UnboundedReceiver<SchedulerTick>,
) {
    mpsc::unbounded_channel()
}

#[tokio::test(start_paused = true)]
async fn test_run_walks_queue_then_exhausts() {
    let (tx, mut rx) = ticks();
    let mut s = SchedulerState::new(Duration::from_millis(100));

    assert_eq!(s.begin(3, &tx), Some(0));
    assert!(s.is_running());
    let run = s.run();

    let started = tokio::time::Instant::now();
    let tick = rx.recv().await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert_eq!(s.on_tick(tick, 3), TickAction::Advance { index: 1, run });

    let tick = rx.recv().await.unwrap();
    assert_eq!(s.on_tick(tick, 3), TickAction::Skip);
    assert_eq!(s.cursor(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_silences_ticker() {
    let (tx, mut rx) = ticks();
    let mut s = SchedulerState::new(Duration::from_millis(50));

    s.begin(5, &tx);
    assert!(s.stop());
    assert!(!s.stop());
    assert!(!s.is_running());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_begin_clamps_cursor_past_end() {
    let (tx, mut rx) = ticks();
    let mut s = SchedulerState::new(Duration::from_millis(100));

    s.set_cursor(10, 3);
    assert_eq!(s.cursor(), 3);
    assert_eq!(s.begin(3, &tx), Some(2));

    let tick = rx.recv().await.unwrap();
    assert_eq!(s.on_tick(tick, 3), TickAction::Exhausted);
    assert!(!s.is_running());
    assert_eq!(s.cursor(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cadence_is_clamped_and_kept_while_idle() {
    let (tx, mut rx) = ticks();
    let mut s = SchedulerState::new(Duration::ZERO);
    assert!(s.cadence() > Duration::ZERO);

    s.set_cadence(Duration::from_millis(250), &tx);
    assert_eq!(s.cadence(), Duration::from_millis(250));
    assert!(!s.is_running());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(rx.try_recv().is_err());
}
