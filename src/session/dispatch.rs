//! Prompt queue and scheduler handling inside the session actor
//!
//! A run dispatches the prompt at the cursor immediately, then on every tick
//! advances the cursor and dispatches the next prompt. Advancing goes through
//! the optional [`AdvanceNotifier`](crate::scheduler::AdvanceNotifier) so a
//! presentation layer can animate before the send happens. A run ends after
//! the last prompt, on `stop`, or when a user message interrupts it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use super::actor::SessionActor;
use super::connection::{OpenWaiter, PendingSend, SendOrigin};
use super::events::SessionEvent;
use crate::error::{ChatError, Result};
use crate::scheduler::{AdvanceDone, AdvanceTicket, SchedulerTick, StopReason, TickAction};
use crate::transport::Connector;
use crate::types::identifiers::MessageId;
use crate::types::messages::{FinalizedMessage, OutboundChatMsg, Sender};

impl<C: Connector> SessionActor<C> {
    /// Start a run once the connection is open
    ///
    /// Replies `Ok(false)` when already running or the queue is empty.
    pub(super) async fn start(&mut self, response_tx: oneshot::Sender<Result<bool>>) {
        if self.scheduler.is_running() {
            log::debug!("scheduler already running");
            let _ = response_tx.send(Ok(false));
            return;
        }
        if self.prompts.is_empty() {
            log::info!("not starting: prompt queue is empty");
            let _ = response_tx.send(Ok(false));
            return;
        }
        // Joins an in-flight open if there is one
        self.ensure_open(OpenWaiter::Start(response_tx)).await;
    }

    /// Arm the ticker and dispatch the prompt at the cursor
    pub(super) async fn begin_run(&mut self) -> bool {
        let Some(index) = self.scheduler.begin(self.prompts.len(), &self.tick_tx) else {
            return false;
        };
        log::info!(
            "scheduler started at prompt {index} every {:?}",
            self.scheduler.cadence()
        );
        self.publish_scheduler();
        self.emit(SessionEvent::SchedulerStarted { index });
        self.dispatch_prompt(index).await;
        true
    }

    /// End the current run, cancelling deferred starts and scheduled sends
    ///
    /// Returns whether a run was active or a start was waiting on the
    /// connection. Stopping while neither is the case is a no-op.
    pub(super) fn stop_scheduler(&mut self, reason: StopReason) -> bool {
        let mut cancelled = false;
        for waiter in std::mem::take(&mut self.waiters) {
            match waiter {
                OpenWaiter::Start(tx) => {
                    let _ = tx.send(Ok(false));
                    cancelled = true;
                }
                w if w.is_scheduled_send() => {}
                w => self.waiters.push(w),
            }
        }
        if cancelled {
            log::info!("cancelled pending start ({reason:?})");
        }

        if !self.scheduler.stop() {
            return cancelled;
        }
        log::info!("scheduler stopped ({reason:?}) at prompt {}", self.scheduler.cursor());
        self.publish_scheduler();
        self.emit(SessionEvent::SchedulerStopped { reason });
        true
    }

    pub(super) fn set_cadence(&mut self, cadence: Duration) {
        self.scheduler.set_cadence(cadence, &self.tick_tx);
        log::debug!("cadence set to {:?}", self.scheduler.cadence());
        self.publish_scheduler();
    }

    pub(super) async fn on_tick(&mut self, tick: SchedulerTick) {
        match self.scheduler.on_tick(tick, self.prompts.len()) {
            TickAction::Stale => {}
            TickAction::Skip => log::debug!("tick skipped: advance in progress"),
            TickAction::Exhausted => {
                self.waiters.retain(|w| !w.is_scheduled_send());
                log::info!("scheduler reached the end of the prompt queue");
                self.publish_scheduler();
                self.emit(SessionEvent::SchedulerStopped {
                    reason: StopReason::Exhausted,
                });
            }
            TickAction::Advance { index, run } => {
                self.publish_scheduler();
                self.emit(SessionEvent::CursorMoved { index });
                match &self.notifier {
                    Some(notifier) => {
                        notifier.advance(AdvanceTicket::new(index, run, self.advance_tx.clone()));
                    }
                    None => self.on_advance_done(AdvanceDone { index, run }).await,
                }
            }
        }
    }

    pub(super) async fn on_advance_done(&mut self, done: AdvanceDone) {
        if let Some(index) = self.scheduler.complete_advance(done) {
            self.dispatch_prompt(index).await;
        }
    }

    async fn dispatch_prompt(&mut self, index: usize) {
        let Some(text) = self
            .prompts
            .get(index)
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
        else {
            log::debug!("prompt {index} is blank; nothing sent");
            return;
        };
        let pending = PendingSend {
            frame: OutboundChatMsg::user_text(text),
            origin: SendOrigin::Scheduled {
                index,
                run: self.scheduler.run(),
            },
        };
        self.send_or_queue(pending).await;
    }

    /// User-authored message: stops autosend, enters history, then sends
    pub(super) async fn submit(
        &mut self,
        text: String,
        response_tx: oneshot::Sender<Result<MessageId>>,
    ) {
        let text = text.trim();
        if text.is_empty() {
            let _ = response_tx.send(Err(ChatError::EmptyMessage));
            return;
        }

        self.stop_scheduler(StopReason::ManualSend);

        let frame = OutboundChatMsg::user_text(text);
        self.push_history(FinalizedMessage::new(frame.id.clone(), text, Sender::User));
        let _ = response_tx.send(Ok(frame.id.clone()));

        self.send_or_queue(PendingSend {
            frame,
            origin: SendOrigin::Manual,
        })
        .await;
    }

    /// Reload the prompt queue from the config source
    ///
    /// A load failure leaves an empty, not-ready queue.
    pub(super) fn reload_prompts(&mut self) -> bool {
        self.stop_scheduler(StopReason::Reload);
        let loaded = match &self.source {
            Some(source) => source.load_prompt_queue(),
            None => Err(ChatError::config_unavailable("no config source")),
        };
        let prompts = loaded.unwrap_or_else(|e| {
            log::warn!("prompt queue unavailable: {e}");
            Vec::new()
        });
        self.install_prompts(prompts)
    }

    pub(super) fn replace_prompts(&mut self, prompts: Vec<String>) -> bool {
        self.stop_scheduler(StopReason::Reload);
        self.install_prompts(prompts)
    }

    fn install_prompts(&mut self, prompts: Vec<String>) -> bool {
        let count = prompts.len();
        self.prompts = Arc::from(prompts);
        self.scheduler.set_cursor(0, count);
        self.publish_prompts();
        self.publish_scheduler();

        let ready = count > 0;
        log::info!("prompt queue loaded: {count} prompts");
        self.emit(SessionEvent::PromptsReloaded { count, ready });
        ready
    }

    /// Move the cursor to `index`, stopping any run; `None` if out of range
    pub(super) fn select_prompt(&mut self, index: usize) -> Option<String> {
        let prompt = self.prompts.get(index).cloned()?;
        self.stop_scheduler(StopReason::Selection);
        self.scheduler.set_cursor(index, self.prompts.len());
        self.publish_scheduler();
        self.emit(SessionEvent::CursorMoved { index });
        Some(prompt)
    }

    /// Reload credentials and reconnect with them
    ///
    /// The configured endpoint override wins, then the current endpoint. On
    /// failure the current target and connection are kept.
    pub(super) fn reload_config(&mut self) -> bool {
        let loaded = match &self.source {
            Some(source) => source.load_config(),
            None => Err(ChatError::config_unavailable("no config source")),
        };
        let config = match loaded {
            Ok(config) => config,
            Err(e) => {
                log::warn!("config unavailable: {e}");
                return false;
            }
        };

        let mut target = config.target();
        if let Some(endpoint) = &self.endpoint {
            target.endpoint.clone_from(endpoint);
        } else if let Some(current) = &self.target {
            target.endpoint.clone_from(&current.endpoint);
        }
        self.target = Some(target);
        self.publish_config();
        self.reconnect(None);
        true
    }
}
