//! Session actor task
//!
//! The actor owns the connection, the streaming buffers, the scheduler and the
//! prompt queue. Every mutation happens inside its loop, one event at a time:
//! commands from handles, inbound frames, finalize notices, scheduler ticks,
//! advance completions and open-attempt results.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use super::commands::SessionCommand;
use super::connection::{Link, OpenFinished, OpenWaiter};
use super::events::SessionEvent;
use crate::config::ConfigSource;
use crate::error::{ChatError, Result};
use crate::message::parse_frame;
use crate::scheduler::{AdvanceDone, AdvanceNotifier, SchedulerState, SchedulerTick, StopReason};
use crate::stream::{FinalizeDue, Ingest, StreamReassembler};
use crate::transport::Connector;
use crate::types::messages::FinalizedMessage;
use crate::types::options::ConnectionTarget;
use crate::types::status::{ConnectionStatus, SessionSnapshot};

/// Receiving ends of the actor's channels
pub(super) struct ActorInbox<T> {
    pub commands: mpsc::UnboundedReceiver<SessionCommand>,
    pub opened: mpsc::UnboundedReceiver<OpenFinished<T>>,
    pub due: mpsc::UnboundedReceiver<FinalizeDue>,
    pub ticks: mpsc::UnboundedReceiver<SchedulerTick>,
    pub advances: mpsc::UnboundedReceiver<AdvanceDone>,
}

/// Everything the actor needs at spawn time
pub(super) struct ActorParts<C: Connector> {
    pub connector: C,
    pub source: Option<Arc<dyn ConfigSource>>,
    pub notifier: Option<Arc<dyn AdvanceNotifier>>,
    pub target: Option<ConnectionTarget>,
    pub endpoint: Option<String>,
    pub prompts: Vec<String>,
    pub silence_window: Duration,
    pub cadence: Duration,
    pub connect_timeout: Duration,
    pub history_limit: Option<usize>,
    pub shared: Arc<RwLock<SessionSnapshot>>,
    pub events: broadcast::Sender<SessionEvent>,
}

pub(super) struct SessionActor<C: Connector> {
    pub(super) connector: Arc<C>,
    pub(super) source: Option<Arc<dyn ConfigSource>>,
    pub(super) notifier: Option<Arc<dyn AdvanceNotifier>>,
    pub(super) target: Option<ConnectionTarget>,
    pub(super) endpoint: Option<String>,
    pub(super) connect_timeout: Duration,
    history_limit: Option<usize>,

    pub(super) link: Link<C::Transport>,
    pub(super) attempt: u64,
    pub(super) open_task: Option<JoinHandle<()>>,
    pub(super) waiters: Vec<OpenWaiter>,
    pub(super) inbound: Option<mpsc::UnboundedReceiver<Result<String>>>,
    pub(super) open_tx: mpsc::UnboundedSender<OpenFinished<C::Transport>>,

    pub(super) reassembler: StreamReassembler,
    pub(super) scheduler: SchedulerState,
    pub(super) prompts: Arc<[String]>,
    pub(super) tick_tx: mpsc::UnboundedSender<SchedulerTick>,
    pub(super) advance_tx: mpsc::UnboundedSender<AdvanceDone>,

    shared: Arc<RwLock<SessionSnapshot>>,
    events: broadcast::Sender<SessionEvent>,
}

impl<C: Connector> SessionActor<C> {
    /// Build the actor and the inbox its loop drains
    pub(super) fn new(
        parts: ActorParts<C>,
        commands: mpsc::UnboundedReceiver<SessionCommand>,
    ) -> (Self, ActorInbox<C::Transport>) {
        let (open_tx, opened) = mpsc::unbounded_channel();
        let (due_tx, due) = mpsc::unbounded_channel();
        let (tick_tx, ticks) = mpsc::unbounded_channel();
        let (advance_tx, advances) = mpsc::unbounded_channel();

        let actor = Self {
            connector: Arc::new(parts.connector),
            source: parts.source,
            notifier: parts.notifier,
            target: parts.target,
            endpoint: parts.endpoint,
            connect_timeout: parts.connect_timeout,
            history_limit: parts.history_limit,
            link: Link::Closed,
            attempt: 0,
            open_task: None,
            waiters: Vec::new(),
            inbound: None,
            open_tx,
            reassembler: StreamReassembler::new(parts.silence_window, due_tx),
            scheduler: SchedulerState::new(parts.cadence),
            prompts: Arc::from(parts.prompts),
            tick_tx,
            advance_tx,
            shared: parts.shared,
            events: parts.events,
        };
        actor.publish_prompts();
        actor.publish_scheduler();

        let inbox = ActorInbox {
            commands,
            opened,
            due,
            ticks,
            advances,
        };
        (actor, inbox)
    }

    /// Run until shutdown or until every handle is dropped
    pub(super) async fn run(mut self, mut inbox: ActorInbox<C::Transport>) {
        log::debug!("session actor started");
        loop {
            tokio::select! {
                cmd = inbox.commands.recv() => {
                    match cmd {
                        Some(SessionCommand::Shutdown { response_tx }) => {
                            self.shutdown();
                            let _ = response_tx.send(());
                            break;
                        }
                        Some(cmd) => self.handle_command(cmd).await,
                        None => {
                            log::debug!("all session handles dropped");
                            self.shutdown();
                            break;
                        }
                    }
                }
                Some(finished) = inbox.opened.recv() => {
                    self.on_open_finished(finished).await;
                }
                frame = next_inbound(&mut self.inbound) => {
                    match frame {
                        Some(Ok(raw)) => self.on_frame(&raw),
                        Some(Err(e)) => self.on_link_lost(Some(e.to_string())),
                        None => self.on_link_lost(None),
                    }
                }
                Some(due) = inbox.due.recv() => {
                    self.on_finalize_due(due);
                }
                Some(tick) = inbox.ticks.recv() => {
                    self.on_tick(tick).await;
                }
                Some(done) = inbox.advances.recv() => {
                    self.on_advance_done(done).await;
                }
            }
        }
        log::debug!("session actor stopped");
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::EnsureOpen { response_tx } => {
                self.ensure_open(OpenWaiter::Caller(response_tx)).await;
            }
            SessionCommand::Reconnect { response_tx } => {
                self.reconnect(Some(OpenWaiter::Caller(response_tx)));
            }
            SessionCommand::ReloadConfig { response_tx } => {
                let ready = self.reload_config();
                let _ = response_tx.send(ready);
            }
            SessionCommand::Send { text, response_tx } => {
                let result = self.send_raw(text).await;
                let _ = response_tx.send(result);
            }
            SessionCommand::Submit { text, response_tx } => {
                self.submit(text, response_tx).await;
            }
            SessionCommand::Start { response_tx } => {
                self.start(response_tx).await;
            }
            SessionCommand::Stop { response_tx } => {
                let _ = response_tx.send(self.stop_scheduler(StopReason::User));
            }
            SessionCommand::SetCadence {
                cadence,
                response_tx,
            } => {
                self.set_cadence(cadence);
                let _ = response_tx.send(());
            }
            SessionCommand::ReloadPrompts { response_tx } => {
                let _ = response_tx.send(self.reload_prompts());
            }
            SessionCommand::ReplacePrompts {
                prompts,
                response_tx,
            } => {
                let _ = response_tx.send(self.replace_prompts(prompts));
            }
            SessionCommand::SelectPrompt { index, response_tx } => {
                let _ = response_tx.send(self.select_prompt(index));
            }
            // Handled by the loop so it can break
            SessionCommand::Shutdown { response_tx } => {
                let _ = response_tx.send(());
            }
        }
    }

    // ------------------------------------------------------------------
    // Inbound stream
    // ------------------------------------------------------------------

    fn on_frame(&mut self, raw: &str) {
        let frame = match parse_frame(raw) {
            Ok(frame) => frame,
            Err(e) => {
                log::debug!("dropping undecodable frame: {e}");
                return;
            }
        };

        let outcome = self.reassembler.ingest_frame(frame);
        if !outcome.replayed.is_empty() {
            log::debug!(
                "batch carried {} earlier entries; publishing for re-sync",
                outcome.replayed.len()
            );
            self.emit(SessionEvent::HistoryReplayed {
                entries: outcome.replayed,
            });
        }
        match outcome.ingest {
            Some(Ingest::Appended { id, delta }) => {
                log::trace!("{id}: +{delta} bytes");
            }
            Some(Ingest::Resynced { id }) => {
                log::debug!("{id}: snapshot diverged from buffer, replaced");
            }
            _ => {}
        }
        self.publish_streaming();
    }

    fn on_finalize_due(&mut self, due: FinalizeDue) {
        if let Some(message) = self.reassembler.finalize(due) {
            log::debug!("finalized agent message {}", message.id);
            self.push_history(message);
        }
        self.publish_streaming();
    }

    // ------------------------------------------------------------------
    // Shutdown
    // ------------------------------------------------------------------

    fn shutdown(&mut self) {
        self.stop_scheduler(StopReason::Shutdown);
        self.teardown();
        self.fail_waiters(&ChatError::SessionClosed);
        self.set_status(ConnectionStatus::Closed);
        self.emit(SessionEvent::Closed);
        log::info!("session shut down");
    }

    // ------------------------------------------------------------------
    // Published state
    // ------------------------------------------------------------------

    pub(super) fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    pub(super) fn set_status(&self, status: ConnectionStatus) {
        let changed = {
            let mut shared = self.shared.write();
            let changed = shared.status != status;
            shared.status = status;
            changed
        };
        if changed {
            log::debug!("connection {status}");
            self.emit(SessionEvent::StatusChanged(status));
        }
    }

    pub(super) fn push_history(&self, message: FinalizedMessage) {
        {
            let mut shared = self.shared.write();
            shared.history.push(message.clone());
            if let Some(limit) = self.history_limit
                && shared.history.len() > limit
            {
                let excess = shared.history.len() - limit;
                shared.history.drain(..excess);
            }
        }
        self.emit(SessionEvent::Message(message));
    }

    pub(super) fn publish_scheduler(&self) {
        let mut shared = self.shared.write();
        shared.scheduler_running = self.scheduler.is_running();
        shared.cadence = self.scheduler.cadence();
        shared.cursor = self.scheduler.cursor();
    }

    pub(super) fn publish_prompts(&self) {
        let mut shared = self.shared.write();
        shared.prompts = Arc::clone(&self.prompts);
        shared.prompts_ready = !self.prompts.is_empty();
        shared.cursor = self.scheduler.cursor();
    }

    pub(super) fn publish_config(&self) {
        self.shared.write().config_ready = self.target.is_some();
    }

    pub(super) fn publish_streaming(&self) {
        self.shared.write().streaming = self.reassembler.len();
    }
}

/// Next frame from the open link; pending forever while there is none
async fn next_inbound(
    inbound: &mut Option<mpsc::UnboundedReceiver<Result<String>>>,
) -> Option<Result<String>> {
    match inbound {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
