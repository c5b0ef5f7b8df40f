//! Chat session handle
//!
//! A [`ChatSession`] is a cheap, clonable handle to a session actor running on
//! the Tokio runtime. The actor serializes every operation: connection
//! management, stream reassembly and prompt dispatch never race each other.
//!
//! State is observable three ways:
//! - synchronous reads ([`ChatSession::snapshot`], [`ChatSession::history`], ...)
//! - a broadcast of [`SessionEvent`]s ([`ChatSession::subscribe`])
//! - the same events as a `Stream` ([`ChatSession::events`])
//!
//! # Example
//!
//! ```no_run
//! use rtc_chat_session::{ChatSession, ConnectionTarget, SessionOptions};
//!
//! # async fn example() -> rtc_chat_session::Result<()> {
//! let options = SessionOptions::builder()
//!     .target(ConnectionTarget::new("agent-id", "token"))
//!     .build();
//! let session = ChatSession::builder(options)
//!     .prompts(vec!["Hello there".into(), "What can you do?".into()])
//!     .spawn();
//!
//! session.ensure_open().await?;
//! session.start().await?;
//! # Ok(())
//! # }
//! ```

mod actor;
mod commands;
mod connection;
mod dispatch;
mod events;

use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::config::ConfigSource;
use crate::error::{ChatError, Result};
use crate::scheduler::AdvanceNotifier;
use crate::transport::{Connector, WebSocketConnector};
use crate::types::identifiers::MessageId;
use crate::types::messages::FinalizedMessage;
use crate::types::options::SessionOptions;
use crate::types::status::{ConnectionStatus, PromptWindow, SessionSnapshot};

use actor::{ActorParts, SessionActor};
use commands::SessionCommand;

pub use events::SessionEvent;

/// Handle to a running chat session
///
/// Dropping every handle shuts the session down.
#[derive(Clone)]
pub struct ChatSession {
    command_tx: mpsc::UnboundedSender<SessionCommand>,
    shared: Arc<RwLock<SessionSnapshot>>,
    events: broadcast::Sender<SessionEvent>,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shared = self.shared.read();
        f.debug_struct("ChatSession")
            .field("status", &shared.status)
            .field("scheduler_running", &shared.scheduler_running)
            .field("cursor", &shared.cursor)
            .field("history_len", &shared.history.len())
            .finish_non_exhaustive()
    }
}

impl ChatSession {
    /// Start building a session over the websocket transport
    #[must_use]
    pub fn builder(options: SessionOptions) -> SessionBuilder<WebSocketConnector> {
        SessionBuilder::new(options)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(make(response_tx))
            .map_err(|_| ChatError::SessionClosed)?;
        response_rx.await.map_err(|_| ChatError::SessionClosed)
    }

    // ------------------------------------------------------------------
    // Connection
    // ------------------------------------------------------------------

    /// Resolve once the connection is open
    ///
    /// Concurrent callers share a single open attempt.
    ///
    /// # Errors
    /// Returns `ConnectionUnavailable` if the attempt fails or no target is configured
    pub async fn ensure_open(&self) -> Result<()> {
        self.request(|response_tx| SessionCommand::EnsureOpen { response_tx })
            .await?
    }

    /// Close the current connection (or abort the attempt in flight) and open a new one
    ///
    /// # Errors
    /// Returns `ConnectionUnavailable` if the new attempt fails
    pub async fn reconnect(&self) -> Result<()> {
        self.request(|response_tx| SessionCommand::Reconnect { response_tx })
            .await?
    }

    /// Write one text frame on the open connection
    ///
    /// Does not open the connection and does not touch history.
    ///
    /// # Errors
    /// Returns `NotConnected` unless the connection is open
    pub async fn send(&self, text: impl Into<String>) -> Result<MessageId> {
        let text = text.into();
        self.request(|response_tx| SessionCommand::Send { text, response_tx })
            .await?
    }

    /// Current connection state
    #[must_use]
    pub fn connection_status(&self) -> ConnectionStatus {
        self.shared.read().status
    }

    /// Whether the connection is open
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection_status().is_open()
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    /// Send a user-authored message
    ///
    /// Stops the scheduler, appends the message to history, then sends it,
    /// opening the connection if needed. A failed send is logged and dropped.
    ///
    /// # Errors
    /// Returns `EmptyMessage` if `text` is blank after trimming
    pub async fn submit_user_message(&self, text: impl Into<String>) -> Result<MessageId> {
        let text = text.into();
        self.request(|response_tx| SessionCommand::Submit { text, response_tx })
            .await?
    }

    /// Finalized messages in order
    #[must_use]
    pub fn history(&self) -> Vec<FinalizedMessage> {
        self.shared.read().history.clone()
    }

    // ------------------------------------------------------------------
    // Scheduler
    // ------------------------------------------------------------------

    /// Start dispatching prompts from the cursor
    ///
    /// Opens the connection first if needed. Returns `false` without side
    /// effects if already running or the prompt queue is empty.
    ///
    /// # Errors
    /// Returns `ConnectionUnavailable` if the connection cannot be opened
    pub async fn start(&self) -> Result<bool> {
        self.request(|response_tx| SessionCommand::Start { response_tx })
            .await?
    }

    /// Stop dispatching; returns whether a run was active or a pending start was cancelled
    ///
    /// # Errors
    /// Returns `SessionClosed` if the session has shut down
    pub async fn stop(&self) -> Result<bool> {
        self.request(|response_tx| SessionCommand::Stop { response_tx })
            .await
    }

    /// Change the cadence; a running scheduler keeps its cursor
    ///
    /// # Errors
    /// Returns `SessionClosed` if the session has shut down
    pub async fn set_cadence(&self, cadence: Duration) -> Result<()> {
        self.request(|response_tx| SessionCommand::SetCadence {
            cadence,
            response_tx,
        })
        .await
    }

    /// Whether the scheduler is running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.read().scheduler_running
    }

    // ------------------------------------------------------------------
    // Prompt queue and configuration
    // ------------------------------------------------------------------

    /// Reload the prompt queue from the config source
    ///
    /// Stops the scheduler and resets the cursor. Returns whether the
    /// reloaded queue is usable.
    ///
    /// # Errors
    /// Returns `SessionClosed` if the session has shut down
    pub async fn reload_prompt_queue(&self) -> Result<bool> {
        self.request(|response_tx| SessionCommand::ReloadPrompts { response_tx })
            .await
    }

    /// Replace the prompt queue; same effects as a reload
    ///
    /// # Errors
    /// Returns `SessionClosed` if the session has shut down
    pub async fn replace_prompt_queue(&self, prompts: Vec<String>) -> Result<bool> {
        self.request(|response_tx| SessionCommand::ReplacePrompts {
            prompts,
            response_tx,
        })
        .await
    }

    /// Stop the scheduler and move the cursor to `index`
    ///
    /// Returns the selected prompt, or `None` (and changes nothing) if out of range.
    ///
    /// # Errors
    /// Returns `SessionClosed` if the session has shut down
    pub async fn select_prompt(&self, index: usize) -> Result<Option<String>> {
        self.request(|response_tx| SessionCommand::SelectPrompt { index, response_tx })
            .await
    }

    /// Reload credentials from the config source and reconnect with them
    ///
    /// Returns `false` and keeps the current connection if the config is unusable.
    ///
    /// # Errors
    /// Returns `SessionClosed` if the session has shut down
    pub async fn reload_config(&self) -> Result<bool> {
        self.request(|response_tx| SessionCommand::ReloadConfig { response_tx })
            .await
    }

    /// Previous, current and next prompt around the cursor
    #[must_use]
    pub fn prompt_window(&self) -> PromptWindow {
        self.shared.read().prompt_window()
    }

    /// Copy of the full observable state
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.read().clone()
    }

    // ------------------------------------------------------------------
    // Events and lifecycle
    // ------------------------------------------------------------------

    /// Subscribe to session events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Session events as a stream; ends after [`SessionEvent::Closed`]
    pub fn events(&self) -> impl Stream<Item = SessionEvent> + Send + 'static {
        let mut rx = self.events.subscribe();
        async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(SessionEvent::Closed) => {
                        yield SessionEvent::Closed;
                        break;
                    }
                    Ok(event) => yield event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log::warn!("event stream lagged, {skipped} events skipped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    /// Stop the scheduler, close the connection and end the actor
    ///
    /// Idempotent; later operations fail with `SessionClosed`.
    pub async fn shutdown(&self) {
        if self
            .request(|response_tx| SessionCommand::Shutdown { response_tx })
            .await
            .is_err()
        {
            log::debug!("session already shut down");
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`ChatSession`]
pub struct SessionBuilder<C: Connector> {
    options: SessionOptions,
    connector: C,
    source: Option<Arc<dyn ConfigSource>>,
    notifier: Option<Arc<dyn AdvanceNotifier>>,
    prompts: Option<Vec<String>>,
}

impl SessionBuilder<WebSocketConnector> {
    /// Builder over the websocket transport
    #[must_use]
    pub fn new(options: SessionOptions) -> Self {
        let connector = WebSocketConnector::new(options.connect_timeout);
        Self {
            options,
            connector,
            source: None,
            notifier: None,
            prompts: None,
        }
    }
}

impl<C: Connector> SessionBuilder<C> {
    /// Use a different transport factory
    #[must_use]
    pub fn connector<D: Connector>(self, connector: D) -> SessionBuilder<D> {
        SessionBuilder {
            options: self.options,
            connector,
            source: self.source,
            notifier: self.notifier,
            prompts: self.prompts,
        }
    }

    /// Source of credentials and prompts, also used by the reload operations
    #[must_use]
    pub fn config_source(mut self, source: impl ConfigSource) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Hook invoked before each scheduled advance is dispatched
    #[must_use]
    pub fn advance_notifier(mut self, notifier: impl AdvanceNotifier) -> Self {
        self.notifier = Some(Arc::new(notifier));
        self
    }

    /// Initial prompt queue, instead of loading it from the config source
    #[must_use]
    pub fn prompts(mut self, prompts: Vec<String>) -> Self {
        self.prompts = Some(prompts);
        self
    }

    /// Spawn the session actor on the current Tokio runtime
    ///
    /// Credentials come from the options' target, falling back to the config
    /// source. Missing credentials or prompts leave the session not ready
    /// rather than failing.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime
    #[must_use]
    pub fn spawn(self) -> ChatSession {
        let Self {
            options,
            connector,
            source,
            notifier,
            prompts,
        } = self;

        let target = options.target.clone().or_else(|| {
            let source = source.as_ref()?;
            match source.load_config() {
                Ok(config) => Some(match &options.endpoint {
                    Some(endpoint) => config.target().with_endpoint(endpoint.clone()),
                    None => config.target(),
                }),
                Err(e) => {
                    log::warn!("no usable credentials: {e}");
                    None
                }
            }
        });

        let prompts = prompts
            .or_else(|| {
                let source = source.as_ref()?;
                match source.load_prompt_queue() {
                    Ok(prompts) => Some(prompts),
                    Err(e) => {
                        log::warn!("prompt queue unavailable: {e}");
                        None
                    }
                }
            })
            .unwrap_or_default();

        let shared = Arc::new(RwLock::new(SessionSnapshot::new(
            options.cadence,
            target.is_some(),
        )));
        let (events, _) = broadcast::channel(options.event_capacity.max(1));
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let parts = ActorParts {
            connector,
            source,
            notifier,
            target,
            endpoint: options.endpoint,
            prompts,
            silence_window: options.silence_window,
            cadence: options.cadence,
            connect_timeout: options.connect_timeout,
            history_limit: options.history_limit,
            shared: Arc::clone(&shared),
            events: events.clone(),
        };
        let (actor, inbox) = SessionActor::new(parts, command_rx);
        tokio::spawn(actor.run(inbox));

        ChatSession {
            command_tx,
            shared,
            events,
        }
    }
}
