//! Connection management inside the session actor
//!
//! At most one connection is `Open` or `Opening` at any time. Callers that
//! need the connection while an attempt is in flight join it as waiters and
//! are resolved together when it settles, so concurrent `ensure_open` calls
//! produce exactly one attempt.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use super::actor::SessionActor;
use super::events::SessionEvent;
use crate::error::{ChatError, Result};
use crate::message::encode_outbound;
use crate::transport::{Connector, Transport};
use crate::types::identifiers::MessageId;
use crate::types::messages::{FinalizedMessage, OutboundChatMsg, Sender};
use crate::types::options::ConnectionTarget;
use crate::types::status::ConnectionStatus;

/// Connection slot
pub(super) enum Link<T> {
    Closed,
    Opening,
    Open(T),
}

/// Result of one open attempt, tagged with the attempt it belongs to
pub(super) struct OpenFinished<T> {
    pub attempt: u64,
    pub result: Result<T>,
}

/// Who is waiting on the in-flight open attempt
pub(super) enum OpenWaiter {
    /// `ensure_open` or `reconnect` caller
    Caller(oneshot::Sender<Result<()>>),
    /// Scheduler start deferred until the connection is open
    Start(oneshot::Sender<Result<bool>>),
    /// Outbound frame deferred until the connection is open
    Send(PendingSend),
}

pub(super) struct PendingSend {
    pub frame: OutboundChatMsg,
    pub origin: SendOrigin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SendOrigin {
    /// User-authored; already in history
    Manual,
    /// Prompt dispatched by the scheduler run `run`
    Scheduled { index: usize, run: u64 },
}

impl OpenWaiter {
    pub(super) fn is_scheduled_send(&self) -> bool {
        matches!(
            self,
            Self::Send(PendingSend {
                origin: SendOrigin::Scheduled { .. },
                ..
            })
        )
    }
}

impl<C: Connector> SessionActor<C> {
    /// Resolve `waiter` once the connection is open, starting an attempt if needed
    pub(super) async fn ensure_open(&mut self, waiter: OpenWaiter) {
        match self.link {
            Link::Open(_) => self.resolve_waiter(waiter).await,
            Link::Opening => self.waiters.push(waiter),
            Link::Closed => {
                self.waiters.push(waiter);
                self.open();
            }
        }
    }

    /// Tear down whatever exists and open a fresh connection
    ///
    /// Waiters of an aborted in-flight attempt carry over to the new one.
    pub(super) fn reconnect(&mut self, waiter: Option<OpenWaiter>) {
        log::info!("reconnecting");
        self.teardown();
        if let Some(waiter) = waiter {
            self.waiters.push(waiter);
        }
        self.open();
    }

    /// Write `frame` now if open, otherwise queue it behind an open attempt
    pub(super) async fn send_or_queue(&mut self, pending: PendingSend) {
        match self.link {
            Link::Open(_) => self.write_pending(pending).await,
            Link::Opening => self.queue_send(pending),
            Link::Closed => {
                self.queue_send(pending);
                self.open();
            }
        }
    }

    /// Raw send on the open connection
    pub(super) async fn send_raw(&mut self, text: String) -> Result<MessageId> {
        let frame = OutboundChatMsg::user_text(text);
        self.write_frame(&frame).await?;
        Ok(frame.id)
    }

    fn queue_send(&mut self, pending: PendingSend) {
        // Only the newest scheduled prompt is worth sending once connected
        if matches!(pending.origin, SendOrigin::Scheduled { .. }) {
            self.waiters.retain(|w| !w.is_scheduled_send());
        }
        self.waiters.push(OpenWaiter::Send(pending));
    }

    fn open(&mut self) {
        let dropped = self.reassembler.clear();
        if dropped > 0 {
            log::debug!("discarded {dropped} partial messages before opening");
            self.publish_streaming();
        }
        self.attempt += 1;

        let Some(target) = self.target.clone() else {
            self.fail_open(&ChatError::unavailable("no connection target configured"));
            return;
        };

        self.link = Link::Opening;
        self.set_status(ConnectionStatus::Opening);
        log::info!("opening connection to {} (attempt {})", target.endpoint, self.attempt);

        let connector = Arc::clone(&self.connector);
        let open_tx = self.open_tx.clone();
        let attempt = self.attempt;
        let timeout = self.connect_timeout;
        self.open_task = Some(tokio::spawn(async move {
            let result = connect_transport(connector.as_ref(), &target, timeout).await;
            let _ = open_tx.send(OpenFinished { attempt, result });
        }));
    }

    pub(super) async fn on_open_finished(&mut self, finished: OpenFinished<C::Transport>) {
        if finished.attempt != self.attempt || !matches!(self.link, Link::Opening) {
            log::debug!("ignoring result of superseded open attempt {}", finished.attempt);
            if let Ok(mut stale) = finished.result {
                tokio::spawn(async move {
                    let _ = stale.close().await;
                });
            }
            return;
        }
        self.open_task = None;

        match finished.result {
            Ok(mut transport) => {
                self.inbound = Some(transport.read_messages());
                self.link = Link::Open(transport);
                self.set_status(ConnectionStatus::Open);
                log::info!("connection open");

                let waiters = std::mem::take(&mut self.waiters);
                for waiter in waiters {
                    self.resolve_waiter(waiter).await;
                }
            }
            Err(e) => {
                log::warn!("open attempt {} failed: {e}", finished.attempt);
                self.fail_open(&e);
            }
        }
    }

    fn fail_open(&mut self, error: &ChatError) {
        self.link = Link::Closed;
        self.open_task = None;
        self.set_status(ConnectionStatus::Closed);
        self.emit(SessionEvent::ConnectionFailed {
            reason: error.to_string(),
        });
        let unavailable = match error {
            ChatError::ConnectionUnavailable(_) => error.clone(),
            other => ChatError::unavailable(other.to_string()),
        };
        self.fail_waiters(&unavailable);
    }

    /// Fail every waiter; deferred sends are dropped
    pub(super) fn fail_waiters(&mut self, error: &ChatError) {
        for waiter in std::mem::take(&mut self.waiters) {
            match waiter {
                OpenWaiter::Caller(tx) => {
                    let _ = tx.send(Err(error.clone()));
                }
                OpenWaiter::Start(tx) => {
                    let _ = tx.send(Err(error.clone()));
                }
                OpenWaiter::Send(pending) => {
                    log::warn!("dropping message {}: {error}", pending.frame.id);
                }
            }
        }
    }

    async fn resolve_waiter(&mut self, waiter: OpenWaiter) {
        match waiter {
            OpenWaiter::Caller(tx) => {
                let _ = tx.send(Ok(()));
            }
            OpenWaiter::Start(tx) => {
                let started = self.begin_run().await;
                let _ = tx.send(Ok(started));
            }
            OpenWaiter::Send(pending) => self.write_pending(pending).await,
        }
    }

    async fn write_pending(&mut self, pending: PendingSend) {
        if let SendOrigin::Scheduled { run, .. } = pending.origin
            && run != self.scheduler.run()
        {
            log::debug!("dropping prompt from an ended run");
            return;
        }

        if let Err(e) = self.write_frame(&pending.frame).await {
            log::warn!("dropping message {}: {e}", pending.frame.id);
            return;
        }

        if let SendOrigin::Scheduled { index, .. } = pending.origin {
            let id = pending.frame.id.clone();
            self.push_history(FinalizedMessage::new(
                id.clone(),
                pending.frame.text,
                Sender::User,
            ));
            log::debug!("dispatched prompt {index}");
            self.emit(SessionEvent::Dispatched { index, id });
        }
    }

    /// Encode and write one frame; fails unless the connection is open
    ///
    /// A write that fails because the link is gone closes the connection so
    /// the next send opens a fresh one.
    async fn write_frame(&mut self, frame: &OutboundChatMsg) -> Result<()> {
        let Link::Open(transport) = &mut self.link else {
            return Err(ChatError::NotConnected);
        };
        let payload = encode_outbound(frame)?;
        let written = transport.write(&payload).await;
        if let Err(e) = &written
            && e.is_connection_loss()
        {
            self.on_link_lost(Some(format!("write failed: {e}")));
        }
        written
    }

    /// Close the open connection or abort the in-flight attempt
    ///
    /// Waiters are left in place; streaming buffers are discarded. The close
    /// handshake runs on its own task so the actor keeps serving commands.
    pub(super) fn teardown(&mut self) {
        if let Some(task) = self.open_task.take() {
            task.abort();
        }
        self.inbound = None;

        if let Link::Open(mut transport) = std::mem::replace(&mut self.link, Link::Closed) {
            self.set_status(ConnectionStatus::Closing);
            tokio::spawn(async move {
                if let Err(e) = transport.close().await {
                    log::debug!("error while closing connection: {e}");
                }
            });
        }
        self.discard_buffers();
        self.set_status(ConnectionStatus::Closed);
    }

    /// The open connection ended underneath us
    pub(super) fn on_link_lost(&mut self, reason: Option<String>) {
        self.inbound = None;
        if !matches!(self.link, Link::Open(_)) {
            return;
        }
        // Dropping the transport stops its tasks
        self.link = Link::Closed;
        match &reason {
            Some(reason) => log::warn!("connection lost: {reason}"),
            None => log::info!("connection closed by peer"),
        }
        self.discard_buffers();
        self.set_status(ConnectionStatus::Closed);
        self.emit(SessionEvent::ConnectionLost { reason });
    }

    fn discard_buffers(&mut self) {
        let dropped = self.reassembler.clear();
        if dropped > 0 {
            log::debug!("discarded {dropped} partial messages");
        }
        self.publish_streaming();
    }
}

/// One open attempt: build a transport and complete its handshake within `timeout`
async fn connect_transport<C: Connector>(
    connector: &C,
    target: &ConnectionTarget,
    timeout: Duration,
) -> Result<C::Transport> {
    let mut transport = connector.transport(target)?;
    let connected = tokio::time::timeout(timeout, transport.connect()).await;
    match connected {
        Ok(Ok(())) => Ok(transport),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(ChatError::timeout(format!(
            "open did not complete within {timeout:?}"
        ))),
    }
}
