//! Websocket transport and its connector

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::stream::SplitStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::error::{ChatError, Result};
use crate::transport::{Connector, Transport};
use crate::types::options::{ConnectionTarget, DEFAULT_CONNECT_TIMEOUT};

use super::config::{DEFAULT_MAX_FRAME_SIZE, WsStream};

/// Websocket transport to the chat endpoint
pub struct WebSocketTransport {
    pub(super) url: Url,
    pub(super) connect_timeout: Duration,
    pub(super) max_frame_size: usize,
    pub(super) stream: Option<SplitStream<WsStream>>,
    pub(super) outbound_tx: Option<mpsc::UnboundedSender<Message>>,
    pub(super) ready: Arc<AtomicBool>,
    pub(super) reader_task: Option<JoinHandle<()>>,
    pub(super) writer_task: Option<JoinHandle<()>>,
}

impl WebSocketTransport {
    /// Create a new, unconnected websocket transport
    ///
    /// # Arguments
    /// * `url` - Full connection URI including query parameters
    /// * `connect_timeout` - Handshake deadline
    #[must_use]
    pub fn new(url: Url, connect_timeout: Duration) -> Self {
        Self {
            url,
            connect_timeout,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            stream: None,
            outbound_tx: None,
            ready: Arc::new(AtomicBool::new(false)),
            reader_task: None,
            writer_task: None,
        }
    }

    /// Override the maximum accepted inbound frame size
    #[must_use]
    pub fn with_max_frame_size(mut self, max: usize) -> Self {
        self.max_frame_size = max;
        self
    }
}

impl std::fmt::Debug for WebSocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The query string carries the token.
        f.debug_struct("WebSocketTransport")
            .field("host", &self.url.host_str())
            .field("path", &self.url.path())
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

impl Transport for WebSocketTransport {
    async fn connect(&mut self) -> Result<()> {
        self.connect_impl().await
    }

    async fn write(&mut self, data: &str) -> Result<()> {
        if !self.is_ready() {
            return Err(ChatError::NotConnected);
        }

        let tx = self
            .outbound_tx
            .as_ref()
            .ok_or_else(|| ChatError::transport("writer not available"))?;

        tx.send(Message::Text(data.to_string()))
            .map_err(|_| ChatError::transport("writer task has stopped"))
    }

    fn read_messages(&mut self) -> mpsc::UnboundedReceiver<Result<String>> {
        self.read_messages_impl()
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn close(&mut self) -> Result<()> {
        self.close_impl().await
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.drop_impl();
    }
}

/// Connector producing websocket transports
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    connect_timeout: Duration,
    max_frame_size: usize,
}

impl WebSocketConnector {
    /// Create a connector with the given handshake deadline
    #[must_use]
    pub const fn new(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Drop inbound frames larger than `max` bytes on every transport
    #[must_use]
    pub const fn with_max_frame_size(mut self, max: usize) -> Self {
        self.max_frame_size = max;
        self
    }
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    fn transport(&self, target: &ConnectionTarget) -> Result<WebSocketTransport> {
        Ok(WebSocketTransport::new(target.url()?, self.connect_timeout)
            .with_max_frame_size(self.max_frame_size))
    }
}
