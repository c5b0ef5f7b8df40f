//! Transport layer for communicating with the chat endpoint
//!
//! This module provides the transport abstraction used by the session's
//! connection manager, and the websocket implementation of it.

pub mod websocket;

use tokio::sync::mpsc;

use crate::error::Result;
use crate::types::options::ConnectionTarget;

/// Transport trait for one logical connection to the chat endpoint
///
/// A transport is created per open attempt and never reused after `close`.
pub trait Transport: Send + Sync + 'static {
    /// Perform the handshake
    ///
    /// # Errors
    /// Returns error if the handshake fails
    fn connect(&mut self) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Queue a text frame for writing
    ///
    /// Returns once the frame is queued; delivery is not acknowledged.
    ///
    /// # Errors
    /// Returns error if the transport is not ready
    fn write(&mut self, data: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Read text frames from the transport
    ///
    /// Spawns a background reader and returns its receiver. An `Err` item
    /// reports a read failure; the receiver closes when the connection ends.
    fn read_messages(&mut self) -> mpsc::UnboundedReceiver<Result<String>>;

    /// Check if transport is ready for communication
    fn is_ready(&self) -> bool;

    /// Close the transport and clean up resources
    ///
    /// # Errors
    /// Returns error if cleanup fails
    fn close(&mut self) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Factory for transports, one per open attempt
pub trait Connector: Send + Sync + 'static {
    /// Transport produced by this connector
    type Transport: Transport;

    /// Create an unconnected transport for `target`
    ///
    /// # Errors
    /// Returns error if the target cannot be turned into a connection URI
    fn transport(&self, target: &ConnectionTarget) -> Result<Self::Transport>;
}

pub use websocket::{WebSocketConnector, WebSocketTransport};
