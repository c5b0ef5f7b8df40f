//! Websocket transport implementation
//!
//! This module provides a transport that talks to the chat endpoint over a
//! websocket: a writer task owns the sink, a reader task drains the stream.

mod config;
mod lifecycle;
mod reader;
mod transport;

// Re-export public types
pub use config::{DEFAULT_MAX_FRAME_SIZE, WsStream};
pub use transport::{WebSocketConnector, WebSocketTransport};
