//! Configuration constants and types for websocket transport

use std::time::Duration;

use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Default maximum size of one inbound text frame (1MB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// How long `close` waits for the writer to flush the close frame
pub(super) const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Websocket stream over plain TCP or TLS
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
