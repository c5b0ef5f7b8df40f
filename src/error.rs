//! Error types for the chat session layer

use std::sync::Arc;

use thiserror::Error;

/// Main error type for the chat session layer
#[derive(Error, Debug)]
pub enum ChatError {
    /// Connection could not be established or was lost during the handshake
    #[error("Connection error: {0}")]
    Connection(String),

    /// No connection could be obtained (open failed or no usable target)
    #[error("Connection unavailable: {0}")]
    ConnectionUnavailable(String),

    /// A send was attempted while the connection was not open
    #[error("Not connected")]
    NotConnected,

    /// Transport layer error
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON decode error when parsing frames or config files
    #[error("JSON decode error: {0}")]
    JsonDecode(#[source] Arc<serde_json::Error>),

    /// An outbound frame could not be serialized
    #[error("JSON encode error: {0}")]
    JsonEncode(String),

    /// Frame parse error with optional raw payload
    #[error("Frame parse error: {message}")]
    MessageParse {
        /// Error message
        message: String,
        /// Raw payload that failed to parse
        data: Option<String>,
    },

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Config or prompt queue could not be loaded
    #[error("Configuration unavailable: {0}")]
    ConfigUnavailable(String),

    /// Submitted message was empty after trimming
    #[error("Message is empty")]
    EmptyMessage,

    /// The session actor has shut down
    #[error("Session closed")]
    SessionClosed,
}

/// Result type alias for chat session operations
pub type Result<T> = std::result::Result<T, ChatError>;

impl ChatError {
    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a connection unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::ConnectionUnavailable(msg.into())
    }

    /// Create a frame parse error
    pub fn message_parse(msg: impl Into<String>, data: Option<String>) -> Self {
        Self::MessageParse {
            message: msg.into(),
            data,
        }
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a JSON encode error
    pub fn json_encode(msg: impl Into<String>) -> Self {
        Self::JsonEncode(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a configuration unavailable error
    pub fn config_unavailable(msg: impl Into<String>) -> Self {
        Self::ConfigUnavailable(msg.into())
    }

    /// Whether this error means "no connection right now" and is recovered by
    /// retrying or reconnecting rather than by changing inputs
    #[must_use]
    pub const fn is_connection_loss(&self) -> bool {
        matches!(
            self,
            Self::Connection(_)
                | Self::ConnectionUnavailable(_)
                | Self::NotConnected
                | Self::Transport(_)
                | Self::Timeout(_)
        )
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(e: serde_json::Error) -> Self {
        Self::JsonDecode(Arc::new(e))
    }
}

impl Clone for ChatError {
    fn clone(&self) -> Self {
        match self {
            Self::Connection(m) => Self::Connection(m.clone()),
            Self::ConnectionUnavailable(m) => Self::ConnectionUnavailable(m.clone()),
            Self::NotConnected => Self::NotConnected,
            Self::Transport(m) => Self::Transport(m.clone()),
            Self::JsonDecode(e) => Self::JsonDecode(Arc::clone(e)),
            Self::JsonEncode(m) => Self::JsonEncode(m.clone()),
            Self::MessageParse { message, data } => Self::MessageParse {
                message: message.clone(),
                data: data.clone(),
            },
            Self::Io(e) => Self::Io(std::io::Error::new(e.kind(), e.to_string())),
            Self::Timeout(m) => Self::Timeout(m.clone()),
            Self::InvalidConfig(m) => Self::InvalidConfig(m.clone()),
            Self::ConfigUnavailable(m) => Self::ConfigUnavailable(m.clone()),
            Self::EmptyMessage => Self::EmptyMessage,
            Self::SessionClosed => Self::SessionClosed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_errors_are_not_decode_errors() {
        let err = ChatError::json_encode("Failed to serialize frame: key must be a string");
        assert!(matches!(err, ChatError::JsonEncode(_)));
        assert_eq!(
            err.to_string(),
            "JSON encode error: Failed to serialize frame: key must be a string"
        );
        assert_eq!(err.clone().to_string(), err.to_string());
    }

    #[test]
    fn clone_keeps_decode_message_unchanged() {
        let err: ChatError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        let cloned = err.clone();
        assert!(matches!(cloned, ChatError::JsonDecode(_)));
        assert_eq!(cloned.to_string(), err.to_string());
    }

    #[test]
    fn connection_loss_classification() {
        assert!(ChatError::NotConnected.is_connection_loss());
        assert!(ChatError::transport("writer task has stopped").is_connection_loss());
        assert!(ChatError::timeout("open").is_connection_loss());
        assert!(!ChatError::json_encode("bad").is_connection_loss());
        assert!(!ChatError::EmptyMessage.is_connection_loss());
    }
}
