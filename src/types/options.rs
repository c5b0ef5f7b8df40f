//! Session options and configuration
//!
//! This module contains the tunables of a chat session (endpoint, silence
//! window, cadence, timeouts) and a builder for assembling them.

use std::time::Duration;

use url::Url;

use super::identifiers::AgentId;
use crate::error::{ChatError, Result};

/// Default chat endpoint
pub const DEFAULT_ENDPOINT: &str = "wss://api.youmio.ai/api/chat";

/// Quiet period after the last frame for a message id before it is finalized
pub const DEFAULT_SILENCE_WINDOW: Duration = Duration::from_millis(3500);

/// Delay between automatic prompt dispatches (reply wait plus pause)
pub const DEFAULT_CADENCE: Duration = Duration::from_millis(8000);

/// Handshake deadline for a single open attempt
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Capacity of the session event broadcast channel
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Smallest cadence accepted by `set_cadence`
pub const MIN_CADENCE: Duration = Duration::from_millis(10);

// ============================================================================
// Connection Target
// ============================================================================

/// Where and as whom to connect: endpoint, agent identifier and access token
#[derive(Clone)]
pub struct ConnectionTarget {
    /// Endpoint base URL (`ws://` or `wss://`)
    pub endpoint: String,
    /// Remote agent identifier
    pub agent_id: AgentId,
    /// Access token
    pub token: String,
}

impl ConnectionTarget {
    /// Create a target for the default endpoint
    pub fn new(agent_id: impl Into<AgentId>, token: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            agent_id: agent_id.into(),
            token: token.into(),
        }
    }

    /// Override the endpoint base URL
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Build the connection URI with `agentId` and `token` query parameters
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the endpoint is not a websocket URL or an
    /// identifier is empty
    pub fn url(&self) -> Result<Url> {
        if self.agent_id.as_str().trim().is_empty() {
            return Err(ChatError::invalid_config("agent id is empty"));
        }
        if self.token.trim().is_empty() {
            return Err(ChatError::invalid_config("token is empty"));
        }

        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| ChatError::invalid_config(format!("invalid endpoint: {e}")))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ChatError::invalid_config(format!(
                "endpoint scheme must be ws or wss, got {}",
                url.scheme()
            )));
        }

        url.query_pairs_mut()
            .append_pair("agentId", self.agent_id.as_str())
            .append_pair("token", &self.token);
        Ok(url)
    }
}

impl std::fmt::Debug for ConnectionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionTarget")
            .field("endpoint", &self.endpoint)
            .field("agent_id", &self.agent_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// Session Options
// ============================================================================

/// Main options for a chat session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Connection target; `None` leaves the session without a usable target
    pub target: Option<ConnectionTarget>,
    /// Endpoint applied to credentials loaded from a config source, at spawn
    /// and on every reload
    pub endpoint: Option<String>,
    /// Silence window before a streamed message is finalized
    pub silence_window: Duration,
    /// Initial scheduler cadence
    pub cadence: Duration,
    /// Handshake deadline for one open attempt
    pub connect_timeout: Duration,
    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
    /// Maximum history length kept in memory (`None` keeps everything)
    pub history_limit: Option<usize>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            target: None,
            endpoint: None,
            silence_window: DEFAULT_SILENCE_WINDOW,
            cadence: DEFAULT_CADENCE,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            history_limit: None,
        }
    }
}

impl SessionOptions {
    /// Create a new builder for `SessionOptions`
    #[must_use]
    pub fn builder() -> SessionOptionsBuilder {
        SessionOptionsBuilder::default()
    }
}

// ============================================================================
// Builder for SessionOptions
// ============================================================================

/// Builder for `SessionOptions`
#[derive(Debug, Default)]
pub struct SessionOptionsBuilder {
    options: SessionOptions,
}

impl SessionOptionsBuilder {
    /// Set the connection target
    #[must_use]
    pub fn target(mut self, target: ConnectionTarget) -> Self {
        self.options.target = Some(target);
        self
    }

    /// Connect to `endpoint` with whatever credentials the config source
    /// provides
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.options.endpoint = Some(endpoint.into());
        self
    }

    /// Set the silence window
    #[must_use]
    pub const fn silence_window(mut self, window: Duration) -> Self {
        self.options.silence_window = window;
        self
    }

    /// Set the initial cadence (clamped to `MIN_CADENCE`)
    #[must_use]
    pub fn cadence(mut self, cadence: Duration) -> Self {
        self.options.cadence = cadence.max(MIN_CADENCE);
        self
    }

    /// Set the connect timeout
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    /// Set the event channel capacity
    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.options.event_capacity = capacity.max(1);
        self
    }

    /// Cap the in-memory history length
    #[must_use]
    pub const fn history_limit(mut self, limit: usize) -> Self {
        self.options.history_limit = Some(limit);
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> SessionOptions {
        self.options
    }
}
