//! Configuration and prompt-queue collaborators
//!
//! The session core never reads files itself. It asks a [`ConfigSource`] for
//! the connection credentials and the prompt list, and degrades to a "not
//! ready" state when either cannot be loaded.

mod files;

use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};
use crate::types::options::ConnectionTarget;

pub use files::{
    ASSETS_DIR, CONFIG_FILE, FileConfigSource, QUESTIONS_FILE, ensure_config_file,
    ensure_questions_file,
};

/// Placeholder written into a fresh `config.json`
pub const TEMPLATE_TOKEN: &str = "YOUR_TOKEN_HERE";

/// Placeholder written into a fresh `config.json`
pub const TEMPLATE_AGENT_ID: &str = "YOUR_AGENT_ID_HERE";

/// Credentials for the chat endpoint, as stored in `config.json`
#[derive(Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Access token
    pub token: String,
    /// Remote agent identifier
    #[serde(rename = "agentId")]
    pub agent_id: String,
}

impl ChatConfig {
    /// Reject empty or template credentials
    ///
    /// # Errors
    /// Returns `ConfigUnavailable` if a field is empty or still a placeholder
    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() || self.agent_id.trim().is_empty() {
            return Err(ChatError::config_unavailable("token and agentId are required"));
        }
        if self.token == TEMPLATE_TOKEN || self.agent_id == TEMPLATE_AGENT_ID {
            return Err(ChatError::config_unavailable(
                "config.json still contains template values",
            ));
        }
        Ok(())
    }

    /// Connection target for the default endpoint
    #[must_use]
    pub fn target(&self) -> ConnectionTarget {
        ConnectionTarget::new(self.agent_id.as_str(), self.token.as_str())
    }
}

impl std::fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatConfig")
            .field("token", &"<redacted>")
            .field("agent_id", &self.agent_id)
            .finish()
    }
}

/// Supplies credentials and the prompt queue
pub trait ConfigSource: Send + Sync + 'static {
    /// Load connection credentials
    ///
    /// # Errors
    /// Returns error if the configuration cannot be read or is incomplete
    fn load_config(&self) -> Result<ChatConfig>;

    /// Load the ordered prompt list
    ///
    /// # Errors
    /// Returns error if the prompt list cannot be read
    fn load_prompt_queue(&self) -> Result<Vec<String>>;
}

/// In-memory source, for embedding hosts that already hold their config
#[derive(Debug, Clone, Default)]
pub struct StaticConfigSource {
    config: Option<ChatConfig>,
    prompts: Option<Vec<String>>,
}

impl StaticConfigSource {
    /// Source with both config and prompts
    #[must_use]
    pub fn new(config: ChatConfig, prompts: Vec<String>) -> Self {
        Self {
            config: Some(config),
            prompts: Some(prompts),
        }
    }

    /// Source with prompts only; `load_config` fails
    #[must_use]
    pub fn prompts_only(prompts: Vec<String>) -> Self {
        Self {
            config: None,
            prompts: Some(prompts),
        }
    }
}

impl ConfigSource for StaticConfigSource {
    fn load_config(&self) -> Result<ChatConfig> {
        let config = self
            .config
            .clone()
            .ok_or_else(|| ChatError::config_unavailable("no configuration supplied"))?;
        config.validate()?;
        Ok(config)
    }

    fn load_prompt_queue(&self) -> Result<Vec<String>> {
        self.prompts
            .clone()
            .ok_or_else(|| ChatError::config_unavailable("no prompt queue supplied"))
    }
}
