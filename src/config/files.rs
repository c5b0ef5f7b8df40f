//! File-backed configuration source
//!
//! Development mode reads `assets/config.json` and `assets/questions.json`
//! relative to the working directory; it is selected when
//! `assets/questions.json` exists there. Otherwise both files live next to
//! the executable and are created from templates when missing.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ChatError, Result};

use super::{ChatConfig, ConfigSource, TEMPLATE_AGENT_ID, TEMPLATE_TOKEN};

/// Credentials file name
pub const CONFIG_FILE: &str = "config.json";

/// Prompt list file name
pub const QUESTIONS_FILE: &str = "questions.json";

/// Development asset directory
pub const ASSETS_DIR: &str = "assets";

const SAMPLE_QUESTIONS: [&str; 3] = ["test question 1", "test question 2", "test question 3"];

/// Reads `config.json` and `questions.json` from one directory
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    dir: PathBuf,
    dev: bool,
}

impl FileConfigSource {
    /// Source reading from `dir`
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            dev: false,
        }
    }

    /// Pick development or production layout
    ///
    /// # Errors
    /// Returns error if the executable location cannot be determined
    pub fn detect() -> Result<Self> {
        let assets = PathBuf::from(ASSETS_DIR);
        if assets.join(QUESTIONS_FILE).is_file() {
            log::info!("using development assets from {}", assets.display());
            return Ok(Self {
                dir: assets,
                dev: true,
            });
        }

        let exe = std::env::current_exe()?;
        let dir = exe
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| ChatError::invalid_config("executable has no parent directory"))?;
        Ok(Self::in_dir(dir))
    }

    /// Whether files are read from the development asset directory
    #[must_use]
    pub const fn is_dev(&self) -> bool {
        self.dev
    }

    /// Directory the files are read from
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create missing files from templates (production layout only)
    pub fn ensure_files(&self) {
        if self.dev {
            return;
        }
        if let Err(e) = ensure_questions_file(&self.dir) {
            log::error!("ensure_questions_file error: {e}");
        }
        if let Err(e) = ensure_config_file(&self.dir) {
            log::error!("ensure_config_file error: {e}");
        }
    }
}

impl ConfigSource for FileConfigSource {
    fn load_config(&self) -> Result<ChatConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let data = fs::read_to_string(&path).map_err(|e| {
            ChatError::config_unavailable(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: ChatConfig = serde_json::from_str(&data).map_err(|e| {
            ChatError::config_unavailable(format!("invalid {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    fn load_prompt_queue(&self) -> Result<Vec<String>> {
        let path = self.dir.join(QUESTIONS_FILE);
        let data = fs::read_to_string(&path).map_err(|e| {
            ChatError::config_unavailable(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&data).map_err(|e| {
            ChatError::config_unavailable(format!("invalid {}: {e}", path.display()))
        })
    }
}

/// Write a sample `questions.json` into `dir` unless one exists
///
/// # Errors
/// Returns error if the file cannot be written
pub fn ensure_questions_file(dir: &Path) -> Result<()> {
    let path = dir.join(QUESTIONS_FILE);
    if path.exists() {
        return Ok(());
    }
    let data = serde_json::to_string_pretty(&SAMPLE_QUESTIONS)?;
    fs::write(&path, data)?;
    log::info!("created {}", path.display());
    Ok(())
}

/// Write a template `config.json` into `dir` unless one exists
///
/// # Errors
/// Returns error if the file cannot be written
pub fn ensure_config_file(dir: &Path) -> Result<()> {
    let path = dir.join(CONFIG_FILE);
    if path.exists() {
        return Ok(());
    }
    let sample = ChatConfig {
        token: TEMPLATE_TOKEN.to_string(),
        agent_id: TEMPLATE_AGENT_ID.to_string(),
    };
    let data = serde_json::to_string_pretty(&sample)?;
    fs::write(&path, data)?;
    log::info!("created {}", path.display());
    Ok(())
}
