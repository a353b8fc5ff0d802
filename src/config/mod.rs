//! Configuration management for Mender

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::errors::{ConfigError, MenderError};

/// Range accepted for `max_files`
const MAX_FILES_RANGE: std::ops::RangeInclusive<usize> = 1..=50;

/// Automation level applied to monitored repositories
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    /// Detect and log issues only
    Monitor,

    /// Detect issues and open a review request with proposed fixes
    Suggest,

    /// Detect, generate, and apply high-confidence fixes
    Autofix,
}

impl Default for AgentMode {
    fn default() -> Self {
        AgentMode::Monitor
    }
}

/// Per-process agent policy, snapshotted at the start of every operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Automation level
    #[serde(default)]
    pub agent_mode: AgentMode,

    /// Publish applied fixes as a commit + pull request
    #[serde(default)]
    pub auto_commit: bool,

    /// Maximum number of files analyzed per run (1..=50)
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Path substrings that exclude a file from analysis
    #[serde(default = "default_excluded_files")]
    pub excluded_files: BTreeSet<String>,

    /// File extensions excluded from analysis
    #[serde(default = "default_excluded_extensions")]
    pub excluded_extensions: BTreeSet<String>,
}

fn default_max_files() -> usize {
    10
}

fn default_excluded_files() -> BTreeSet<String> {
    [".env", ".git", "node_modules", "__pycache__", "venv"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_excluded_extensions() -> BTreeSet<String> {
    [".jpg", ".png", ".gif", ".mp4", ".mp3", ".pdf"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            agent_mode: AgentMode::default(),
            auto_commit: false,
            max_files: default_max_files(),
            excluded_files: default_excluded_files(),
            excluded_extensions: default_excluded_extensions(),
        }
    }
}

impl AgentConfig {
    /// Check semantic constraints that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !MAX_FILES_RANGE.contains(&self.max_files) {
            return Err(ConfigError::Invalid(format!(
                "max_files must be between {} and {}, got {}",
                MAX_FILES_RANGE.start(),
                MAX_FILES_RANGE.end(),
                self.max_files
            )));
        }
        Ok(())
    }
}

/// Partial update applied through the explicit configure operation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentConfigUpdate {
    pub agent_mode: Option<AgentMode>,
    pub auto_commit: Option<bool>,
    pub max_files: Option<usize>,
    pub excluded_files: Option<BTreeSet<String>>,
    pub excluded_extensions: Option<BTreeSet<String>>,
}

impl AgentConfigUpdate {
    pub fn is_empty(&self) -> bool {
        self.agent_mode.is_none()
            && self.auto_commit.is_none()
            && self.max_files.is_none()
            && self.excluded_files.is_none()
            && self.excluded_extensions.is_none()
    }
}

/// Repository host connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Host API base URL
    #[serde(default = "default_host_api_url")]
    pub api_url: String,

    /// API token; falls back to `GITHUB_TOKEN` when unset
    #[serde(default)]
    pub token: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_host_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            api_url: default_host_api_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// AI fix provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Chat-completions endpoint of an OpenAI-compatible provider
    #[serde(default = "default_ai_api_url")]
    pub api_url: String,

    /// API key; falls back to `AI_API_KEY` when unset
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model name
    #[serde(default = "default_ai_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_ai_temperature")]
    pub temperature: f32,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_ai_api_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_ai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_ai_temperature() -> f32 {
    0.3
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_url: default_ai_api_url(),
            api_key: None,
            model: default_ai_model(),
            temperature: default_ai_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Main configuration for Mender
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MenderConfig {
    /// Agent policy
    #[serde(default)]
    pub agent: AgentConfig,

    /// Repository host settings
    #[serde(default)]
    pub host: HostConfig,

    /// AI fix provider settings
    #[serde(default)]
    pub ai: AiConfig,
}

/// Configuration provider trait
pub trait ConfigProvider {
    /// Load configuration starting from the given directory
    fn load_config(&self, base_dir: &Path) -> Result<MenderConfig, MenderError>;
}

/// TOML configuration provider
///
/// Looks for `mender.toml` in the given directory and its parents,
/// unless an explicit file path was supplied.
pub struct TomlConfigProvider {
    explicit: Option<PathBuf>,
}

impl Default for TomlConfigProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TomlConfigProvider {
    /// Create a new TOML configuration provider
    pub fn new() -> Self {
        Self { explicit: None }
    }

    /// Load from a specific file instead of searching the ancestry
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            explicit: Some(path),
        }
    }

    fn load_file(&self, path: &Path) -> Result<MenderConfig, MenderError> {
        let content = std::fs::read_to_string(path).map_err(|err| ConfigError::LoadError {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;

        let config: MenderConfig = toml::from_str(&content)
            .map_err(|err| ConfigError::ParseError(err.to_string()))?;

        config.agent.validate()?;
        Ok(config)
    }
}

impl ConfigProvider for TomlConfigProvider {
    fn load_config(&self, base_dir: &Path) -> Result<MenderConfig, MenderError> {
        if let Some(path) = &self.explicit {
            return self.load_file(path);
        }

        let mut current_dir = Some(base_dir);

        while let Some(dir) = current_dir {
            let config_path = dir.join("mender.toml");

            if config_path.exists() {
                return self.load_file(&config_path);
            }

            current_dir = dir.parent();
        }

        // No config found, return defaults
        Ok(MenderConfig::default())
    }
}

/// Process-wide agent configuration with single-writer semantics.
///
/// Every operation takes a `snapshot()` at its start and works against
/// that copy; an update landing mid-analysis never changes limits or
/// exclusions for work already in progress.
#[derive(Clone)]
pub struct SharedAgentConfig {
    inner: Arc<RwLock<AgentConfig>>,
}

impl SharedAgentConfig {
    /// Wrap a validated starting configuration
    pub fn new(config: AgentConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(RwLock::new(config)),
        })
    }

    /// Consistent copy of the current configuration
    pub fn snapshot(&self) -> AgentConfig {
        if let Ok(config) = self.inner.read() {
            config.clone()
        } else {
            AgentConfig::default()
        }
    }

    /// Apply a partial update, validating before the swap
    pub fn update(&self, update: AgentConfigUpdate) -> Result<AgentConfig, ConfigError> {
        let mut next = self.snapshot();

        if let Some(mode) = update.agent_mode {
            next.agent_mode = mode;
        }
        if let Some(auto_commit) = update.auto_commit {
            next.auto_commit = auto_commit;
        }
        if let Some(max_files) = update.max_files {
            next.max_files = max_files;
        }
        if let Some(files) = update.excluded_files {
            next.excluded_files = files;
        }
        if let Some(extensions) = update.excluded_extensions {
            next.excluded_extensions = extensions;
        }

        next.validate()?;

        if let Ok(mut config) = self.inner.write() {
            *config = next.clone();
        }
        Ok(next)
    }
}
