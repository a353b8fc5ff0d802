use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Main error type for Mender
#[derive(Debug, Error)]
pub enum MenderError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Detection errors
    #[error("Detection error: {0}")]
    Detect(#[from] DetectError),

    /// Fix provider errors
    #[error("Fix provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Fix application errors
    #[error("Fix application error: {0}")]
    Apply(#[from] ApplyError),

    /// Repository host errors
    #[error("Repository host error: {0}")]
    Host(#[from] HostError),

    /// Malformed event payload
    #[error("Invalid event payload: {0}")]
    Payload(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Configuration related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error loading configuration file
    #[error("Failed to load config from {path}: {message}")]
    LoadError { path: PathBuf, message: String },

    /// Error parsing configuration
    #[error("Failed to parse config: {0}")]
    ParseError(String),

    /// Semantically invalid configuration value
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Detection errors
#[derive(Debug, Error)]
pub enum DetectError {
    /// File content could not be decoded as text
    #[error("Cannot decode '{path}' as UTF-8 text: {message}")]
    Decode { path: String, message: String },
}

/// AI fix provider errors
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Provider could not be reached
    #[error("Fix provider unavailable: {0}")]
    Unavailable(String),

    /// Provider is missing credentials or endpoint configuration
    #[error("Fix provider not configured: {0}")]
    Misconfigured(String),

    /// Provider responded with something that is not a fix
    #[error("Fix provider returned a malformed response: {0}")]
    Malformed(String),
}

/// Fix application errors
///
/// Serializable so apply reports can carry the precise failure reason
/// for each fix.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApplyError {
    /// File content drifted since the fix was generated
    #[error("Line {line} no longer matches the code this fix was generated against: expected '{expected}'")]
    Stale { line: usize, expected: String },

    /// Another selected fix already rewrote this line
    #[error("Line {line} was already rewritten by another fix in this batch")]
    Conflict { line: usize },

    /// Selection referenced a fix that is not in the batch
    #[error("No fix with line {line} and explanation '{explanation}' in this batch")]
    UnknownFix { line: usize, explanation: String },

    /// An apply operation is already running for this repository/branch
    #[error("A fix application is already in flight for {repository}@{branch}")]
    InFlight { repository: String, branch: String },
}

/// Repository host errors
#[derive(Debug, Error)]
pub enum HostError {
    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Host answered with a non-success status
    #[error("Host returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// Commit or pull-request creation failed
    #[error("Failed to publish fixes ({stage}): {message}")]
    Publish { stage: String, message: String },

    /// Host content could not be decoded
    #[error("Cannot decode host response: {0}")]
    Decode(String),
}
