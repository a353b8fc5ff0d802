use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Outcome of a logged agent action
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Success,
    Error,
}

/// Append-only record of one agent action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    /// When the action finished
    pub timestamp: DateTime<Utc>,

    /// What the agent did (e.g. `analysis_completed`)
    pub action: String,

    /// Whether it succeeded
    pub status: ActivityStatus,

    /// Enough context to reconstruct what happened without re-running
    /// the pipeline (repository, branch, counts)
    pub details: serde_json::Value,
}
