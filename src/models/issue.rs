use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// What kind of problem an issue describes
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Hardcoded secret or credential
    SecretExposure,

    /// Leftover debug statement
    DebugStatement,

    /// General code-quality problem
    CodeQuality,

    /// Performance smell
    Performance,

    /// Code without test coverage
    MissingTest,

    /// Anything else
    Other,
}

/// Coarse grouping used for scoring and reporting
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    Security,
    Debug,
    Quality,
    Performance,
}

/// Severity levels for issues, ordered by risk
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Worth a look
    Low,

    /// Should be fixed
    Medium,

    /// Must be fixed
    High,

    /// Must be fixed immediately
    Critical,
}

impl Severity {
    /// Penalty this severity subtracts from the security score
    pub fn weight(self) -> u32 {
        match self {
            Severity::Low => 3,
            Severity::Medium => 8,
            Severity::High => 15,
            Severity::Critical => 25,
        }
    }
}

/// One detected problem instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Kind of problem
    #[serde(rename = "type")]
    pub kind: IssueKind,

    /// Coarse grouping for scoring
    pub category: IssueCategory,

    /// Line number (1-indexed) in the scanned text
    pub line: usize,

    /// Severity of the issue
    pub severity: Severity,

    /// Human-readable description
    pub message: String,

    /// The literal substring that triggered detection
    #[serde(rename = "match")]
    pub matched: String,

    /// Whether a fix generator can address this issue
    pub fix_available: bool,
}
