use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// How much the generator trusts a fix
///
/// High is reserved for deterministic rule-based rewrites; AI-sourced
/// fixes are capped at Medium.
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
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Provenance of a fix
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FixType {
    /// Deterministic textual substitution
    RuleBased,

    /// Proposed by the external fix provider
    AiGenerated,
}

/// Lifecycle of a fix during selection and application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FixState {
    Proposed,
    Selected,
    Applying,
    Applied,
    Failed,
}

/// One proposed remediation for an issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fix {
    /// Target line (1-indexed), matching an issue in the same analysis
    pub line: usize,

    /// Verbatim text the fix replaces
    pub original_code: String,

    /// Verbatim replacement text
    pub fixed_code: String,

    /// Human-readable rationale
    pub explanation: String,

    /// Generator confidence
    pub confidence: Confidence,

    /// Provenance tag
    pub fix_type: FixType,

    /// Names of secret/config values the fix externalizes
    pub env_vars_needed: BTreeSet<String>,

    /// Whether this fix has been committed
    pub applied: bool,
}

impl Fix {
    /// Identity of a fix within one analysis batch.
    ///
    /// Batches may be re-ordered or filtered between generation and
    /// application, so selection always goes through this key and never
    /// through array position.
    pub fn key(&self) -> FixKey {
        FixKey {
            line: self.line,
            explanation: self.explanation.clone(),
        }
    }
}

/// `(line, explanation)` identity of a fix
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FixKey {
    pub line: usize,
    pub explanation: String,
}
