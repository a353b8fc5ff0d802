//! Fix generation
//!
//! Two generator implementations share the [`FixGenerator`] trait: a
//! deterministic rule-based path and an AI path that delegates to an
//! external provider. The [`FixEngine`] runs both, deduplicates, and
//! reports provider health without ever failing the caller.

pub mod ai;
pub mod rules;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::errors::ProviderError;
use crate::models::{Fix, FixType, Issue};

pub use ai::{AiFixGenerator, AiFixProvider, ChatFixProvider, ProposedFix};
pub use rules::RuleFixGenerator;

/// Trait for fix generators
#[async_trait]
pub trait FixGenerator: Send + Sync {
    /// Provenance tag stamped onto every fix this generator produces
    fn provenance(&self) -> FixType;

    /// Produce fix candidates for the given issues.
    ///
    /// Implementations must compute `env_vars_needed` themselves: any
    /// fix that removes a literal secret enumerates the symbolic name
    /// replacing it. Individual issues may be declined; an error means
    /// the whole generator path is unavailable.
    async fn generate(
        &self,
        issues: &[Issue],
        source: &str,
        filename: &str,
    ) -> Result<Vec<Fix>, ProviderError>;
}

/// Health of the AI fix path for one generation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProviderStatus {
    /// AI fixes were generated
    Ready,

    /// No provider configured; rule-based fixes only
    Disabled,

    /// Provider failed; rule-based fixes only
    Unavailable { reason: String },
}

/// Fixes generated for one file, with provider health
#[derive(Debug, Clone, Serialize)]
pub struct FixBatch {
    pub fixes: Vec<Fix>,
    pub provider_status: ProviderStatus,
}

/// Runs the rule-based and AI generator paths for a file
pub struct FixEngine {
    rules: RuleFixGenerator,
    ai: Option<AiFixGenerator>,
}

impl FixEngine {
    /// Engine with an optional AI provider
    pub fn new(provider: Option<Arc<dyn AiFixProvider>>) -> Self {
        Self {
            rules: RuleFixGenerator::new(),
            ai: provider.map(AiFixGenerator::new),
        }
    }

    /// Rule-based only
    pub fn rule_based() -> Self {
        Self::new(None)
    }

    /// Whether the AI path is present and has credentials
    pub fn ai_configured(&self) -> bool {
        self.ai.as_ref().is_some_and(|ai| ai.is_configured())
    }

    /// Generate fixes for one file's issues.
    ///
    /// Provider loss degrades to rule-based fixes; it never fails the
    /// caller. Fixes with identical `(line, fixed_code)` collapse to
    /// one canonical entry, rule-based retained.
    pub async fn generate(&self, issues: &[Issue], source: &str, filename: &str) -> FixBatch {
        let mut fixes = self
            .rules
            .generate(issues, source, filename)
            .await
            .unwrap_or_default();

        let provider_status = match &self.ai {
            None => ProviderStatus::Disabled,
            Some(ai) if !ai.is_configured() => ProviderStatus::Disabled,
            Some(ai) => match ai.generate(issues, source, filename).await {
                Ok(ai_fixes) => {
                    fixes.extend(ai_fixes);
                    ProviderStatus::Ready
                }
                Err(err) => {
                    log::warn!("AI fix generation degraded for {}: {}", filename, err);
                    ProviderStatus::Unavailable {
                        reason: err.to_string(),
                    }
                }
            },
        };

        // Rule-based fixes come first, so they win the dedup
        let mut seen = HashSet::new();
        fixes.retain(|fix| seen.insert((fix.line, fix.fixed_code.clone())));

        FixBatch {
            fixes,
            provider_status,
        }
    }
}
