//! Fix selection and application
//!
//! Selected fixes move through `Proposed → Selected → Applying →
//! Applied | Failed`. The applier re-validates every fix against the
//! current file content, so drift since analysis fails the individual
//! fix instead of silently rewriting the wrong code.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::errors::ApplyError;
use crate::models::{Confidence, Fix, FixKey, FixState};

/// How an operator (or policy) picks fixes out of a batch.
///
/// Everything resolves down to `(line, explanation)` keys before
/// application; the convenience variants exist for the CLI and the
/// autofix policy.
#[derive(Debug, Clone)]
pub enum FixSelection {
    /// Exact keys
    Keys(Vec<FixKey>),

    /// Every fix targeting one of these lines
    Lines(Vec<usize>),

    /// Every High-confidence fix in the batch
    HighConfidence,
}

impl FixSelection {
    /// Resolve this selection to keys against a batch
    pub fn resolve(&self, batch: &[Fix]) -> Vec<FixKey> {
        match self {
            FixSelection::Keys(keys) => keys.clone(),
            FixSelection::Lines(lines) => batch
                .iter()
                .filter(|fix| lines.contains(&fix.line))
                .map(Fix::key)
                .collect(),
            FixSelection::HighConfidence => batch
                .iter()
                .filter(|fix| fix.confidence == Confidence::High)
                .map(Fix::key)
                .collect(),
        }
    }
}

/// Terminal state of one selected fix
#[derive(Debug, Clone, Serialize)]
pub struct FixOutcome {
    /// Identity of the fix within the batch
    pub key: FixKey,

    /// The fix itself, when the key resolved
    pub fix: Option<Fix>,

    /// `Applied` or `Failed`
    pub state: FixState,

    /// Present iff the fix failed
    pub error: Option<ApplyError>,
}

/// Result of applying a selection against one file's content
#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    /// Rewritten content (equal to the input when nothing applied)
    pub content: String,

    /// One terminal outcome per selected fix
    pub outcomes: Vec<FixOutcome>,

    /// Union of env vars needed by the applied fixes
    pub env_vars_needed: BTreeSet<String>,
}

impl ApplyReport {
    /// Applied fixes, in application order
    pub fn applied(&self) -> Vec<&Fix> {
        self.outcomes
            .iter()
            .filter(|o| o.state == FixState::Applied)
            .filter_map(|o| o.fix.as_ref())
            .collect()
    }

    /// Failed outcomes, with their reasons
    pub fn failed(&self) -> Vec<&FixOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.state == FixState::Failed)
            .collect()
    }

    pub fn applied_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.state == FixState::Applied)
            .count()
    }
}

/// Applies selected fixes to file content
#[derive(Debug, Clone, Default)]
pub struct FixApplier;

impl FixApplier {
    pub fn new() -> Self {
        Self
    }

    /// Apply the selected fixes from `batch` to `content`.
    ///
    /// Fixes are applied in ascending `(line, explanation)` order; this
    /// order is stable and conflict resolution depends on it. The
    /// report captures exactly which fixes applied and which failed;
    /// a partial failure never discards successful rewrites.
    pub fn apply(&self, content: &str, batch: &[Fix], selection: &[FixKey]) -> ApplyReport {
        let trailing_newline = content.ends_with('\n');
        let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
        let mut outcomes = Vec::new();
        let mut env_vars_needed = BTreeSet::new();

        // Selection: resolve keys, never positions
        let mut selected: Vec<Fix> = Vec::new();
        for key in selection {
            match batch.iter().find(|fix| fix.key() == *key) {
                Some(fix) => selected.push(fix.clone()),
                None => outcomes.push(FixOutcome {
                    key: key.clone(),
                    fix: None,
                    state: FixState::Failed,
                    error: Some(ApplyError::UnknownFix {
                        line: key.line,
                        explanation: key.explanation.clone(),
                    }),
                }),
            }
        }

        selected.sort_by(|a, b| {
            a.line
                .cmp(&b.line)
                .then_with(|| a.explanation.cmp(&b.explanation))
        });

        let mut rewritten: HashSet<usize> = HashSet::new();

        for fix in selected {
            let outcome = self.apply_one(&mut lines, &fix, &mut rewritten);
            if outcome.state == FixState::Applied {
                env_vars_needed.extend(fix.env_vars_needed.iter().cloned());
            }
            outcomes.push(outcome);
        }

        let mut content = lines.join("\n");
        if trailing_newline && !content.is_empty() {
            content.push('\n');
        }

        ApplyReport {
            content,
            outcomes,
            env_vars_needed,
        }
    }

    fn apply_one(
        &self,
        lines: &mut [String],
        fix: &Fix,
        rewritten: &mut HashSet<usize>,
    ) -> FixOutcome {
        let key = fix.key();

        // Two fixes never rewrite the same line in one batch
        if rewritten.contains(&fix.line) {
            return failed(key, fix, ApplyError::Conflict { line: fix.line });
        }

        let index = fix.line.wrapping_sub(1);
        let Some(line) = lines.get(index) else {
            return failed(
                key,
                fix,
                ApplyError::Stale {
                    line: fix.line,
                    expected: fix.original_code.trim().to_string(),
                },
            );
        };

        let original = fix.original_code.trim();
        let replacement = fix.fixed_code.trim();

        // Re-applying an already-applied fix is a no-op, not an error
        if line.contains(replacement) {
            rewritten.insert(fix.line);
            return applied(key, fix);
        }

        if original.is_empty() || !line.contains(original) {
            return failed(
                key,
                fix,
                ApplyError::Stale {
                    line: fix.line,
                    expected: original.to_string(),
                },
            );
        }

        lines[index] = line.replace(original, replacement);
        rewritten.insert(fix.line);
        applied(key, fix)
    }
}

fn applied(key: FixKey, fix: &Fix) -> FixOutcome {
    let mut fix = fix.clone();
    fix.applied = true;
    FixOutcome {
        key,
        fix: Some(fix),
        state: FixState::Applied,
        error: None,
    }
}

fn failed(key: FixKey, fix: &Fix, error: ApplyError) -> FixOutcome {
    FixOutcome {
        key,
        fix: Some(fix.clone()),
        state: FixState::Failed,
        error: Some(error),
    }
}

/// `.env.example` content for the env vars a fix batch externalized
pub fn env_example(env_vars: &BTreeSet<String>) -> String {
    let mut content = String::from(
        "# Environment Variables\n# Copy this file to .env and add your actual values\n\n",
    );
    for var in env_vars {
        content.push_str(&format!("{}=your_{}_here\n", var, var.to_lowercase()));
    }
    content.push_str("\n# Add this file to your .gitignore!\n");
    content
}
