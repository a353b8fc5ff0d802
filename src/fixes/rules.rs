//! Rule-based fix generation
//!
//! Deterministic textual substitutions keyed on the issue kind. Each
//! rule either produces a complete fix or declines the issue; there is
//! no partial output.

use std::collections::BTreeSet;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::detect::patterns::SourceLanguage;
use crate::errors::ProviderError;
use crate::models::{Confidence, Fix, FixType, Issue, IssueKind};

use super::FixGenerator;

/// Captures the variable name on the left of a secret assignment
static ASSIGNED_NAME: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(\w+)\s*[:=]").ok());

/// Deterministic fix generator
#[derive(Debug, Clone, Default)]
pub struct RuleFixGenerator;

impl RuleFixGenerator {
    pub fn new() -> Self {
        Self
    }

    fn fix_for(&self, issue: &Issue, language: SourceLanguage) -> Option<Fix> {
        match issue.kind {
            IssueKind::SecretExposure => self.secret_fix(issue, language),
            IssueKind::DebugStatement => self.debug_fix(issue),
            IssueKind::CodeQuality => self.quality_fix(issue),
            _ => None,
        }
    }

    /// Replace a hardcoded secret with an environment-variable read
    fn secret_fix(&self, issue: &Issue, language: SourceLanguage) -> Option<Fix> {
        let name = ASSIGNED_NAME
            .as_ref()
            .and_then(|re| re.captures(&issue.matched))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "secret".to_string());
        let env_var = name.to_uppercase();

        let fixed_code = match language {
            SourceLanguage::Python => format!("{} = os.environ[\"{}\"]", name, env_var),
            SourceLanguage::JavaScript | SourceLanguage::TypeScript => {
                format!("const {} = process.env.{}", name, env_var)
            }
            _ => format!("// Replace with environment variable: {}", env_var),
        };

        Some(Fix {
            line: issue.line,
            original_code: issue.matched.clone(),
            fixed_code,
            explanation: format!(
                "Replace hardcoded secret with environment variable {}",
                env_var
            ),
            confidence: Confidence::High,
            fix_type: FixType::RuleBased,
            env_vars_needed: BTreeSet::from([env_var]),
            applied: false,
        })
    }

    /// Comment out a leftover debug statement
    fn debug_fix(&self, issue: &Issue) -> Option<Fix> {
        let code = issue.matched.as_str();

        if code.contains("print(") || code.contains("pprint(") {
            Some(Fix {
                line: issue.line,
                original_code: code.to_string(),
                fixed_code: format!("# {}  # TODO: Remove debug statement", code),
                explanation: "Comment out debug print statement".to_string(),
                confidence: Confidence::High,
                fix_type: FixType::RuleBased,
                env_vars_needed: BTreeSet::new(),
                applied: false,
            })
        } else if code.contains("console.") {
            Some(Fix {
                line: issue.line,
                original_code: code.to_string(),
                fixed_code: format!("// {}  // TODO: Remove debug statement", code),
                explanation: "Comment out debug console statement".to_string(),
                confidence: Confidence::High,
                fix_type: FixType::RuleBased,
                env_vars_needed: BTreeSet::new(),
                applied: false,
            })
        } else {
            None
        }
    }

    /// Narrow quality rewrites with an unambiguous replacement
    fn quality_fix(&self, issue: &Issue) -> Option<Fix> {
        let code = issue.matched.as_str();

        if code.contains("except:") {
            Some(Fix {
                line: issue.line,
                original_code: code.to_string(),
                fixed_code: code.replace("except:", "except Exception as e:"),
                explanation: "Replace bare except with specific exception handling"
                    .to_string(),
                confidence: Confidence::High,
                fix_type: FixType::RuleBased,
                env_vars_needed: BTreeSet::new(),
                applied: false,
            })
        } else {
            None
        }
    }
}

#[async_trait]
impl FixGenerator for RuleFixGenerator {
    fn provenance(&self) -> FixType {
        FixType::RuleBased
    }

    async fn generate(
        &self,
        issues: &[Issue],
        _source: &str,
        filename: &str,
    ) -> Result<Vec<Fix>, ProviderError> {
        let language = SourceLanguage::from_path(filename);
        Ok(issues
            .iter()
            .filter_map(|issue| self.fix_for(issue, language))
            .collect())
    }
}
