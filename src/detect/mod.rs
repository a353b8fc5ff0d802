//! Issue detection
//!
//! The detector is a pure function of its inputs: it scans a file's
//! text against the pattern tables and emits issues in ascending line
//! order. Exclusion filtering happens in the caller; the filename is
//! only used to pick language-specific pattern groups.

pub mod patterns;

use crate::errors::DetectError;
use crate::models::Issue;

use patterns::{Rule, SourceLanguage};

/// Longest matched substring kept verbatim on an issue
const MAX_MATCH_LEN: usize = 100;

/// Scans source text for code-quality and security issues
#[derive(Debug, Clone, Default)]
pub struct Detector;

impl Detector {
    /// Create a new detector
    pub fn new() -> Self {
        Self
    }

    /// Scan `text` and return issues in ascending line order
    pub fn detect(&self, text: &str, filename: &str) -> Vec<Issue> {
        let language = SourceLanguage::from_path(filename);
        let mut issues = Vec::new();

        for rule in patterns::security_rules() {
            scan(rule, text, &mut issues);
        }
        for rule in patterns::debug_rules(language) {
            scan(rule, text, &mut issues);
        }
        for rule in patterns::quality_rules(language) {
            scan(rule, text, &mut issues);
        }
        for rule in patterns::performance_rules(language) {
            scan(rule, text, &mut issues);
        }

        // Stable sort keeps the rule-table order for same-line issues
        issues.sort_by_key(|issue| issue.line);
        issues
    }
}

fn scan(rule: &Rule, text: &str, out: &mut Vec<Issue>) {
    for m in rule.regex.find_iter(text) {
        out.push(Issue {
            kind: rule.kind,
            category: rule.category,
            line: line_of(text, m.start()),
            severity: rule.severity,
            message: rule.message.to_string(),
            matched: truncate_match(m.as_str()),
            fix_available: true,
        });
    }
}

/// 1-based line number of a byte offset
fn line_of(text: &str, offset: usize) -> usize {
    text.as_bytes()[..offset].iter().filter(|b| **b == b'\n').count() + 1
}

fn truncate_match(matched: &str) -> String {
    let trimmed = matched.trim();
    if trimmed.chars().count() > MAX_MATCH_LEN {
        let head: String = trimmed.chars().take(MAX_MATCH_LEN).collect();
        format!("{}...", head)
    } else {
        trimmed.to_string()
    }
}

/// Decode raw file bytes as UTF-8 source text.
///
/// Binary or otherwise unreadable content fails with a decode error
/// that the caller reports for that file alone.
pub fn decode_source(filename: &str, bytes: &[u8]) -> Result<String, DetectError> {
    String::from_utf8(bytes.to_vec()).map_err(|err| DetectError::Decode {
        path: filename.to_string(),
        message: err.to_string(),
    })
}
