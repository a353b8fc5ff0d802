//! Detection pattern tables
//!
//! Each rule pairs a case-insensitive regex with the issue shape it
//! produces. Rules are grouped by concern; debug, quality, and
//! performance groups are keyed off the source language.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::models::{IssueCategory, IssueKind, Severity};

/// A compiled detection rule
pub struct Rule {
    pub regex: Regex,
    pub kind: IssueKind,
    pub category: IssueCategory,
    pub severity: Severity,
    pub message: &'static str,
}

/// Language group a file belongs to, derived from its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLanguage {
    Python,
    JavaScript,
    TypeScript,
    Sql,
    Other,
}

impl SourceLanguage {
    pub fn from_path(path: &str) -> Self {
        let extension = path.rsplit('.').next().unwrap_or("").to_lowercase();
        match extension.as_str() {
            "py" => SourceLanguage::Python,
            "js" | "jsx" => SourceLanguage::JavaScript,
            "ts" | "tsx" => SourceLanguage::TypeScript,
            "sql" => SourceLanguage::Sql,
            _ => SourceLanguage::Other,
        }
    }
}

fn rule(
    pattern: &str,
    kind: IssueKind,
    category: IssueCategory,
    severity: Severity,
    message: &'static str,
) -> Option<Rule> {
    // A rule that fails to compile is dropped, never fatal
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .ok()
        .map(|regex| Rule {
            regex,
            kind,
            category,
            severity,
            message,
        })
}

fn security(pattern: &str, severity: Severity, message: &'static str) -> Option<Rule> {
    rule(
        pattern,
        IssueKind::SecretExposure,
        IssueCategory::Security,
        severity,
        message,
    )
}

fn debug(pattern: &str, severity: Severity, message: &'static str) -> Option<Rule> {
    rule(
        pattern,
        IssueKind::DebugStatement,
        IssueCategory::Debug,
        severity,
        message,
    )
}

fn quality(pattern: &str, severity: Severity, message: &'static str) -> Option<Rule> {
    rule(
        pattern,
        IssueKind::CodeQuality,
        IssueCategory::Quality,
        severity,
        message,
    )
}

fn performance(pattern: &str, severity: Severity, message: &'static str) -> Option<Rule> {
    rule(
        pattern,
        IssueKind::Performance,
        IssueCategory::Performance,
        severity,
        message,
    )
}

static SECURITY_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    use Severity::*;

    [
        // API keys and tokens
        security(r#"api[_-]?key["']?\s*[:=]\s*["'][^"']{8,}["']"#, Critical, "API Key Exposure"),
        security(r#"secret[_-]?key["']?\s*[:=]\s*["'][^"']{8,}["']"#, Critical, "Secret Key Exposure"),
        security(r#"access[_-]?token["']?\s*[:=]\s*["'][^"']{10,}["']"#, Critical, "Access Token Exposure"),
        security(r#"auth[_-]?token["']?\s*[:=]\s*["'][^"']{10,}["']"#, Critical, "Auth Token Exposure"),
        security(r#"client[_-]?secret["']?\s*[:=]\s*["'][^"']{10,}["']"#, Critical, "Client Secret Exposure"),
        // Passwords
        security(r#"password["']?\s*[:=]\s*["'][^"']{6,}["']"#, Critical, "Password Hardcoded"),
        security(r#"passwd["']?\s*[:=]\s*["'][^"']{6,}["']"#, Critical, "Password Hardcoded"),
        security(r#"pwd["']?\s*[:=]\s*["'][^"']{6,}["']"#, High, "Password Variable"),
        // Cloud provider keys
        security(r"sk_[a-zA-Z0-9]{24,}", Critical, "Stripe Secret Key"),
        security(r"pk_[a-zA-Z0-9]{24,}", High, "Stripe Public Key"),
        security(r"rk_[a-zA-Z0-9]{24,}", Critical, "Stripe Restricted Key"),
        security(r"AKIA[0-9A-Z]{16}", Critical, "AWS Access Key ID"),
        security(r"ghp_[A-Za-z0-9]{36}", Critical, "GitHub Personal Access Token"),
        security(r"github_pat_[A-Za-z0-9]{22,}", Critical, "GitHub Fine-grained Token"),
        security(r"gho_[A-Za-z0-9]{36}", High, "GitHub OAuth Token"),
        security(r"ya29\.[0-9A-Za-z\-_]+", Critical, "Google OAuth Access Token"),
        security(r"AIza[0-9A-Za-z\-_]{35}", High, "Google API Key"),
        // Connection strings
        security(r#"mongodb://[^"\s]+"#, High, "MongoDB Connection String"),
        security(r#"postgresql://[^"\s]+"#, High, "PostgreSQL Connection String"),
        security(r#"mysql://[^"\s]+"#, High, "MySQL Connection String"),
        security(r#"redis://[^"\s]+"#, Medium, "Redis Connection String"),
        // Signing and encryption material
        security(r#"jwt[_-]?secret["']?\s*[:=]\s*["'][^"']{10,}["']"#, Critical, "JWT Secret Key"),
        security(r#"signing[_-]?key["']?\s*[:=]\s*["'][^"']{10,}["']"#, High, "Signing Key"),
        security(r#"encryption[_-]?key["']?\s*[:=]\s*["'][^"']{10,}["']"#, Critical, "Encryption Key"),
        security(r"-----BEGIN[^-]+PRIVATE KEY-----", Critical, "Private Key"),
        security(r"-----BEGIN CERTIFICATE-----", Medium, "Certificate"),
        // Third-party service keys
        security(r#"sendgrid[_-]?api[_-]?key["']?\s*[:=]\s*["'][^"']+["']"#, High, "SendGrid API Key"),
        security(r#"mailgun[_-]?api[_-]?key["']?\s*[:=]\s*["'][^"']+["']"#, High, "Mailgun API Key"),
        security(r#"twitter[_-]?api[_-]?key["']?\s*[:=]\s*["'][^"']+["']"#, High, "Twitter API Key"),
        security(r#"facebook[_-]?app[_-]?secret["']?\s*[:=]\s*["'][^"']+["']"#, High, "Facebook App Secret"),
    ]
    .into_iter()
    .flatten()
    .collect()
});

static PYTHON_DEBUG_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    use Severity::*;

    [
        debug(r"print\s*\([^)]*\)", Medium, "Print Statement"),
        debug(r"pprint\s*\([^)]*\)", Medium, "Pretty Print Statement"),
        debug(r"logging\.debug\s*\([^)]*\)", Low, "Debug Logging"),
        debug(r"breakpoint\s*\(\)", High, "Breakpoint"),
        debug(r"import\s+pdb.*pdb\.set_trace\(\)", High, "PDB Debugger"),
        debug(r"import\s+ipdb.*ipdb\.set_trace\(\)", High, "IPDB Debugger"),
        debug(r"input\s*\([^)]*\)", Low, "Input Statement (Debug)"),
    ]
    .into_iter()
    .flatten()
    .collect()
});

static JAVASCRIPT_DEBUG_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    use Severity::*;

    [
        debug(r"console\.log\s*\([^)]*\)", Medium, "Console Log"),
        debug(r"console\.debug\s*\([^)]*\)", Medium, "Console Debug"),
        debug(r"console\.warn\s*\([^)]*\)", Low, "Console Warning"),
        debug(r"console\.error\s*\([^)]*\)", Low, "Console Error"),
        debug(r"console\.trace\s*\([^)]*\)", Medium, "Console Trace"),
        debug(r"debugger\s*;?", High, "Debugger Statement"),
        debug(r"alert\s*\([^)]*\)", Medium, "Alert Statement"),
    ]
    .into_iter()
    .flatten()
    .collect()
});

static TYPESCRIPT_DEBUG_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    use Severity::*;

    [
        debug(r"console\.log\s*\([^)]*\)", Medium, "Console Log"),
        debug(r"console\.debug\s*\([^)]*\)", Medium, "Console Debug"),
        debug(r"debugger\s*;?", High, "Debugger Statement"),
    ]
    .into_iter()
    .flatten()
    .collect()
});

static GENERAL_DEBUG_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    use Severity::*;

    [
        debug(r"#\s*TODO[:\s].*", Low, "TODO Comment"),
        debug(r"#\s*FIXME[:\s].*", Medium, "FIXME Comment"),
        debug(r"#\s*HACK[:\s].*", High, "HACK Comment"),
        debug(r"//\s*TODO[:\s].*", Low, "TODO Comment"),
        debug(r"//\s*FIXME[:\s].*", Medium, "FIXME Comment"),
        debug(r"//\s*HACK[:\s].*", High, "HACK Comment"),
    ]
    .into_iter()
    .flatten()
    .collect()
});

static PYTHON_QUALITY_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    use Severity::*;

    [
        quality(r"except\s*:", Medium, "Bare Except Clause"),
        quality(r"exec\s*\(", High, "Exec Statement (Security Risk)"),
        quality(r"eval\s*\(", High, "Eval Statement (Security Risk)"),
        quality(r"import\s+\*", Medium, "Wildcard Import"),
        quality(r"global\s+\w+", Low, "Global Variable Usage"),
        quality(r"if\s+True\s*:", Low, "Hardcoded True Condition"),
        quality(r"while\s+True\s*:", Low, "Infinite Loop"),
    ]
    .into_iter()
    .flatten()
    .collect()
});

static JAVASCRIPT_QUALITY_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    use Severity::*;

    [
        quality(r"eval\s*\(", High, "Eval Usage (Security Risk)"),
        quality(r"document\.write\s*\(", Medium, "Document.write Usage"),
        quality(r"innerHTML\s*=", Medium, "Direct innerHTML Assignment"),
        quality(r#"setTimeout\s*\(\s*["'][^"']*["']"#, Medium, "setTimeout with String"),
        quality(r#"setInterval\s*\(\s*["'][^"']*["']"#, Medium, "setInterval with String"),
        quality(r"var\s+\w+", Low, "Var Declaration (Use let/const)"),
        quality(r"==\s*null|null\s*==", Low, "Loose Null Comparison"),
        quality(r"==\s*undefined|undefined\s*==", Low, "Loose Undefined Comparison"),
    ]
    .into_iter()
    .flatten()
    .collect()
});

static SQL_QUALITY_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    use Severity::*;

    [
        quality(r"SELECT\s+\*\s+FROM", Medium, "SELECT * Usage"),
        quality(r"DROP\s+TABLE", Critical, "DROP TABLE Statement"),
        quality(r"DELETE\s+FROM.*WHERE", Medium, "DELETE Statement"),
        quality(r"UPDATE.*SET.*WHERE", Medium, "UPDATE Statement"),
    ]
    .into_iter()
    .flatten()
    .collect()
});

static PYTHON_PERFORMANCE_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    use Severity::*;

    [
        performance(
            r"for\s+\w+\s+in\s+range\s*\(\s*len\s*\([^)]+\)\s*\)",
            Medium,
            "Inefficient Range Loop",
        ),
        performance(r"time\.sleep\s*\(\s*[0-9]+\s*\)", Low, "Hard-coded Sleep"),
        performance(r"\.append\s*\([^)]*\)\s*for\s+", Low, "List Comprehension Opportunity"),
    ]
    .into_iter()
    .flatten()
    .collect()
});

static JAVASCRIPT_PERFORMANCE_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    use Severity::*;

    [
        performance(r"document\.getElementById", Low, "DOM Query (Consider Caching)"),
        performance(
            r"for\s*\(\s*var\s+\w+\s*=\s*0.*\.length",
            Low,
            "Length Property in Loop",
        ),
        performance(r"setInterval\s*\([^,]+,\s*[0-9]+\s*\)", Medium, "Frequent Interval"),
        performance(r"setTimeout\s*\([^,]+,\s*0\s*\)", Low, "setTimeout with 0ms"),
    ]
    .into_iter()
    .flatten()
    .collect()
});

/// Secret patterns apply to every file
pub fn security_rules() -> &'static [Rule] {
    &SECURITY_RULES
}

/// Debug-statement patterns: language-specific plus general comments
pub fn debug_rules(language: SourceLanguage) -> Vec<&'static Rule> {
    let specific: &[Rule] = match language {
        SourceLanguage::Python => &PYTHON_DEBUG_RULES,
        SourceLanguage::JavaScript => &JAVASCRIPT_DEBUG_RULES,
        SourceLanguage::TypeScript => &TYPESCRIPT_DEBUG_RULES,
        _ => &[],
    };

    specific.iter().chain(GENERAL_DEBUG_RULES.iter()).collect()
}

/// Code-quality patterns for a language
pub fn quality_rules(language: SourceLanguage) -> &'static [Rule] {
    match language {
        SourceLanguage::Python => &PYTHON_QUALITY_RULES,
        SourceLanguage::JavaScript | SourceLanguage::TypeScript => &JAVASCRIPT_QUALITY_RULES,
        SourceLanguage::Sql => &SQL_QUALITY_RULES,
        SourceLanguage::Other => &[],
    }
}

/// Performance patterns for a language
pub fn performance_rules(language: SourceLanguage) -> &'static [Rule] {
    match language {
        SourceLanguage::Python => &PYTHON_PERFORMANCE_RULES,
        SourceLanguage::JavaScript | SourceLanguage::TypeScript => &JAVASCRIPT_PERFORMANCE_RULES,
        _ => &[],
    }
}
