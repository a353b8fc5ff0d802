//! Output formatting for Mender

use colored::Colorize;

use crate::agent::{AgentStatus, FileApplyReport, PolicyAction, PushOutcome, RepoApplyReport};
use crate::models::{ActivityLogEntry, ActivityStatus, AnalysisResult, FixState, RiskLevel, Severity};

/// Trait for formatting operator-facing output
pub trait OutputFormatter {
    /// Format a repository analysis
    fn format_analysis(&self, result: &AnalysisResult) -> String;

    /// Format fix application results
    fn format_apply(&self, report: &RepoApplyReport) -> String;

    /// Format the agent status snapshot
    fn format_status(&self, status: &AgentStatus) -> String;

    /// Format recent activity entries
    fn format_activity(&self, entries: &[ActivityLogEntry]) -> String;

    /// Format the outcome of a push event
    fn format_push(&self, outcome: &PushOutcome) -> String {
        match outcome {
            PushOutcome::Skipped { reason } => format!("Push skipped: {}\n", reason),
            PushOutcome::Analyzed(report) => {
                let mut output = self.format_analysis(&report.analysis);
                match &report.action {
                    PolicyAction::None => {}
                    PolicyAction::Suggested { request } => {
                        output.push_str(&format!(
                            "\nOpened suggestion request #{}: {}\n",
                            request.number, request.url
                        ));
                    }
                    PolicyAction::SuggestFailed { error } => {
                        output.push_str(&format!("\nCould not open suggestion request: {}\n", error));
                    }
                    PolicyAction::Applied(apply) => {
                        output.push('\n');
                        output.push_str(&self.format_apply(apply));
                    }
                }
                output
            }
        }
    }
}

/// Default implementation that uses pretty formatting with colors
#[derive(Clone)]
pub struct PrettyFormatter {
    /// Whether to use emojis
    use_emoji: bool,
}

impl Default for PrettyFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl PrettyFormatter {
    /// Create a new PrettyFormatter
    pub fn new() -> Self {
        Self { use_emoji: true }
    }

    fn severity_label(&self, severity: Severity) -> String {
        let label = severity.to_string();
        match severity {
            Severity::Critical => label.red().bold().to_string(),
            Severity::High => label.red().to_string(),
            Severity::Medium => label.yellow().to_string(),
            Severity::Low => label.blue().to_string(),
        }
    }

    fn risk_label(&self, risk: RiskLevel) -> String {
        let label = risk.to_string();
        match risk {
            RiskLevel::Critical => label.red().bold().to_string(),
            RiskLevel::High => label.red().to_string(),
            RiskLevel::Medium => label.yellow().to_string(),
            RiskLevel::Low => label.green().to_string(),
        }
    }
}

impl OutputFormatter for PrettyFormatter {
    fn format_analysis(&self, result: &AnalysisResult) -> String {
        let mut output = String::new();
        let separator = "━".repeat(60).dimmed();

        let header_emoji = if self.use_emoji { "🩹 " } else { "" };
        output.push_str(&format!(
            "{}Analysis of {} @ {}\n",
            header_emoji,
            result.repository.bold(),
            result.branch
        ));
        output.push_str(&format!("{}\n\n", separator));

        output.push_str(&format!(
            "  Security score: {}/100   Risk: {}\n",
            result.security_score,
            self.risk_label(result.risk_level)
        ));
        output.push_str(&format!(
            "  Files analyzed: {}   Issues: {}",
            result.files_analyzed, result.total_issues
        ));
        if result.files_skipped > 0 {
            output.push_str(&format!(
                "   ({} eligible files skipped over the limit)",
                result.files_skipped
            ));
        }
        output.push('\n');

        for file in &result.files {
            output.push_str(&format!("\n📄 {}\n", file.filename.bold()));

            for issue in &file.issues {
                output.push_str(&format!(
                    "  {:>4} │ {} {} — {}\n",
                    issue.line,
                    self.severity_label(issue.severity),
                    issue.message,
                    issue.matched.dimmed()
                ));
            }

            if !file.fixes.is_empty() {
                output.push_str(&format!(
                    "  {} {} fix candidates:\n",
                    if self.use_emoji { "🔧" } else { ">" },
                    file.fixes_count
                ));
                for fix in &file.fixes {
                    output.push_str(&format!(
                        "    line {} [{} {}] {}\n",
                        fix.line,
                        fix.fix_type.to_string().dimmed(),
                        fix.confidence,
                        fix.explanation
                    ));
                }
            }
        }

        if !result.file_errors.is_empty() {
            output.push_str(&format!(
                "\n⚠️ {} files could not be analyzed:\n",
                result.file_errors.len()
            ));
            for error in &result.file_errors {
                output.push_str(&format!("  - {}: {}\n", error.filename, error.error));
            }
        }

        if result.total_issues == 0 && result.file_errors.is_empty() {
            let sparkle = if self.use_emoji { "✨ " } else { "" };
            output.push_str(&format!(
                "\n{}No issues detected!\n",
                sparkle
            ));
        }

        output
    }

    fn format_apply(&self, report: &RepoApplyReport) -> String {
        let mut output = String::new();

        let wrench = if self.use_emoji { "🔧 " } else { "" };
        output.push_str(&format!(
            "{}Applied {} fixes across {} files\n",
            wrench,
            report.total_applied,
            report.files.len()
        ));

        for FileApplyReport { filename, report } in &report.files {
            output.push_str(&format!("\n📄 {}\n", filename.bold()));
            for outcome in &report.outcomes {
                match outcome.state {
                    FixState::Applied => {
                        output.push_str(&format!(
                            "  {} line {} — {}\n",
                            "✓".green(),
                            outcome.key.line,
                            outcome.key.explanation
                        ));
                    }
                    _ => {
                        let reason = outcome
                            .error
                            .as_ref()
                            .map(|e| e.to_string())
                            .unwrap_or_else(|| "unknown".to_string());
                        output.push_str(&format!(
                            "  {} line {} — {} ({})\n",
                            "✗".red(),
                            outcome.key.line,
                            outcome.key.explanation,
                            reason.red()
                        ));
                    }
                }
            }
        }

        for error in &report.file_errors {
            output.push_str(&format!(
                "  {} {}: {}\n",
                "✗".red(),
                error.filename,
                error.error
            ));
        }

        if !report.env_vars_needed.is_empty() {
            let vars: Vec<_> = report.env_vars_needed.iter().cloned().collect();
            output.push_str(&format!(
                "\n🔑 Environment variables to configure: {}\n",
                vars.join(", ")
            ));
        }

        if let Some(request) = &report.request {
            output.push_str(&format!(
                "\n🚀 Opened change request #{}: {}\n",
                request.number, request.url
            ));
        }
        if let Some(error) = &report.publish_error {
            output.push_str(&format!(
                "\n⚠️ Publishing failed ({}); rewritten content is preserved in the report\n",
                error
            ));
        }

        output
    }

    fn format_status(&self, status: &AgentStatus) -> String {
        let mut output = String::new();

        let gear = if self.use_emoji { "⚙️ " } else { "" };
        output.push_str(&format!("{}Agent status\n", gear));
        output.push_str(&format!("  Mode: {}\n", status.agent_mode.to_string().bold()));
        output.push_str(&format!("  Auto-commit: {}\n", status.auto_commit));
        output.push_str(&format!("  Max files per run: {}\n", status.max_files));
        output.push_str(&format!(
            "  AI fixes: {}\n",
            if status.ai_enabled {
                "enabled".green().to_string()
            } else {
                "disabled".dimmed().to_string()
            }
        ));

        if status.monitored_repositories.is_empty() {
            output.push_str("  Monitored repositories: none\n");
        } else {
            output.push_str("  Monitored repositories:\n");
            for repo in &status.monitored_repositories {
                output.push_str(&format!("    - {}\n", repo));
            }
        }

        if !status.recent_activity.is_empty() {
            output.push_str("\n  Recent activity:\n");
            for entry in &status.recent_activity {
                output.push_str(&format!(
                    "    {} {} [{}]\n",
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.action,
                    entry.status
                ));
            }
        }

        output
    }

    fn format_activity(&self, entries: &[ActivityLogEntry]) -> String {
        if entries.is_empty() {
            return "No recorded activity yet\n".to_string();
        }

        let mut output = String::new();
        let scroll = if self.use_emoji { "📜 " } else { "" };
        output.push_str(&format!("{}Recent activity\n", scroll));

        for entry in entries {
            let status = match entry.status {
                ActivityStatus::Success => entry.status.to_string().green().to_string(),
                ActivityStatus::Error => entry.status.to_string().red().to_string(),
            };
            output.push_str(&format!(
                "  {} {} [{}] {}\n",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
                entry.action.bold(),
                status,
                entry.details
            ));
        }

        output
    }
}

/// JSON formatter for machine-readable output
#[derive(Clone, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_analysis(&self, result: &AnalysisResult) -> String {
        serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_apply(&self, report: &RepoApplyReport) -> String {
        serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_status(&self, status: &AgentStatus) -> String {
        serde_json::to_string_pretty(status).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_activity(&self, entries: &[ActivityLogEntry]) -> String {
        serde_json::to_string_pretty(entries).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_push(&self, outcome: &PushOutcome) -> String {
        serde_json::to_string_pretty(outcome).unwrap_or_else(|_| "{}".to_string())
    }
}
