//! Agent controller
//!
//! The only stateful, long-lived component: it wraps the detector, the
//! fix engine, and the applier behind the per-repository automation
//! policy, guards concurrent applies per `(repository, branch)`, and
//! records one terminal activity entry per unit of work.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use futures::future;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::apply::{env_example, ApplyReport, FixApplier, FixSelection};
use crate::config::{AgentConfig, AgentConfigUpdate, AgentMode, SharedAgentConfig};
use crate::detect::Detector;
use crate::errors::{ApplyError, HostError, MenderError};
use crate::fixes::FixEngine;
use crate::host::{ChangeRequest, ChangeSummary, CommitFile, RepoHost};
use crate::models::{ActivityLogEntry, ActivityStatus, AnalysisResult, FileError, FileResult};

/// Marker the agent stamps into its own commit messages, so a push of
/// its own fixes never triggers another analysis round
pub const FIX_COMMIT_MARKER: &str = "[mender]";

/// Most recent activity entries kept in memory
const ACTIVITY_CAP: usize = 100;

/// Extensions the detector knows how to analyze
const ANALYZABLE_EXTENSIONS: &[&str] = &[
    ".py", ".js", ".ts", ".jsx", ".tsx", ".java", ".cpp", ".c", ".php", ".rb", ".go", ".cs",
    ".sql", ".html",
];

/// Inbound repository push event
#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    pub repository: RepositoryRef,

    /// Git ref that was pushed, e.g. `refs/heads/main`
    #[serde(rename = "ref")]
    pub git_ref: String,

    #[serde(default)]
    pub pusher: Pusher,

    #[serde(default)]
    pub commits: Vec<PushCommit>,
}

impl PushEvent {
    /// Branch name without the `refs/heads/` prefix
    pub fn branch(&self) -> String {
        self.git_ref
            .trim_start_matches("refs/heads/")
            .to_string()
    }

    pub fn head_commit(&self) -> Option<&PushCommit> {
        self.commits.last()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryRef {
    pub full_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pusher {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushCommit {
    pub id: String,

    #[serde(default)]
    pub message: String,
}

/// What the controller did with a push
#[derive(Debug, Serialize)]
pub enum PushOutcome {
    /// Nothing analyzed
    Skipped { reason: String },

    /// Analysis ran; the policy follow-up is attached
    Analyzed(Box<AnalysisReport>),
}

/// An analysis plus the policy action that followed it
#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub analysis: AnalysisResult,
    pub action: PolicyAction,
}

/// Policy follow-up after an analysis
#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PolicyAction {
    /// Monitor mode, or nothing to act on
    None,

    /// Suggest mode opened a review request with the fix list
    Suggested { request: ChangeRequest },

    /// Suggest mode could not open the request
    SuggestFailed { error: String },

    /// Autofix mode applied fixes
    Applied(RepoApplyReport),
}

/// Application results across a repository
#[derive(Debug, Serialize)]
pub struct RepoApplyReport {
    /// Per-file apply outcomes
    pub files: Vec<FileApplyReport>,

    /// Files whose current content could not be fetched
    pub file_errors: Vec<FileError>,

    /// Total fixes applied across files
    pub total_applied: usize,

    /// Union of env vars the applied fixes externalized
    pub env_vars_needed: BTreeSet<String>,

    /// Opened change request, when publishing succeeded
    pub request: Option<ChangeRequest>,

    /// Publish failure, reported without losing the rewritten content
    pub publish_error: Option<String>,

    /// Rewritten file contents (still available when publishing failed
    /// or auto-commit is off)
    pub contents: Vec<CommitFile>,
}

/// Apply outcomes for one file
#[derive(Debug, Serialize)]
pub struct FileApplyReport {
    pub filename: String,

    #[serde(flatten)]
    pub report: ApplyReport,
}

/// Agent status snapshot
#[derive(Debug, Serialize)]
pub struct AgentStatus {
    pub agent_mode: AgentMode,
    pub auto_commit: bool,
    pub max_files: usize,
    pub monitored_repositories: Vec<String>,
    pub ai_enabled: bool,
    pub recent_activity: Vec<ActivityLogEntry>,
    pub timestamp: chrono::DateTime<Utc>,
}

/// Append-only in-memory activity log, capped to the newest entries
pub struct ActivityLog {
    entries: Mutex<VecDeque<ActivityLogEntry>>,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityLog {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
        }
    }

    pub fn record(&self, action: &str, status: ActivityStatus, details: serde_json::Value) {
        log::info!("Agent activity: {} - {}", action, status);

        if let Ok(mut entries) = self.entries.lock() {
            entries.push_back(ActivityLogEntry {
                timestamp: Utc::now(),
                action: action.to_string(),
                status,
                details,
            });
            while entries.len() > ACTIVITY_CAP {
                entries.pop_front();
            }
        }
    }

    /// Newest `limit` entries, oldest first
    pub fn recent(&self, limit: usize) -> Vec<ActivityLogEntry> {
        if let Ok(entries) = self.entries.lock() {
            entries
                .iter()
                .rev()
                .take(limit)
                .cloned()
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect()
        } else {
            Vec::new()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Releases the `(repository, branch)` apply slot when dropped
struct ApplyGuard<'a> {
    applying: &'a Mutex<HashSet<(String, String)>>,
    key: (String, String),
}

impl Drop for ApplyGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut slots) = self.applying.lock() {
            slots.remove(&self.key);
        }
    }
}

/// Orchestrates the detection → generation → application pipeline
/// under the configured automation policy
pub struct AgentController {
    config: SharedAgentConfig,
    detector: Detector,
    engine: FixEngine,
    host: Arc<dyn RepoHost>,
    activity: ActivityLog,
    monitored: Mutex<BTreeSet<String>>,
    applying: Mutex<HashSet<(String, String)>>,
}

impl AgentController {
    pub fn new(
        config: AgentConfig,
        detector: Detector,
        engine: FixEngine,
        host: Arc<dyn RepoHost>,
    ) -> Result<Self, MenderError> {
        let config = SharedAgentConfig::new(config).map_err(MenderError::Config)?;
        Ok(Self {
            config,
            detector,
            engine,
            host,
            activity: ActivityLog::new(),
            monitored: Mutex::new(BTreeSet::new()),
            applying: Mutex::new(HashSet::new()),
        })
    }

    /// Shared configuration handle (single writer: `configure`)
    pub fn shared_config(&self) -> &SharedAgentConfig {
        &self.config
    }

    /// Apply a configuration update; the only writer to `AgentConfig`
    pub fn configure(&self, update: AgentConfigUpdate) -> Result<AgentConfig, MenderError> {
        match self.config.update(update) {
            Ok(config) => {
                self.activity.record(
                    "agent_configured",
                    ActivityStatus::Success,
                    json!({
                        "agent_mode": config.agent_mode.to_string(),
                        "auto_commit": config.auto_commit,
                        "max_files": config.max_files,
                    }),
                );
                Ok(config)
            }
            Err(err) => {
                self.activity.record(
                    "agent_configured",
                    ActivityStatus::Error,
                    json!({ "error": err.to_string() }),
                );
                Err(MenderError::Config(err))
            }
        }
    }

    /// Current status snapshot
    pub fn status(&self) -> AgentStatus {
        let config = self.config.snapshot();
        let monitored = self
            .monitored
            .lock()
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();

        AgentStatus {
            agent_mode: config.agent_mode,
            auto_commit: config.auto_commit,
            max_files: config.max_files,
            monitored_repositories: monitored,
            ai_enabled: self.engine.ai_configured(),
            recent_activity: self.activity.recent(5),
            timestamp: Utc::now(),
        }
    }

    /// Recent activity entries
    pub fn activity(&self, limit: usize) -> Vec<ActivityLogEntry> {
        self.activity.recent(limit)
    }

    /// Handle a repository push event under the current policy
    pub async fn handle_push(&self, event: &PushEvent) -> Result<PushOutcome, MenderError> {
        let config = self.config.snapshot();
        let repo = crate::host::normalize_repository(&event.repository.full_name);
        let branch = event.branch();

        self.track(&repo);

        if let Some(head) = event.head_commit() {
            if head.message.contains(FIX_COMMIT_MARKER) {
                self.activity.record(
                    "push_skipped",
                    ActivityStatus::Success,
                    json!({ "repository": repo, "reason": "agent fix commit" }),
                );
                return Ok(PushOutcome::Skipped {
                    reason: "agent fix commit".to_string(),
                });
            }
        }

        let commit = event
            .head_commit()
            .map(|c| c.id.clone())
            .unwrap_or_else(|| "HEAD".to_string());

        let generate = config.agent_mode != AgentMode::Monitor;
        let analysis = match self
            .run_analysis(&config, &repo, &branch, &commit, generate)
            .await
        {
            Ok(analysis) => analysis,
            Err(err) => {
                self.activity.record(
                    "push_error",
                    ActivityStatus::Error,
                    json!({ "repository": repo, "branch": branch, "error": err.to_string() }),
                );
                return Err(err);
            }
        };

        let action = if analysis.total_issues == 0 {
            PolicyAction::None
        } else {
            match config.agent_mode {
                AgentMode::Monitor => PolicyAction::None,
                AgentMode::Suggest => self.open_suggestions(&repo, &branch, &analysis).await,
                AgentMode::Autofix => {
                    match self.autofix(&config, &repo, &branch, &analysis).await {
                        Ok(report) => PolicyAction::Applied(report),
                        Err(err) => {
                            self.activity.record(
                                "push_error",
                                ActivityStatus::Error,
                                json!({
                                    "repository": repo,
                                    "branch": branch,
                                    "error": err.to_string(),
                                }),
                            );
                            return Err(err);
                        }
                    }
                }
            }
        };

        self.activity.record(
            "push_analyzed",
            ActivityStatus::Success,
            json!({
                "repository": repo,
                "branch": branch,
                "commit": short_sha(&commit),
                "issues_found": analysis.total_issues,
                "risk_level": analysis.risk_level.to_string(),
                "files_skipped": analysis.files_skipped,
            }),
        );

        Ok(PushOutcome::Analyzed(Box::new(AnalysisReport {
            analysis,
            action,
        })))
    }

    /// On-demand analysis of a repository branch.
    ///
    /// Manual analysis always generates fixes so the operator has
    /// something to review, whatever the automation mode.
    pub async fn analyze(&self, repo: &str, branch: &str) -> Result<AnalysisResult, MenderError> {
        let config = self.config.snapshot();
        let repo = crate::host::normalize_repository(repo);

        self.track(&repo);

        match self.checked_analysis(&config, &repo, branch).await {
            Ok(analysis) => {
                self.activity.record(
                    "analysis_completed",
                    ActivityStatus::Success,
                    json!({
                        "repository": repo,
                        "branch": branch,
                        "issues_found": analysis.total_issues,
                        "risk_level": analysis.risk_level.to_string(),
                        "files_skipped": analysis.files_skipped,
                    }),
                );
                Ok(analysis)
            }
            Err(err) => {
                self.activity.record(
                    "analysis_error",
                    ActivityStatus::Error,
                    json!({ "repository": repo, "branch": branch, "error": err.to_string() }),
                );
                Err(err)
            }
        }
    }

    /// Apply a selection of fixes to one file and optionally publish.
    ///
    /// Fixes are regenerated against the file's current content and the
    /// selection is resolved by `(line, explanation)` identity, so a
    /// selection made against an older analysis stays valid until the
    /// underlying lines actually change.
    pub async fn apply_fixes(
        &self,
        repo: &str,
        branch: &str,
        path: &str,
        selection: &FixSelection,
    ) -> Result<RepoApplyReport, MenderError> {
        let config = self.config.snapshot();
        let repo = crate::host::normalize_repository(repo);

        let _guard = match self.begin_apply(&repo, branch) {
            Ok(guard) => guard,
            Err(err) => {
                self.activity.record(
                    "fix_error",
                    ActivityStatus::Error,
                    json!({ "repository": repo, "branch": branch, "error": err.to_string() }),
                );
                return Err(MenderError::Apply(err));
            }
        };

        let current = match self.host.get_file(&repo, branch, path).await {
            Ok(content) => content,
            Err(err) => {
                self.activity.record(
                    "fix_error",
                    ActivityStatus::Error,
                    json!({ "repository": repo, "branch": branch, "path": path, "error": err.to_string() }),
                );
                return Err(MenderError::Host(err));
            }
        };

        let issues = self.detector.detect(&current.text, path);
        let batch = self.engine.generate(&issues, &current.text, path).await;
        let keys = selection.resolve(&batch.fixes);
        let report = FixApplier::new().apply(&current.text, &batch.fixes, &keys);

        let mut contents = Vec::new();
        if report.applied_count() > 0 && report.content != current.text {
            contents.push(CommitFile {
                path: path.to_string(),
                content: report.content.clone(),
            });
        }

        let env_vars = report.env_vars_needed.clone();
        let total_applied = report.applied_count();
        let failed_count = report.failed().len();
        let file_report = FileApplyReport {
            filename: path.to_string(),
            report,
        };

        let (request, publish_error) = self
            .publish(&config, &repo, branch, &mut contents, &env_vars, total_applied)
            .await;

        self.activity.record(
            "fixes_applied",
            ActivityStatus::Success,
            json!({
                "repository": repo,
                "branch": branch,
                "path": path,
                "applied": total_applied,
                "failed": failed_count,
            }),
        );

        Ok(RepoApplyReport {
            files: vec![file_report],
            file_errors: Vec::new(),
            total_applied,
            env_vars_needed: env_vars,
            request,
            publish_error,
            contents,
        })
    }

    // Policy actions

    /// Suggest mode: publish the fix list as a review request
    async fn open_suggestions(
        &self,
        repo: &str,
        branch: &str,
        analysis: &AnalysisResult,
    ) -> PolicyAction {
        let total_fixes: usize = analysis.files.iter().map(|f| f.fixes_count).sum();
        if total_fixes == 0 {
            return PolicyAction::None;
        }

        let summary = ChangeSummary {
            title: format!("{} Code quality suggestions", FIX_COMMIT_MARKER),
            body: suggestion_body(&analysis.files),
        };
        let files = vec![CommitFile {
            path: "MENDER_SUGGESTIONS.md".to_string(),
            content: suggestion_body(&analysis.files),
        }];

        match self
            .host
            .commit_and_open_request(repo, branch, &files, &summary)
            .await
        {
            Ok(request) => PolicyAction::Suggested { request },
            Err(err) => {
                log::warn!("Failed to open suggestion request for {}: {}", repo, err);
                PolicyAction::SuggestFailed {
                    error: err.to_string(),
                }
            }
        }
    }

    /// Autofix mode: apply every High-confidence fix and publish
    async fn autofix(
        &self,
        config: &AgentConfig,
        repo: &str,
        branch: &str,
        analysis: &AnalysisResult,
    ) -> Result<RepoApplyReport, MenderError> {
        let _guard = self
            .begin_apply(repo, branch)
            .map_err(MenderError::Apply)?;

        let applier = FixApplier::new();
        let mut files = Vec::new();
        let mut file_errors = Vec::new();
        let mut contents = Vec::new();
        let mut env_vars = BTreeSet::new();
        let mut total_applied = 0;

        for file_result in &analysis.files {
            let keys = FixSelection::HighConfidence.resolve(&file_result.fixes);
            if keys.is_empty() {
                continue;
            }

            // Applying always re-validates against the current content
            let current = match self.host.get_file(repo, branch, &file_result.filename).await {
                Ok(content) => content,
                Err(err) => {
                    file_errors.push(FileError {
                        filename: file_result.filename.clone(),
                        error: err.to_string(),
                    });
                    continue;
                }
            };

            let report = applier.apply(&current.text, &file_result.fixes, &keys);
            total_applied += report.applied_count();
            env_vars.extend(report.env_vars_needed.iter().cloned());

            if report.applied_count() > 0 && report.content != current.text {
                contents.push(CommitFile {
                    path: file_result.filename.clone(),
                    content: report.content.clone(),
                });
            }

            files.push(FileApplyReport {
                filename: file_result.filename.clone(),
                report,
            });
        }

        let (request, publish_error) = self
            .publish(config, repo, branch, &mut contents, &env_vars, total_applied)
            .await;

        Ok(RepoApplyReport {
            files,
            file_errors,
            total_applied,
            env_vars_needed: env_vars,
            request,
            publish_error,
            contents,
        })
    }

    /// Publish rewritten contents when auto-commit is on.
    ///
    /// A publish failure is reported alongside the retained contents,
    /// never as a hard error.
    async fn publish(
        &self,
        config: &AgentConfig,
        repo: &str,
        branch: &str,
        contents: &mut Vec<CommitFile>,
        env_vars: &BTreeSet<String>,
        total_applied: usize,
    ) -> (Option<ChangeRequest>, Option<String>) {
        if !config.auto_commit || contents.is_empty() {
            return (None, None);
        }

        if !env_vars.is_empty() {
            contents.push(CommitFile {
                path: ".env.example".to_string(),
                content: env_example(env_vars),
            });
        }

        let summary = ChangeSummary {
            title: format!(
                "{} Applied {} security and quality fixes",
                FIX_COMMIT_MARKER, total_applied
            ),
            body: fix_request_body(total_applied, contents, env_vars),
        };

        match self
            .host
            .commit_and_open_request(repo, branch, contents, &summary)
            .await
        {
            Ok(request) => (Some(request), None),
            Err(err) => {
                log::warn!("Failed to publish fixes for {}: {}", repo, err);
                (None, Some(err.to_string()))
            }
        }
    }

    // Analysis plumbing

    /// A branch typo is the commonest operator mistake; fail it with
    /// the actual branch list instead of a bare 404 from the tree
    /// endpoint
    async fn checked_analysis(
        &self,
        config: &AgentConfig,
        repo: &str,
        branch: &str,
    ) -> Result<AnalysisResult, MenderError> {
        let branches = self.host.list_branches(repo).await?;
        if !branches.iter().any(|b| b == branch) {
            return Err(MenderError::Host(HostError::Status {
                status: 404,
                message: format!(
                    "branch '{}' not found in {} (branches: {})",
                    branch,
                    repo,
                    branches.join(", ")
                ),
            }));
        }

        self.run_analysis(config, repo, branch, branch, true).await
    }

    async fn run_analysis(
        &self,
        config: &AgentConfig,
        repo: &str,
        branch: &str,
        commit: &str,
        generate: bool,
    ) -> Result<AnalysisResult, MenderError> {
        // Total inability to list the repository aborts the operation;
        // everything after this degrades per file
        let listed = self.host.list_files(repo, branch).await?;

        let mut eligible: Vec<String> = listed
            .into_iter()
            .map(|f| f.path)
            .filter(|path| is_analyzable(path, config))
            .collect();
        eligible.sort();

        let skipped = eligible.len().saturating_sub(config.max_files);
        eligible.truncate(config.max_files);
        if skipped > 0 {
            log::info!(
                "Analyzing first {} of {} eligible files ({} skipped)",
                eligible.len(),
                eligible.len() + skipped,
                skipped
            );
        }

        let outcomes = future::join_all(
            eligible
                .iter()
                .map(|path| self.analyze_file(repo, branch, path, generate)),
        )
        .await;

        let mut files = Vec::new();
        let mut file_errors = Vec::new();
        let mut analyzed = 0;

        for (path, outcome) in eligible.iter().zip(outcomes) {
            match outcome {
                Ok(Some(file_result)) => {
                    analyzed += 1;
                    files.push(file_result);
                }
                Ok(None) => analyzed += 1,
                Err(err) => file_errors.push(FileError {
                    filename: path.clone(),
                    error: err.to_string(),
                }),
            }
        }

        Ok(AnalysisResult::new(
            repo,
            branch,
            commit,
            files,
            file_errors,
            analyzed,
            skipped,
        ))
    }

    /// Analyze one file; `Ok(None)` means it was clean
    async fn analyze_file(
        &self,
        repo: &str,
        branch: &str,
        path: &str,
        generate: bool,
    ) -> Result<Option<FileResult>, MenderError> {
        let content = self.host.get_file(repo, branch, path).await?;

        let issues = self.detector.detect(&content.text, path);
        if issues.is_empty() {
            return Ok(None);
        }

        let fixes = if generate {
            self.engine.generate(&issues, &content.text, path).await.fixes
        } else {
            Vec::new()
        };

        Ok(Some(FileResult::new(path, issues, fixes)))
    }

    fn begin_apply(&self, repo: &str, branch: &str) -> Result<ApplyGuard<'_>, ApplyError> {
        let key = (repo.to_string(), branch.to_string());
        let mut slots = match self.applying.lock() {
            Ok(slots) => slots,
            Err(poisoned) => poisoned.into_inner(),
        };

        if !slots.insert(key.clone()) {
            return Err(ApplyError::InFlight {
                repository: repo.to_string(),
                branch: branch.to_string(),
            });
        }

        Ok(ApplyGuard {
            applying: &self.applying,
            key,
        })
    }

    fn track(&self, repo: &str) {
        if let Ok(mut monitored) = self.monitored.lock() {
            monitored.insert(repo.to_string());
        }
    }
}

/// Whether a path is eligible for analysis under the given config
pub fn is_analyzable(path: &str, config: &AgentConfig) -> bool {
    if config.excluded_files.iter().any(|ex| path.contains(ex)) {
        return false;
    }
    if config
        .excluded_extensions
        .iter()
        .any(|ext| path.ends_with(ext))
    {
        return false;
    }
    ANALYZABLE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

fn short_sha(sha: &str) -> &str {
    if sha.len() > 7 {
        &sha[..7]
    } else {
        sha
    }
}

/// Markdown body listing every proposed fix, for suggestion requests
fn suggestion_body(files: &[FileResult]) -> String {
    let mut body = String::from(
        "# Mender suggestions\n\nMender analyzed this repository and found issues \
         that could be improved.\n\n",
    );

    for file in files {
        if file.fixes.is_empty() {
            continue;
        }
        body.push_str(&format!("## {}\n\n", file.filename));

        for (i, fix) in file.fixes.iter().enumerate() {
            body.push_str(&format!("### Fix {}: {}\n", i + 1, fix.explanation));
            body.push_str(&format!("- **Line**: {}\n", fix.line));
            body.push_str(&format!("- **Confidence**: {}\n", fix.confidence));
            body.push_str(&format!("- **Current code**: `{}`\n", fix.original_code));
            body.push_str(&format!("- **Suggested fix**: `{}`\n", fix.fixed_code));
            if !fix.env_vars_needed.is_empty() {
                let vars: Vec<_> = fix.env_vars_needed.iter().cloned().collect();
                body.push_str(&format!(
                    "- **Environment variables needed**: {}\n",
                    vars.join(", ")
                ));
            }
            body.push('\n');
        }
    }

    body.push_str("---\nThese suggestions are generated automatically; review before applying.\n");
    body
}

/// Pull-request body for an applied fix batch
fn fix_request_body(
    total_applied: usize,
    contents: &[CommitFile],
    env_vars: &BTreeSet<String>,
) -> String {
    let mut body = format!(
        "# Automatic code quality and security fixes\n\n\
         This request applies **{} fixes** across **{} files**.\n\n",
        total_applied,
        contents
            .iter()
            .filter(|f| f.path != ".env.example")
            .count()
    );

    if !env_vars.is_empty() {
        body.push_str("## Environment variables required\n\n");
        for var in env_vars {
            body.push_str(&format!("- `{}`\n", var));
        }
        body.push_str(
            "\nA `.env.example` file is included; copy it to `.env` and fill in real values.\n\n",
        );
    }

    body.push_str("Review the changes and run your tests before merging.\n");
    body
}
