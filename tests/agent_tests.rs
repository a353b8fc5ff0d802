use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use mender::agent::{
    AgentController, PolicyAction, PushCommit, PushEvent, PushOutcome, Pusher, RepositoryRef,
    FIX_COMMIT_MARKER,
};
use mender::apply::FixSelection;
use mender::config::{AgentConfig, AgentConfigUpdate, AgentMode};
use mender::detect::Detector;
use mender::errors::{ApplyError, ConfigError, HostError, MenderError};
use mender::fixes::FixEngine;
use mender::host::{ChangeRequest, ChangeSummary, CommitFile, FileContent, RemoteFile, RepoHost};

// Hand-rolled repository host mocks
mod test_mocks {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    /// Record of one published change request
    pub struct RecordedCommit {
        pub files: Vec<CommitFile>,
        pub title: String,
        pub body: String,
    }

    /// In-memory repository host
    pub struct MockHost {
        pub files: BTreeMap<String, String>,
        pub fetched: Mutex<Vec<String>>,
        pub commits: Mutex<Vec<RecordedCommit>>,
        pub fail_publish: bool,
    }

    impl MockHost {
        pub fn new(files: &[(&str, &str)]) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|(path, content)| (path.to_string(), content.to_string()))
                    .collect(),
                fetched: Mutex::new(Vec::new()),
                commits: Mutex::new(Vec::new()),
                fail_publish: false,
            }
        }

        pub fn failing_publish(files: &[(&str, &str)]) -> Self {
            let mut host = Self::new(files);
            host.fail_publish = true;
            host
        }

        pub fn fetched_paths(&self) -> Vec<String> {
            self.fetched.lock().unwrap().clone()
        }

        pub fn recorded_commits(&self) -> usize {
            self.commits.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RepoHost for MockHost {
        async fn list_branches(&self, _repo: &str) -> Result<Vec<String>, HostError> {
            Ok(vec!["main".to_string()])
        }

        async fn list_files(
            &self,
            _repo: &str,
            _branch: &str,
        ) -> Result<Vec<RemoteFile>, HostError> {
            Ok(self
                .files
                .keys()
                .map(|path| RemoteFile {
                    path: path.clone(),
                    blob_id: format!("blob-{}", path),
                })
                .collect())
        }

        async fn get_file(
            &self,
            _repo: &str,
            _branch: &str,
            path: &str,
        ) -> Result<FileContent, HostError> {
            self.fetched.lock().unwrap().push(path.to_string());

            match self.files.get(path) {
                Some(text) => Ok(FileContent {
                    text: text.clone(),
                    content_hash: format!("hash-{}", path),
                }),
                None => Err(HostError::Status {
                    status: 404,
                    message: format!("no such file: {}", path),
                }),
            }
        }

        async fn commit_and_open_request(
            &self,
            _repo: &str,
            _base_branch: &str,
            files: &[CommitFile],
            summary: &ChangeSummary,
        ) -> Result<ChangeRequest, HostError> {
            if self.fail_publish {
                return Err(HostError::Publish {
                    stage: "create commit".to_string(),
                    message: "host rejected the commit".to_string(),
                });
            }

            self.commits.lock().unwrap().push(RecordedCommit {
                files: files.to_vec(),
                title: summary.title.clone(),
                body: summary.body.clone(),
            });

            Ok(ChangeRequest {
                url: "https://example.com/pr/1".to_string(),
                number: 1,
            })
        }
    }

    /// Host that blocks `get_file` until released, to hold an apply
    /// slot open across a second request
    pub struct GatedHost {
        pub inner: MockHost,
        pub started: Arc<Notify>,
        pub release: Arc<Notify>,
    }

    #[async_trait]
    impl RepoHost for GatedHost {
        async fn list_branches(&self, repo: &str) -> Result<Vec<String>, HostError> {
            self.inner.list_branches(repo).await
        }

        async fn list_files(
            &self,
            repo: &str,
            branch: &str,
        ) -> Result<Vec<RemoteFile>, HostError> {
            self.inner.list_files(repo, branch).await
        }

        async fn get_file(
            &self,
            repo: &str,
            branch: &str,
            path: &str,
        ) -> Result<FileContent, HostError> {
            self.started.notify_one();
            self.release.notified().await;
            self.inner.get_file(repo, branch, path).await
        }

        async fn commit_and_open_request(
            &self,
            repo: &str,
            base_branch: &str,
            files: &[CommitFile],
            summary: &ChangeSummary,
        ) -> Result<ChangeRequest, HostError> {
            self.inner
                .commit_and_open_request(repo, base_branch, files, summary)
                .await
        }
    }
}

use test_mocks::{GatedHost, MockHost};

const SECRET_PY: &str = "import os\n\napi_key = \"sk_live_123\"\n";
const CLEAN_PY: &str = "x = 1\n";

fn controller(config: AgentConfig, host: Arc<dyn RepoHost>) -> AgentController {
    AgentController::new(config, Detector::new(), FixEngine::rule_based(), host)
        .expect("valid test config")
}

fn push_event(repo: &str, message: &str) -> PushEvent {
    PushEvent {
        repository: RepositoryRef {
            full_name: repo.to_string(),
        },
        git_ref: "refs/heads/main".to_string(),
        pusher: Pusher::default(),
        commits: vec![PushCommit {
            id: "0123456789abcdef".to_string(),
            message: message.to_string(),
        }],
    }
}

#[tokio::test]
async fn test_max_files_limit_is_enforced_and_reported() {
    let mut config = AgentConfig::default();
    config.max_files = 2;

    let host = Arc::new(MockHost::new(&[
        ("a.py", CLEAN_PY),
        ("b.py", CLEAN_PY),
        ("c.py", CLEAN_PY),
        ("d.py", CLEAN_PY),
        ("e.py", CLEAN_PY),
    ]));
    let agent = controller(config, host.clone());

    let result = agent.analyze("owner/repo", "main").await.unwrap();

    assert_eq!(result.files_analyzed, 2);
    assert_eq!(result.files_skipped, 3);
    // First two in path-sorted order, nothing else fetched
    assert_eq!(host.fetched_paths(), vec!["a.py", "b.py"]);
}

#[tokio::test]
async fn test_excluded_files_and_extensions_are_filtered() {
    let host = Arc::new(MockHost::new(&[
        ("src/app.py", SECRET_PY),
        ("node_modules/dep.js", SECRET_PY),
        ("logo.png", "binary"),
        ("notes.txt", "text"),
    ]));
    let agent = controller(AgentConfig::default(), host.clone());

    let result = agent.analyze("owner/repo", "main").await.unwrap();

    assert_eq!(result.files_analyzed, 1);
    assert_eq!(host.fetched_paths(), vec!["src/app.py"]);
}

#[tokio::test]
async fn test_missing_file_is_reported_per_file() {
    struct MissingOne(MockHost);

    #[async_trait::async_trait]
    impl RepoHost for MissingOne {
        async fn list_branches(&self, repo: &str) -> Result<Vec<String>, HostError> {
            self.0.list_branches(repo).await
        }
        async fn list_files(
            &self,
            repo: &str,
            branch: &str,
        ) -> Result<Vec<RemoteFile>, HostError> {
            let mut files = self.0.list_files(repo, branch).await?;
            files.push(RemoteFile {
                path: "ghost.py".to_string(),
                blob_id: "blob-ghost".to_string(),
            });
            Ok(files)
        }
        async fn get_file(
            &self,
            repo: &str,
            branch: &str,
            path: &str,
        ) -> Result<FileContent, HostError> {
            self.0.get_file(repo, branch, path).await
        }
        async fn commit_and_open_request(
            &self,
            repo: &str,
            base_branch: &str,
            files: &[CommitFile],
            summary: &ChangeSummary,
        ) -> Result<ChangeRequest, HostError> {
            self.0
                .commit_and_open_request(repo, base_branch, files, summary)
                .await
        }
    }

    let host = Arc::new(MissingOne(MockHost::new(&[("a.py", SECRET_PY)])));
    let agent = controller(AgentConfig::default(), host);

    let result = agent.analyze("owner/repo", "main").await.unwrap();

    assert_eq!(result.files_analyzed, 1);
    assert_eq!(result.file_errors.len(), 1);
    assert_eq!(result.file_errors[0].filename, "ghost.py");
    assert!(result.file_errors[0].error.contains("404"));
}

#[tokio::test]
async fn test_analyzing_an_unknown_branch_fails_with_the_branch_list() {
    let host = Arc::new(MockHost::new(&[("app.py", SECRET_PY)]));
    let agent = controller(AgentConfig::default(), host.clone());

    let result = agent.analyze("owner/repo", "does-not-exist").await;

    match result {
        Err(MenderError::Host(HostError::Status { status, message })) => {
            assert_eq!(status, 404);
            assert!(message.contains("does-not-exist"));
            assert!(message.contains("main"));
        }
        other => panic!("expected branch lookup failure, got {:?}", other.map(|_| ())),
    }

    // Nothing was fetched, and the failure left a terminal entry
    assert!(host.fetched_paths().is_empty());
    let entries = agent.activity(10);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "analysis_error");
}

#[tokio::test]
async fn test_monitor_mode_detects_but_never_generates_fixes() {
    let mut config = AgentConfig::default();
    config.agent_mode = AgentMode::Monitor;

    let host = Arc::new(MockHost::new(&[("app.py", SECRET_PY)]));
    let agent = controller(config, host.clone());

    let outcome = agent
        .handle_push(&push_event("owner/repo", "add feature"))
        .await
        .unwrap();

    match outcome {
        PushOutcome::Analyzed(report) => {
            assert_eq!(report.analysis.total_issues, 1);
            assert!(report.analysis.files[0].fixes.is_empty());
            assert!(matches!(report.action, PolicyAction::None));
        }
        other => panic!("expected analysis, got {:?}", other),
    }
    assert_eq!(host.recorded_commits(), 0);
}

#[tokio::test]
async fn test_suggest_mode_opens_a_review_request() {
    let mut config = AgentConfig::default();
    config.agent_mode = AgentMode::Suggest;

    let host = Arc::new(MockHost::new(&[("app.py", SECRET_PY)]));
    let agent = controller(config, host.clone());

    let outcome = agent
        .handle_push(&push_event("owner/repo", "add feature"))
        .await
        .unwrap();

    match outcome {
        PushOutcome::Analyzed(report) => match report.action {
            PolicyAction::Suggested { request } => assert_eq!(request.number, 1),
            other => panic!("expected suggestion request, got {:?}", other),
        },
        other => panic!("expected analysis, got {:?}", other),
    }

    let commits = host.commits.lock().unwrap();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].files[0].path, "MENDER_SUGGESTIONS.md");
    assert!(commits[0].body.contains("app.py"));
}

#[tokio::test]
async fn test_autofix_mode_applies_and_publishes_high_confidence_fixes() {
    let mut config = AgentConfig::default();
    config.agent_mode = AgentMode::Autofix;
    config.auto_commit = true;

    let host = Arc::new(MockHost::new(&[("app.py", SECRET_PY)]));
    let agent = controller(config, host.clone());

    let outcome = agent
        .handle_push(&push_event("owner/repo", "add feature"))
        .await
        .unwrap();

    let report = match outcome {
        PushOutcome::Analyzed(report) => match report.action {
            PolicyAction::Applied(apply) => apply,
            other => panic!("expected applied fixes, got {:?}", other),
        },
        other => panic!("expected analysis, got {:?}", other),
    };

    assert_eq!(report.total_applied, 1);
    assert!(report.request.is_some());
    assert!(report.env_vars_needed.contains("API_KEY"));

    let commits = host.commits.lock().unwrap();
    assert_eq!(commits.len(), 1);
    assert!(commits[0].title.contains(FIX_COMMIT_MARKER));

    let rewritten = commits[0]
        .files
        .iter()
        .find(|f| f.path == "app.py")
        .expect("rewritten file committed");
    assert!(rewritten.content.contains("api_key = os.environ[\"API_KEY\"]"));

    let env_file = commits[0]
        .files
        .iter()
        .find(|f| f.path == ".env.example")
        .expect("env template committed");
    assert!(env_file.content.contains("API_KEY=your_api_key_here"));
}

#[tokio::test]
async fn test_publish_failure_keeps_rewritten_content() {
    let mut config = AgentConfig::default();
    config.agent_mode = AgentMode::Autofix;
    config.auto_commit = true;

    let host = Arc::new(MockHost::failing_publish(&[("app.py", SECRET_PY)]));
    let agent = controller(config, host);

    let outcome = agent
        .handle_push(&push_event("owner/repo", "add feature"))
        .await
        .unwrap();

    let report = match outcome {
        PushOutcome::Analyzed(report) => match report.action {
            PolicyAction::Applied(apply) => apply,
            other => panic!("expected applied fixes, got {:?}", other),
        },
        other => panic!("expected analysis, got {:?}", other),
    };

    assert_eq!(report.total_applied, 1);
    assert!(report.request.is_none());
    assert!(report.publish_error.is_some());
    // The rewritten content survives the failed publish
    let rewritten = report
        .contents
        .iter()
        .find(|f| f.path == "app.py")
        .expect("content retained");
    assert!(rewritten.content.contains("os.environ"));
}

#[tokio::test]
async fn test_own_fix_commits_are_skipped() {
    let host = Arc::new(MockHost::new(&[("app.py", SECRET_PY)]));
    let agent = controller(AgentConfig::default(), host.clone());

    let message = format!("{} Applied 3 security and quality fixes", FIX_COMMIT_MARKER);
    let outcome = agent
        .handle_push(&push_event("owner/repo", &message))
        .await
        .unwrap();

    assert!(matches!(outcome, PushOutcome::Skipped { .. }));
    assert!(host.fetched_paths().is_empty());
}

#[tokio::test]
async fn test_each_operation_logs_exactly_one_terminal_entry() {
    let host = Arc::new(MockHost::new(&[("app.py", SECRET_PY)]));
    let agent = controller(AgentConfig::default(), host);

    agent.analyze("owner/repo", "main").await.unwrap();
    assert_eq!(agent.activity(10).len(), 1);
    assert_eq!(agent.activity(10)[0].action, "analysis_completed");

    agent
        .handle_push(&push_event("owner/repo", "change"))
        .await
        .unwrap();
    let entries = agent.activity(10);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].action, "push_analyzed");
}

#[tokio::test]
async fn test_apply_fixes_rewrites_one_file() {
    let host = Arc::new(MockHost::new(&[("app.py", SECRET_PY)]));
    let agent = controller(AgentConfig::default(), host);

    let report = agent
        .apply_fixes("owner/repo", "main", "app.py", &FixSelection::HighConfidence)
        .await
        .unwrap();

    assert_eq!(report.total_applied, 1);
    assert!(report.contents[0].content.contains("os.environ"));
    // auto_commit is off by default: nothing published
    assert!(report.request.is_none());
    assert!(report.publish_error.is_none());
}

#[tokio::test]
async fn test_second_apply_on_same_branch_is_rejected_while_in_flight() {
    let started = Arc::new(tokio::sync::Notify::new());
    let release = Arc::new(tokio::sync::Notify::new());

    let host = Arc::new(GatedHost {
        inner: MockHost::new(&[("app.py", SECRET_PY)]),
        started: started.clone(),
        release: release.clone(),
    });
    let agent = Arc::new(controller(AgentConfig::default(), host));

    let first = {
        let agent = agent.clone();
        tokio::spawn(async move {
            agent
                .apply_fixes("owner/repo", "main", "app.py", &FixSelection::HighConfidence)
                .await
        })
    };

    // Wait until the first apply holds the slot and sits in get_file
    started.notified().await;

    let second = agent
        .apply_fixes("owner/repo", "main", "app.py", &FixSelection::HighConfidence)
        .await;
    match second {
        Err(MenderError::Apply(ApplyError::InFlight { repository, branch })) => {
            assert_eq!(repository, "owner/repo");
            assert_eq!(branch, "main");
        }
        other => panic!("expected in-flight rejection, got {:?}", other.map(|_| ())),
    }

    release.notify_one();
    let result = first.await.unwrap().unwrap();
    assert_eq!(result.total_applied, 1);
}

#[tokio::test]
async fn test_configure_rejects_invalid_max_files() {
    let host = Arc::new(MockHost::new(&[]));
    let agent = controller(AgentConfig::default(), host);

    let update = AgentConfigUpdate {
        max_files: Some(0),
        ..Default::default()
    };

    match agent.configure(update) {
        Err(MenderError::Config(ConfigError::Invalid(message))) => {
            assert!(message.contains("max_files"));
        }
        other => panic!("expected invalid config error, got {:?}", other.map(|_| ())),
    }

    // The running configuration is untouched
    assert_eq!(agent.shared_config().snapshot().max_files, 10);
}

#[tokio::test]
async fn test_configure_updates_are_visible_to_later_snapshots() {
    let host = Arc::new(MockHost::new(&[]));
    let agent = controller(AgentConfig::default(), host);

    let before = agent.shared_config().snapshot();

    let update = AgentConfigUpdate {
        agent_mode: Some(AgentMode::Autofix),
        max_files: Some(5),
        ..Default::default()
    };
    agent.configure(update).unwrap();

    // The earlier snapshot is an unchanged copy
    assert_eq!(before.agent_mode, AgentMode::Monitor);
    assert_eq!(before.max_files, 10);

    let after = agent.shared_config().snapshot();
    assert_eq!(after.agent_mode, AgentMode::Autofix);
    assert_eq!(after.max_files, 5);
}

#[tokio::test]
async fn test_status_reflects_configuration_and_monitored_repos() {
    let host = Arc::new(MockHost::new(&[("app.py", CLEAN_PY)]));
    let agent = controller(AgentConfig::default(), host);

    agent
        .analyze("https://github.com/owner/repo", "main")
        .await
        .unwrap();

    let status = agent.status();
    assert_eq!(status.agent_mode, AgentMode::Monitor);
    assert!(!status.ai_enabled);
    // URL form was normalized before tracking
    assert_eq!(status.monitored_repositories, vec!["owner/repo"]);
    assert_eq!(status.recent_activity.len(), 1);
}
