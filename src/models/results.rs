use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use super::fix::Fix;
use super::issue::Issue;

/// One file's analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileResult {
    /// Path of the analyzed file within the repository
    pub filename: String,

    /// Issues found, in ascending line order
    pub issues: Vec<Issue>,

    /// Candidate fixes for those issues
    pub fixes: Vec<Fix>,

    /// Number of issues found
    pub issues_count: usize,

    /// Number of candidate fixes
    pub fixes_count: usize,
}

impl FileResult {
    pub fn new(filename: impl Into<String>, issues: Vec<Issue>, fixes: Vec<Fix>) -> Self {
        Self {
            filename: filename.into(),
            issues_count: issues.len(),
            fixes_count: fixes.len(),
            issues,
            fixes,
        }
    }
}

/// A file that could not be analyzed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileError {
    /// Path of the file that failed
    pub filename: String,

    /// Why it failed
    pub error: String,
}

/// Risk bucket derived from the security score
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Bucket a clamped security score.
    ///
    /// Thresholds are monotonic and total: every score maps to exactly
    /// one bucket.
    pub fn from_score(score: u8) -> Self {
        if score >= 95 {
            RiskLevel::Low
        } else if score >= 80 {
            RiskLevel::Medium
        } else if score >= 60 {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }
}

/// Security score for a batch of issues: 100 minus the summed severity
/// weights, clamped to 0..=100.
pub fn security_score<'a>(issues: impl IntoIterator<Item = &'a Issue>) -> u8 {
    let penalty: u32 = issues.into_iter().map(|i| i.severity.weight()).sum();
    100u32.saturating_sub(penalty) as u8
}

/// One repository analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Repository in `owner/name` form
    pub repository: String,

    /// Branch that was analyzed
    pub branch: String,

    /// Commit (or branch ref) the contents were read at
    pub commit: String,

    /// When the analysis ran
    pub timestamp: DateTime<Utc>,

    /// Per-file results, for files with at least one issue
    pub files: Vec<FileResult>,

    /// Files that could not be analyzed
    pub file_errors: Vec<FileError>,

    /// Number of files whose content was analyzed
    pub files_analyzed: usize,

    /// Eligible files not analyzed because of the `max_files` limit
    pub files_skipped: usize,

    /// Total issues across all files
    pub total_issues: usize,

    /// Aggregate security score (0-100, lower is worse)
    pub security_score: u8,

    /// Risk bucket for the score
    pub risk_level: RiskLevel,
}

impl AnalysisResult {
    pub fn new(
        repository: impl Into<String>,
        branch: impl Into<String>,
        commit: impl Into<String>,
        files: Vec<FileResult>,
        file_errors: Vec<FileError>,
        files_analyzed: usize,
        files_skipped: usize,
    ) -> Self {
        let total_issues = files.iter().map(|f| f.issues_count).sum();
        let score = security_score(files.iter().flat_map(|f| f.issues.iter()));

        Self {
            repository: repository.into(),
            branch: branch.into(),
            commit: commit.into(),
            timestamp: Utc::now(),
            files,
            file_errors,
            files_analyzed,
            files_skipped,
            total_issues,
            security_score: score,
            risk_level: RiskLevel::from_score(score),
        }
    }
}
