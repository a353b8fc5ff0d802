//! Core data models for Mender

pub mod activity;
pub mod fix;
pub mod issue;
pub mod results;

pub use activity::{ActivityLogEntry, ActivityStatus};
pub use fix::{Confidence, Fix, FixKey, FixState, FixType};
pub use issue::{Issue, IssueCategory, IssueKind, Severity};
pub use results::{security_score, AnalysisResult, FileError, FileResult, RiskLevel};
