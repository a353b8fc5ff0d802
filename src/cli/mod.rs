//! Command-line interface for Mender

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::AgentMode;

/// Verbosity level for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd)]
pub enum Verbosity {
    /// Quiet mode - only show errors
    Quiet = 0,

    /// Normal mode - show errors and warnings
    Normal = 1,

    /// Verbose mode - show errors, warnings, and info
    Verbose = 2,

    /// Debug mode - show everything including debug info
    Debug = 3,
}

impl Default for Verbosity {
    fn default() -> Self {
        Self::Normal
    }
}

impl From<u8> for Verbosity {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Quiet,
            1 => Self::Normal,
            2 => Self::Verbose,
            _ => Self::Debug,
        }
    }
}

/// Mender - Autonomous code quality and security fixes
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "🩹 Mender - Autonomous code quality and security fixes for hosted repositories",
    long_about = "Mender watches hosted repositories for code-quality and security issues \
(hardcoded secrets, leftover debug statements, risky patterns), proposes rule-based and \
AI-generated fixes, and can apply the selected fixes back as a branch and pull request."
)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-q=quiet, -v=verbose, -vv=very verbose)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (no output unless there are errors)
    #[arg(short, long)]
    pub quiet: bool,

    /// Custom configuration file
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,
}

/// Commands that Mender can execute
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a repository branch for issues and candidate fixes
    #[command(visible_alias = "scan")]
    Analyze(AnalyzeArgs),

    /// Apply selected fixes to a file and optionally publish them
    Apply(ApplyArgs),

    /// Replay a push event from a JSON payload file
    Push(PushArgs),

    /// Show the agent status snapshot
    Status(StatusArgs),

    /// Show recent agent activity
    Activity(ActivityArgs),

    /// Update the agent configuration
    #[command(visible_alias = "config")]
    Configure(ConfigureArgs),
}

/// Arguments for the analyze command
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Repository, as `owner/name` or a full host URL
    pub repo: String,

    /// Branch to analyze
    #[arg(short, long, default_value = "main")]
    pub branch: String,

    /// Output format (pretty, json)
    #[arg(long, default_value = "pretty")]
    pub format: String,
}

/// Arguments for the apply command
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Repository, as `owner/name` or a full host URL
    pub repo: String,

    /// Branch to apply fixes on
    #[arg(short, long, default_value = "main")]
    pub branch: String,

    /// File path within the repository
    #[arg(short, long)]
    pub path: String,

    /// Select every fix targeting this line (repeatable)
    #[arg(long = "line")]
    pub lines: Vec<usize>,

    /// Select every high-confidence fix
    #[arg(long)]
    pub high_confidence: bool,

    /// Output format (pretty, json)
    #[arg(long, default_value = "pretty")]
    pub format: String,
}

/// Arguments for the push command
#[derive(Args, Debug)]
pub struct PushArgs {
    /// Path to a JSON push-event payload
    pub payload: PathBuf,

    /// Output format (pretty, json)
    #[arg(long, default_value = "pretty")]
    pub format: String,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output format (pretty, json)
    #[arg(long, default_value = "pretty")]
    pub format: String,
}

/// Arguments for the activity command
#[derive(Args, Debug)]
pub struct ActivityArgs {
    /// Number of entries to show
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: usize,

    /// Output format (pretty, json)
    #[arg(long, default_value = "pretty")]
    pub format: String,
}

/// Arguments for the configure command
#[derive(Args, Debug)]
pub struct ConfigureArgs {
    /// Agent mode (monitor, suggest, autofix)
    #[arg(long)]
    pub mode: Option<AgentMode>,

    /// Publish applied fixes automatically
    #[arg(long)]
    pub auto_commit: Option<bool>,

    /// Maximum files analyzed per run (1-50)
    #[arg(long)]
    pub max_files: Option<usize>,

    /// Path substrings to exclude (repeatable)
    #[arg(long = "exclude-file")]
    pub exclude_files: Vec<String>,

    /// File extensions to exclude (repeatable)
    #[arg(long = "exclude-extension")]
    pub exclude_extensions: Vec<String>,
}
