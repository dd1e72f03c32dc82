//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Flags
//!
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--debug`: Enable debug output
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Which forge hosts the remote repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ForgeKind {
    /// GitHub (github.com)
    Github,
    /// GitLab (gitlab.com or self-hosted)
    Gitlab,
}

/// Dredge - recover dangling Git objects and trace them to remote events
#[derive(Parser, Debug)]
#[command(name = "dredge")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
EXAMPLES:
    # Scan the current repository, correlating against the origin remote
    dredge

    # Scan another repository without touching the network
    dredge /path/to/repo --no-remote

    # Correlate against an explicit repository with a token
    dredge --remote octocat/hello-world --token ghp_xxxx

    # Correlate against a GitLab project
    dredge --server gitlab --remote group/sub/project

    # Machine-readable output into a file
    dredge --json --output findings.json")]
pub struct Cli {
    /// Repository to scan (worktree root, .git directory, or bare repo)
    #[arg(value_name = "PATH", default_value = ".")]
    pub path: PathBuf,

    /// Repository to correlate against, as OWNER/REPO (GitLab paths may
    /// include subgroups). Defaults to the origin remote when it points at
    /// a known forge.
    #[arg(long, value_name = "OWNER/REPO", conflicts_with = "no_remote")]
    pub remote: Option<String>,

    /// Forge hosting the remote. Defaults to detection from the origin
    /// URL; self-hosted GitLab instances need this set explicitly.
    #[arg(long, value_enum, conflicts_with = "no_remote")]
    pub server: Option<ForgeKind>,

    /// Forge token for the activity feed (private repos need one).
    /// Falls back to GITLAB_TOKEN when correlating against GitLab.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Skip remote correlation entirely
    #[arg(long)]
    pub no_remote: bool,

    /// Emit reports as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Write reports to a file instead of stdout
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Ignore remote events older than this many days
    #[arg(long, value_name = "DAYS", default_value_t = 90)]
    pub retention_days: i64,

    /// Attempts per feed page before giving up on remaining pages
    #[arg(long, value_name = "N", default_value_t = 3)]
    pub max_retries: u32,

    /// Backoff before the first feed retry, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 500)]
    pub base_delay_ms: u64,

    /// Worker threads for lineage reconstruction (0 = one per core)
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub workers: usize,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Minimal output; reports only
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}
