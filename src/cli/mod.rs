//! cli
//!
//! Command-line interface layer.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and flags
//! - Open the repository and resolve the activity feed
//! - Bridge the synchronous entry point into the async scan
//! - Render reports as text or JSON
//!
//! # Exit codes
//!
//! A completed scan exits 0 regardless of what it found: dangling objects,
//! a clean store, and partial correlation are all successful outcomes.
//! Only failures to scan at all (not a repository, I/O errors) exit
//! non-zero.

pub mod args;

pub use args::{Cli, ForgeKind};

use std::fs;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::time::Duration;

use crate::decode::Utf8Decoder;
use crate::forge::github::GitHubActivity;
use crate::forge::gitlab::GitLabActivity;
use crate::forge::ActivityFeed;
use crate::git::Git;
use crate::scan::{self, CancelFlag, CorrelatorConfig, ScanOptions};
use crate::ui::output::{self, Verbosity};

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    // JSON on stdout must stay parseable, so status lines are suppressed
    // unless the reports go to a file.
    let quiet = cli.quiet || (cli.json && cli.output.is_none());
    let verbosity = Verbosity::from_flags(quiet, cli.debug);

    let git = Git::open(&cli.path)
        .with_context(|| format!("cannot scan {}", cli.path.display()))?;
    let feed = resolve_feed(&cli, &git, verbosity)?;

    let options = ScanOptions {
        correlator: CorrelatorConfig {
            max_retries: cli.max_retries,
            base_delay: Duration::from_millis(cli.base_delay_ms),
            retention_days: cli.retention_days,
        },
        workers: cli.workers,
        verbosity,
    };

    let cancel = CancelFlag::new();
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let reports = runtime.block_on(async {
        let handler = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                output::warn("interrupted, finishing with partial results", verbosity);
                handler.cancel();
            }
        });
        scan::run(git, feed, &Utf8Decoder, options, cancel).await
    })?;

    let rendered = if cli.json {
        serde_json::to_string_pretty(&reports).context("failed to serialize reports")?
    } else {
        output::render_reports(&reports)
    };

    // Reports are the product; they bypass the quiet flag.
    match &cli.output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("cannot write {}", path.display()))?,
        None => {
            if !rendered.is_empty() {
                println!("{rendered}");
            }
        }
    }

    Ok(())
}

/// Resolve the activity feed from flags and the repository's remotes.
///
/// Returns `None` when correlation is disabled or no forge remote can be
/// determined; the scan then runs purely locally. Without `--server` the
/// forge is detected from the origin URL (gitlab.com or github.com); a
/// self-hosted GitLab instance needs `--server gitlab` to disambiguate.
fn resolve_feed(
    cli: &Cli,
    git: &Git,
    verbosity: Verbosity,
) -> Result<Option<Arc<dyn ActivityFeed>>> {
    if cli.no_remote {
        return Ok(None);
    }

    if let Some(spec) = &cli.remote {
        let (owner, repo) = match spec.split_once('/') {
            Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() => (owner, repo),
            _ => bail!("--remote must be OWNER/REPO, got {spec:?}"),
        };
        return match cli.server {
            Some(ForgeKind::Gitlab) => Ok(Some(Arc::new(GitLabActivity::new(
                spec.clone(),
                gitlab_token(cli),
            )))),
            _ => Ok(Some(Arc::new(GitHubActivity::new(
                owner,
                repo,
                cli.token.clone(),
            )))),
        };
    }

    let url = match git.remote_url("origin")? {
        Some(url) => url,
        None => {
            output::debug("no origin remote, skipping correlation", verbosity);
            return Ok(None);
        }
    };

    let feed: Option<Arc<dyn ActivityFeed>> = match cli.server {
        Some(ForgeKind::Github) => GitHubActivity::from_remote_url(&url, cli.token.clone())
            .map(|feed| Arc::new(feed) as Arc<dyn ActivityFeed>),
        Some(ForgeKind::Gitlab) => GitLabActivity::from_remote_url(&url, gitlab_token(cli))
            .map(|feed| Arc::new(feed) as Arc<dyn ActivityFeed>),
        None => detect_forge(&url, cli),
    };

    if feed.is_none() {
        output::debug(
            format!("cannot resolve a forge from origin ({url}), skipping correlation"),
            verbosity,
        );
    }
    Ok(feed)
}

/// Detect the forge from the origin URL host. Only the public hosts are
/// recognized here; anything else needs an explicit `--server`.
fn detect_forge(url: &str, cli: &Cli) -> Option<Arc<dyn ActivityFeed>> {
    if let Some(feed) = GitHubActivity::from_remote_url(url, cli.token.clone()) {
        return Some(Arc::new(feed));
    }
    if let Some((host, _)) = crate::forge::gitlab::parse_gitlab_url(url) {
        if host == "gitlab.com" {
            return GitLabActivity::from_remote_url(url, gitlab_token(cli))
                .map(|feed| Arc::new(feed) as Arc<dyn ActivityFeed>);
        }
    }
    None
}

/// The token for GitLab requests: the flag wins, then the conventional
/// environment variable.
fn gitlab_token(cli: &Cli) -> Option<String> {
    cli.token
        .clone()
        .or_else(|| std::env::var("GITLAB_TOKEN").ok())
}
