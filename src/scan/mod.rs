//! scan
//!
//! The scan pipeline: classification, lineage reconstruction, and remote
//! correlation.
//!
//! # Pipeline
//!
//! 1. Enumerate every object id and snapshot the root set, once
//! 2. [`classify`](classify::classify) partitions the store into reachable
//!    and dangling sets
//! 3. Reconstruction and correlation run concurrently: lineages are
//!    rebuilt over a worker pool while the remote feed is paged down
//! 4. Results are joined into per-head reports by the aggregator
//!
//! # Cancellation
//!
//! A [`CancelFlag`] is threaded through the long-running stages. On
//! cancellation each stage stops at its next checkpoint and whatever was
//! gathered so far still flows into the reports. In-memory state only; no
//! cleanup is needed.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::report::{aggregate, Report};
use crate::decode::ContentDecoder;
use crate::forge::ActivityFeed;
use crate::git::{Git, GitError};
use crate::ui::output::{self, Verbosity};

pub mod classify;
pub mod correlate;
pub mod lineage;

pub use classify::{classify, Classification};
pub use correlate::{
    correlate, Confidence, CorrelationMatch, CorrelationOutcome, CorrelatorConfig,
};
pub use lineage::{
    dangling_heads, reconstruct, reconstruct_all, BlobRecord, CommitNode, Lineage, ParentLink,
    Reconstruction,
};

/// Shared cancellation flag, set from a signal handler and polled by the
/// scan stages. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    /// A fresh, unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Scan tuning, assembled by the CLI.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Correlator retry/backoff/retention settings.
    pub correlator: CorrelatorConfig,
    /// Worker threads for lineage reconstruction. `0` means one per
    /// available core.
    pub workers: usize,
    /// Output verbosity.
    pub verbosity: Verbosity,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            correlator: CorrelatorConfig::default(),
            workers: 0,
            verbosity: Verbosity::Normal,
        }
    }
}

/// Run the full scan pipeline against an opened repository.
///
/// `feed` is `None` when remote correlation is disabled or no forge remote
/// could be resolved; the scan then runs purely locally. Returns one report
/// per dangling head commit, newest first. An empty vec means the store is
/// clean, which is a successful outcome.
///
/// # Errors
///
/// Only repository-level failures propagate. Unreadable objects, feed
/// failures, and cancellation all degrade into partial reports instead.
pub async fn run(
    git: Git,
    feed: Option<Arc<dyn ActivityFeed>>,
    decoder: &dyn ContentDecoder,
    options: ScanOptions,
    cancel: CancelFlag,
) -> Result<Vec<Report>, GitError> {
    let verbosity = options.verbosity;

    // Snapshot both inputs up front; later ref mutation cannot skew the
    // partition.
    let all_ids = git.list_all_object_ids()?;
    let roots = git.list_roots()?;
    output::debug(
        format!("{} objects in store, {} roots", all_ids.len(), roots.len()),
        verbosity,
    );

    let classification = classify(&git, &all_ids, &roots)?;
    if classification.is_clean() {
        output::print("no dangling objects found", verbosity);
        return Ok(Vec::new());
    }
    output::print(
        format!(
            "{} dangling objects ({} commits)",
            classification.dangling.len(),
            classification.dangling_commits.len()
        ),
        verbosity,
    );

    let dangling_ids: HashSet<_> = classification.dangling_commits.iter().cloned().collect();
    let reachable = classification.reachable;
    let dangling_commits = classification.dangling_commits;
    let workers = resolve_workers(options.workers);

    let reconstruction = {
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            let heads = dangling_heads(&git, &dangling_commits)?;
            let reconstructed =
                reconstruct_all(git.git_dir(), &heads, &reachable, workers, &cancel)?;
            Ok::<_, GitError>((heads, reconstructed))
        })
    };

    let correlation = async {
        match &feed {
            Some(feed) => Some(
                correlate(
                    feed.as_ref(),
                    &dangling_ids,
                    &options.correlator,
                    &cancel,
                    verbosity,
                )
                .await,
            ),
            None => None,
        }
    };

    let (outcome, reconstructed) = tokio::join!(correlation, reconstruction);
    let (heads, reconstructed) = reconstructed.map_err(|e| GitError::Internal {
        message: format!("reconstruction task failed: {e}"),
    })??;
    let outcome = outcome.unwrap_or_default();

    for (head, err) in &reconstructed.failures {
        output::warn(
            format!("could not reconstruct lineage of {}: {err}", head.short(12)),
            verbosity,
        );
    }
    output::print(
        format!(
            "reconstructed {} of {} lineages, {} correlated",
            reconstructed.lineages.len(),
            heads.len(),
            outcome.matches.len()
        ),
        verbosity,
    );
    if let Some(note) = &outcome.remote_unavailable {
        output::warn(note, verbosity);
    }

    Ok(aggregate(&heads, reconstructed.lineages, outcome, decoder))
}

/// Resolve the worker count, treating `0` as one per available core.
fn resolve_workers(requested: usize) -> usize {
    if requested > 0 {
        requested
    } else {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}
