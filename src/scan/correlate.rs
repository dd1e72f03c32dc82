//! scan::correlate
//!
//! Correlation of dangling commit ids against a remote activity feed.
//!
//! # Protocol
//!
//! Pages are walked newest-first, sequentially (the feed has an inherent
//! order dependency). Pagination stops when all requested ids have been
//! matched, the feed reports no further pages, an event falls outside the
//! platform's retention window, or cancellation is requested.
//!
//! # Failure handling
//!
//! Each page fetch is retried with bounded exponential backoff. When the
//! retry budget is exhausted (or a non-retryable failure such as an auth
//! error occurs), the correlator keeps every match gathered so far and
//! records a remote-unavailable note instead of discarding results.

use std::collections::{HashMap, HashSet};

use chrono::{Duration as ChronoDuration, Utc};
use serde::Serialize;
use tokio::time::Duration;

use crate::core::types::Oid;
use crate::forge::{ActivityFeed, EventKind, FeedError, RemoteEvent};
use crate::scan::CancelFlag;
use crate::ui::output::{self, Verbosity};

/// Correlation confidence for a matched id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// The dangling id equals an event's head or before commit.
    Exact,
    /// The dangling id appeared only inside an event's pushed commit range.
    Ancestor,
}

/// A dangling commit id matched to a remote event.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationMatch {
    /// The dangling commit id that matched.
    pub dangling: Oid,
    /// The event it matched.
    pub event: RemoteEvent,
    /// How the id related to the event.
    pub confidence: Confidence,
}

/// Correlator tuning, surfaced through the CLI.
#[derive(Debug, Clone)]
pub struct CorrelatorConfig {
    /// Attempts per page fetch before giving up on remaining pages.
    pub max_retries: u32,
    /// Backoff before the first retry; doubles per attempt.
    pub base_delay: Duration,
    /// Events older than this are outside the platform's retention window.
    pub retention_days: i64,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            retention_days: 90,
        }
    }
}

/// What the correlator produced: matches plus an optional availability note.
#[derive(Debug, Default)]
pub struct CorrelationOutcome {
    /// Matches by dangling commit id. Ids with no match are absent.
    pub matches: HashMap<Oid, CorrelationMatch>,
    /// Present when the remote became unavailable before the feed was
    /// exhausted; matches gathered up to that point are still included.
    pub remote_unavailable: Option<String>,
}

/// Correlate the dangling id set against the feed.
///
/// Absence of an id from the result map is a valid terminal outcome, not a
/// failure.
pub async fn correlate(
    feed: &dyn ActivityFeed,
    ids: &HashSet<Oid>,
    config: &CorrelatorConfig,
    cancel: &CancelFlag,
    verbosity: Verbosity,
) -> CorrelationOutcome {
    let mut outcome = CorrelationOutcome::default();
    if ids.is_empty() {
        return outcome;
    }

    let cutoff = Utc::now() - ChronoDuration::days(config.retention_days);
    let mut unmatched: HashSet<Oid> = ids.clone();
    let mut cursor: Option<String> = None;
    let mut pages = 0u32;

    loop {
        if cancel.is_cancelled() {
            outcome.remote_unavailable = Some("correlation cancelled".to_string());
            return outcome;
        }

        let page = match fetch_with_retry(feed, cursor.as_deref(), config, cancel).await {
            Ok(page) => page,
            Err(err) => {
                outcome.remote_unavailable = Some(format!(
                    "{} feed unavailable after page {pages}: {err}",
                    feed.name()
                ));
                return outcome;
            }
        };
        pages += 1;
        output::debug(
            format!("fetched {} page {pages} ({} events)", feed.name(), page.events.len()),
            verbosity,
        );

        let mut past_retention = false;
        for event in &page.events {
            if event.timestamp < cutoff {
                // Reverse-chronological feed: everything after this is
                // older still. Accepted limitation, not an error.
                past_retention = true;
                break;
            }
            apply_event(event, &mut unmatched, &mut outcome.matches);
            if unmatched.is_empty() {
                return outcome;
            }
        }

        if past_retention || page.next.is_none() {
            return outcome;
        }
        cursor = page.next;
    }
}

/// Match one event against the remaining unmatched ids.
fn apply_event(
    event: &RemoteEvent,
    unmatched: &mut HashSet<Oid>,
    matches: &mut HashMap<Oid, CorrelationMatch>,
) {
    if !matches!(event.kind, EventKind::Push | EventKind::BranchDelete) {
        return;
    }

    let mut hits: Vec<(Oid, Confidence)> = Vec::new();
    for oid in event.direct_ids() {
        if unmatched.contains(oid) {
            hits.push((oid.clone(), Confidence::Exact));
        }
    }
    for oid in &event.commits {
        if unmatched.contains(oid) && !hits.iter().any(|(hit, _)| hit == oid) {
            hits.push((oid.clone(), Confidence::Ancestor));
        }
    }

    for (oid, confidence) in hits {
        unmatched.remove(&oid);
        matches.insert(
            oid.clone(),
            CorrelationMatch {
                dangling: oid,
                event: event.clone(),
                confidence,
            },
        );
    }
}

/// Fetch one page, retrying transient failures with exponential backoff.
async fn fetch_with_retry(
    feed: &dyn ActivityFeed,
    cursor: Option<&str>,
    config: &CorrelatorConfig,
    cancel: &CancelFlag,
) -> Result<crate::forge::EventPage, FeedError> {
    let mut attempt = 0u32;
    loop {
        match feed.fetch_page(cursor).await {
            Ok(page) => return Ok(page),
            Err(err) => {
                attempt += 1;
                if !err.is_retryable() || attempt >= config.max_retries || cancel.is_cancelled() {
                    return Err(err);
                }
                let delay = config.base_delay * 2u32.saturating_pow(attempt - 1);
                tokio::time::sleep(delay).await;
            }
        }
    }
}
