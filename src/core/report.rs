//! core::report
//!
//! Report assembly: join lineages and correlation matches into the final
//! per-head reports.
//!
//! # Design
//!
//! Aggregation is a pure join, keyed by commit id. It never touches the
//! object store or the network, so it is trivially testable with in-memory
//! inputs. Reports are ordered newest-first by author time with id as the
//! tiebreaker, so output is deterministic for identical scan results.

use std::collections::BTreeSet;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::types::Oid;
use crate::decode::ContentDecoder;
use crate::forge::EventKind;
use crate::scan::{CommitNode, Confidence, CorrelationMatch, CorrelationOutcome, Lineage};

/// A recovered blob with decoded content where possible.
///
/// Binary or undecodable blobs keep their id, path, and size but carry a
/// decode note instead of content. One bad blob never hides the others.
#[derive(Debug, Clone, Serialize)]
pub struct DecodedBlob {
    /// The blob id.
    pub oid: Oid,
    /// Path under the first tree that referenced the blob.
    pub path: String,
    /// Stored size in bytes.
    pub size: usize,
    /// Decoded content, when decoding succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Why decoding failed, when it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decode_error: Option<String>,
}

/// The remote event a report's lineage was matched to.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationSummary {
    /// Match confidence.
    pub confidence: Confidence,
    /// The id in this lineage that matched.
    pub matched: Oid,
    /// Event kind.
    pub kind: EventKind,
    /// The ref the event acted on.
    pub ref_name: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The ref tip after the event. Zero for deletions.
    pub head: Oid,
    /// The ref tip before the event, if reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<Oid>,
}

impl CorrelationSummary {
    fn from_match(m: &CorrelationMatch) -> Self {
        Self {
            confidence: m.confidence,
            matched: m.dangling.clone(),
            kind: m.event.kind,
            ref_name: m.event.ref_name.clone(),
            timestamp: m.event.timestamp,
            head: m.event.head.clone(),
            before: m.event.before.clone(),
        }
    }
}

/// One report per dangling head commit.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// The dangling head commit id.
    pub head: Oid,
    /// Head commit author, when the head could be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Head commit author time, when the head could be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_time: Option<DateTime<Utc>>,
    /// Head commit message summary, when the head could be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Whether any part of the lineage was cut short by a missing or
    /// unreadable object.
    pub truncated: bool,
    /// Lineage commits, head first.
    pub commits: Vec<CommitNode>,
    /// Dangling tree ids captured in the lineage.
    pub trees: Vec<Oid>,
    /// Dangling blobs with decoded content.
    pub blobs: Vec<DecodedBlob>,
    /// The remote event this lineage matched, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation: Option<CorrelationSummary>,
    /// Set when the remote feed became unavailable before this lineage
    /// could be conclusively matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_note: Option<String>,
}

/// Join lineages and correlation matches into the final report list.
///
/// Every head gets a report. A head whose lineage could not be
/// reconstructed (isolated store failure or cancellation) gets a stub
/// report marked truncated, keeping the failure visible.
pub fn aggregate(
    heads: &BTreeSet<Oid>,
    mut lineages: HashMap<Oid, Lineage>,
    outcome: CorrelationOutcome,
    decoder: &dyn ContentDecoder,
) -> Vec<Report> {
    let mut reports: Vec<Report> = heads
        .iter()
        .map(|head| {
            let lineage = lineages.remove(head).unwrap_or(Lineage {
                truncated: true,
                ..Lineage::default()
            });
            build_report(head, lineage, &outcome, decoder)
        })
        .collect();

    // Newest first; id breaks ties so output is stable.
    reports.sort_by(|a, b| {
        b.author_time
            .cmp(&a.author_time)
            .then_with(|| a.head.cmp(&b.head))
    });
    reports
}

fn build_report(
    head: &Oid,
    lineage: Lineage,
    outcome: &CorrelationOutcome,
    decoder: &dyn ContentDecoder,
) -> Report {
    let correlation = find_match(head, &lineage, &outcome.matches);
    let remote_note = if correlation.is_none() {
        outcome.remote_unavailable.clone()
    } else {
        None
    };

    let (author, author_time, summary) = match lineage.head() {
        Some(node) => (
            Some(node.author.clone()),
            Some(node.author_time),
            Some(node.summary.clone()),
        ),
        None => (None, None, None),
    };

    let blobs = lineage
        .blobs
        .into_iter()
        .map(|blob| {
            let size = blob.bytes.len();
            match decoder.decode(&blob.bytes) {
                Ok(bytes) => DecodedBlob {
                    oid: blob.oid,
                    path: blob.path,
                    size,
                    // The decoder guarantees valid UTF-8 on success.
                    content: Some(String::from_utf8_lossy(&bytes).into_owned()),
                    decode_error: None,
                },
                Err(err) => DecodedBlob {
                    oid: blob.oid,
                    path: blob.path,
                    size,
                    content: None,
                    decode_error: Some(err.to_string()),
                },
            }
        })
        .collect();

    Report {
        head: head.clone(),
        author,
        author_time,
        summary,
        truncated: lineage.truncated,
        commits: lineage.commits,
        trees: lineage.trees,
        blobs,
        correlation,
        remote_note,
    }
}

/// Find the best correlation match for a lineage: a match on the head id
/// wins over a match on any interior commit.
fn find_match(
    head: &Oid,
    lineage: &Lineage,
    matches: &HashMap<Oid, CorrelationMatch>,
) -> Option<CorrelationSummary> {
    if let Some(m) = matches.get(head) {
        return Some(CorrelationSummary::from_match(m));
    }
    lineage
        .commits
        .iter()
        .find_map(|node| matches.get(&node.oid))
        .map(CorrelationSummary::from_match)
}
