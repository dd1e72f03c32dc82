//! forge::traits
//!
//! Activity feed trait definition for interacting with remote hosting
//! services.
//!
//! # Design
//!
//! The `ActivityFeed` trait is async because feed operations involve network
//! I/O. All methods return `Result` to handle API errors gracefully.
//!
//! A feed is a reverse-chronological, cursor-paginated sequence of
//! [`RemoteEvent`] records. Platforms bound it by a retention window
//! (commonly ~90 days): events older than the window simply never appear,
//! which the correlator treats as an accepted limitation, not an error.
//!
//! # Example
//!
//! ```ignore
//! use dredge::forge::{ActivityFeed, FeedError};
//!
//! async fn newest_events(feed: &dyn ActivityFeed) -> Result<(), FeedError> {
//!     let page = feed.fetch_page(None).await?;
//!     for event in &page.events {
//!         println!("{} {} -> {}", event.timestamp, event.ref_name, event.head);
//!     }
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::Oid;

/// Errors from activity feed operations.
///
/// These error types map to common failure modes when interacting
/// with remote hosting services like GitHub.
#[derive(Debug, Clone, Error)]
pub enum FeedError {
    /// Authentication is required but not available.
    #[error("authentication required")]
    AuthRequired,

    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The repository or feed endpoint was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error (includes per-request timeouts).
    #[error("network error: {0}")]
    NetworkError(String),
}

impl FeedError {
    /// Whether retrying the same request with backoff can help.
    ///
    /// Rate limits, timeouts, and server-side errors are transient; auth
    /// failures and missing repositories are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            FeedError::RateLimited | FeedError::NetworkError(_) => true,
            FeedError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Kind of a remote activity event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A push (including force-pushes and merges) moved a ref.
    Push,
    /// A branch was deleted; `before` holds the deleted tip.
    BranchDelete,
    /// Anything else the platform reports. Carried for completeness but
    /// not matched against dangling ids.
    Other,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Push => write!(f, "push"),
            EventKind::BranchDelete => write!(f, "branch-delete"),
            EventKind::Other => write!(f, "other"),
        }
    }
}

/// One record from the remote activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEvent {
    /// Event kind.
    pub kind: EventKind,
    /// The ref the event acted on (e.g. `refs/heads/feature`).
    pub ref_name: String,
    /// The ref tip after the event. Zero for deletions.
    pub head: Oid,
    /// The ref tip before the event, if the platform reports one.
    pub before: Option<Oid>,
    /// Commit ids contained in the pushed range, when the platform lists
    /// them. Matches found only here yield ancestor-level confidence.
    #[serde(default)]
    pub commits: Vec<Oid>,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
}

impl RemoteEvent {
    /// Every id this event names directly (head/before), excluding zeros.
    pub fn direct_ids(&self) -> impl Iterator<Item = &Oid> {
        std::iter::once(&self.head)
            .chain(self.before.iter())
            .filter(|oid| !oid.is_zero())
    }
}

/// One page of the activity feed.
#[derive(Debug, Clone, Default)]
pub struct EventPage {
    /// Events on this page, newest first.
    pub events: Vec<RemoteEvent>,
    /// Opaque cursor for the next (older) page, `None` when exhausted.
    pub next: Option<String>,
}

/// The ActivityFeed trait for querying a forge's event history.
///
/// Pagination is sequential per feed: pages must be walked newest-first,
/// each request carrying the cursor returned by the previous page.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
#[async_trait]
pub trait ActivityFeed: Send + Sync {
    /// Identifier of the feed implementation (for diagnostics).
    fn name(&self) -> &'static str;

    /// Fetch one page of events.
    ///
    /// `cursor` is `None` for the newest page, or the cursor from a
    /// previously returned [`EventPage`].
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<EventPage, FeedError>;
}
