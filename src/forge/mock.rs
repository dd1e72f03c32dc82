//! forge::mock
//!
//! Mock activity feed implementation for deterministic testing.
//!
//! # Design
//!
//! The mock feed serves a scripted sequence of pages and allows configuring
//! failure scenarios: fail every fetch of a given page either once (to
//! exercise retry) or persistently (to exercise `RemoteUnavailable`
//! surfacing).
//!
//! # Example
//!
//! ```
//! use dredge::forge::mock::MockFeed;
//! use dredge::forge::{ActivityFeed, EventPage};
//!
//! # tokio_test::block_on(async {
//! let feed = MockFeed::new(vec![EventPage::default()]);
//! let page = feed.fetch_page(None).await.unwrap();
//! assert!(page.events.is_empty());
//! assert!(page.next.is_none());
//! # });
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::traits::{ActivityFeed, EventPage, FeedError};

/// Failure mode for a scripted page.
#[derive(Debug, Clone)]
pub enum FailMode {
    /// Fail the first `n` fetches of the page, then succeed.
    Times(u32, FeedError),
    /// Fail every fetch of the page.
    Always(FeedError),
}

/// Mock activity feed for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockFeed {
    inner: Arc<Mutex<MockFeedInner>>,
}

#[derive(Debug)]
struct MockFeedInner {
    /// Scripted pages, index 0 is the newest. Page `i` links to page `i+1`
    /// via the cursor string `i+1`.
    pages: Vec<EventPage>,
    /// Configured failures by page index.
    failures: HashMap<usize, FailMode>,
    /// Failure counts consumed so far for `FailMode::Times`.
    failed_so_far: HashMap<usize, u32>,
    /// Total fetch attempts observed (including failures).
    fetch_count: u32,
}

impl MockFeed {
    /// Create a feed serving the given pages in order.
    ///
    /// Cursors are filled in automatically: each page links to the next,
    /// and the last page has no cursor.
    pub fn new(pages: Vec<EventPage>) -> Self {
        let count = pages.len();
        let pages = pages
            .into_iter()
            .enumerate()
            .map(|(i, mut page)| {
                page.next = if i + 1 < count {
                    Some((i + 1).to_string())
                } else {
                    None
                };
                page
            })
            .collect();
        Self {
            inner: Arc::new(Mutex::new(MockFeedInner {
                pages,
                failures: HashMap::new(),
                failed_so_far: HashMap::new(),
                fetch_count: 0,
            })),
        }
    }

    /// An empty feed (one empty page).
    pub fn empty() -> Self {
        Self::new(vec![EventPage::default()])
    }

    /// Configure a failure for fetches of the page at `index`.
    pub fn fail_page(&self, index: usize, mode: FailMode) {
        let mut inner = self.inner.lock().expect("mock feed lock poisoned");
        inner.failures.insert(index, mode);
    }

    /// Total fetch attempts observed so far, including failed ones.
    pub fn fetch_count(&self) -> u32 {
        self.inner
            .lock()
            .expect("mock feed lock poisoned")
            .fetch_count
    }
}

#[async_trait]
impl ActivityFeed for MockFeed {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<EventPage, FeedError> {
        let index: usize = match cursor {
            None => 0,
            Some(c) => c.parse().map_err(|_| FeedError::ApiError {
                status: 400,
                message: format!("unknown cursor: {c}"),
            })?,
        };

        let mut inner = self.inner.lock().expect("mock feed lock poisoned");
        inner.fetch_count += 1;

        if let Some(mode) = inner.failures.get(&index).cloned() {
            match mode {
                FailMode::Always(err) => return Err(err),
                FailMode::Times(n, err) => {
                    let seen = inner.failed_so_far.entry(index).or_insert(0);
                    if *seen < n {
                        *seen += 1;
                        return Err(err);
                    }
                }
            }
        }

        inner
            .pages
            .get(index)
            .cloned()
            .ok_or_else(|| FeedError::ApiError {
                status: 404,
                message: format!("no page at index {index}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Oid;
    use crate::forge::traits::{EventKind, RemoteEvent};
    use chrono::Utc;

    fn push_event(head: &Oid) -> RemoteEvent {
        RemoteEvent {
            kind: EventKind::Push,
            ref_name: "refs/heads/feature".into(),
            head: head.clone(),
            before: None,
            commits: vec![],
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn pages_are_linked_in_order() {
        let a = Oid::new("a".repeat(40)).unwrap();
        let b = Oid::new("b".repeat(40)).unwrap();
        let feed = MockFeed::new(vec![
            EventPage {
                events: vec![push_event(&a)],
                next: None,
            },
            EventPage {
                events: vec![push_event(&b)],
                next: None,
            },
        ]);

        let first = feed.fetch_page(None).await.unwrap();
        assert_eq!(first.events[0].head, a);
        let cursor = first.next.unwrap();

        let second = feed.fetch_page(Some(&cursor)).await.unwrap();
        assert_eq!(second.events[0].head, b);
        assert!(second.next.is_none());
    }

    #[tokio::test]
    async fn fail_times_then_succeeds() {
        let feed = MockFeed::empty();
        feed.fail_page(0, FailMode::Times(2, FeedError::RateLimited));

        assert!(feed.fetch_page(None).await.is_err());
        assert!(feed.fetch_page(None).await.is_err());
        assert!(feed.fetch_page(None).await.is_ok());
        assert_eq!(feed.fetch_count(), 3);
    }

    #[tokio::test]
    async fn fail_always_keeps_failing() {
        let feed = MockFeed::empty();
        feed.fail_page(0, FailMode::Always(FeedError::AuthFailed("nope".into())));

        for _ in 0..3 {
            assert!(matches!(
                feed.fetch_page(None).await,
                Err(FeedError::AuthFailed(_))
            ));
        }
    }
}
