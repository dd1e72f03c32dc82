//! forge::gitlab
//!
//! GitLab activity feed implementation using the REST events API.
//!
//! # Design
//!
//! This module implements the `ActivityFeed` trait for GitLab over the
//! project events endpoint
//! (`GET /api/v4/projects/{path}/events?action=pushed`), which reports
//! every ref movement as a push event carrying the before/after commit ids
//! in its `push_data` payload. Branch deletions are push events too, with
//! `push_data.action == "removed"` and no after-commit. The endpoint is
//! reverse-chronological and page-number paginated; the server advertises
//! the next page in the `x-next-page` response header, and the cursor
//! handed back through [`EventPage::next`] is the full URL of that page.
//!
//! GitLab drops events older than its retention period from the events
//! table, which is exactly the window the correlator expects.
//!
//! # Authentication
//!
//! GitLab takes the token in a `PRIVATE-TOKEN` header. It is optional for
//! public projects and supplied by the CLI layer (flag or `GITLAB_TOKEN`);
//! this module never reads credentials itself.
//!
//! # Example
//!
//! ```ignore
//! use dredge::forge::gitlab::GitLabActivity;
//! use dredge::forge::ActivityFeed;
//!
//! let feed = GitLabActivity::new("group/project", Some("glpat-xxx".into()));
//! let page = feed.fetch_page(None).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use super::traits::{ActivityFeed, EventKind, EventPage, FeedError, RemoteEvent};
use crate::core::types::Oid;

/// Default GitLab API base URL (the v4 REST root).
const DEFAULT_API_BASE: &str = "https://gitlab.com/api/v4";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "dredge-cli";

/// Per-request timeout. Independent of the correlator's retry budget.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Events requested per page (GitLab's maximum).
const PER_PAGE: u32 = 100;

/// GitLab activity feed implementation.
///
/// Implements the `ActivityFeed` trait for GitLab using the project events
/// REST endpoint.
pub struct GitLabActivity {
    /// HTTP client for making requests
    client: Client,
    /// Optional private token; unauthenticated access works for public projects
    token: Option<String>,
    /// Full project path (`group/project`, subgroups included)
    project: String,
    /// API base URL (configurable for self-hosted instances and tests)
    api_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitLabActivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitLabActivity")
            .field("has_token", &self.token.is_some())
            .field("project", &self.project)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitLabActivity {
    /// Create a new GitLab activity feed for a full project path
    /// (`group/project`, subgroups allowed), talking to gitlab.com.
    pub fn new(project: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            token,
            project: project.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Create a feed with a custom API base URL.
    ///
    /// Use this for self-hosted GitLab installations
    /// (e.g. `https://gitlab.example.com/api/v4`) and for tests against a
    /// local mock server.
    pub fn with_api_base(
        project: impl Into<String>,
        token: Option<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            ..Self::new(project, token)
        }
    }

    /// Create a feed from a remote URL.
    ///
    /// Parses the remote URL to extract the host and project path; the
    /// host becomes the API base, so self-hosted instances work as long as
    /// the remote points at them.
    ///
    /// # Example
    ///
    /// ```
    /// use dredge::forge::gitlab::GitLabActivity;
    ///
    /// let feed = GitLabActivity::from_remote_url("git@gitlab.com:group/project.git", None);
    /// assert!(feed.is_some());
    /// ```
    pub fn from_remote_url(url: &str, token: Option<String>) -> Option<Self> {
        let (host, project) = parse_gitlab_url(url)?;
        Some(Self::with_api_base(
            project,
            token,
            format!("https://{host}/api/v4"),
        ))
    }

    /// Get the full project path.
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, FeedError> {
        let mut headers = HeaderMap::new();
        if let Some(ref token) = self.token {
            headers.insert(
                "PRIVATE-TOKEN",
                HeaderValue::from_str(token)
                    .map_err(|_| FeedError::AuthFailed("token contains invalid bytes".into()))?,
            );
        }
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        Ok(headers)
    }

    /// URL of one events page. The project path is URL-encoded into a
    /// single path segment as the API requires.
    fn page_url(&self, page: u32) -> String {
        format!(
            "{}/projects/{}/events?action=pushed&per_page={}&page={}",
            self.api_base,
            self.project.replace('/', "%2F"),
            PER_PAGE,
            page
        )
    }

    /// Handle an error response from the API.
    async fn handle_error_response(&self, response: Response, status: StatusCode) -> FeedError {
        let message = match response.json::<GitLabErrorResponse>().await {
            Ok(err) => err.message(),
            Err(_) => "Unknown error".to_string(),
        };

        match status {
            StatusCode::UNAUTHORIZED => FeedError::AuthFailed("Invalid or expired token".into()),
            StatusCode::TOO_MANY_REQUESTS => FeedError::RateLimited,
            StatusCode::FORBIDDEN => FeedError::AuthFailed(format!("Permission denied: {message}")),
            StatusCode::NOT_FOUND => {
                FeedError::NotFound(format!("{}: {message}", self.project))
            }
            _ if status.is_server_error() => FeedError::ApiError {
                status: status.as_u16(),
                message: format!("GitLab server error: {message}"),
            },
            _ => FeedError::ApiError {
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[async_trait]
impl ActivityFeed for GitLabActivity {
    fn name(&self) -> &'static str {
        "gitlab"
    }

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<EventPage, FeedError> {
        let url = match cursor {
            Some(next) => next.to_string(),
            None => self.page_url(1),
        };

        let response = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| FeedError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.handle_error_response(response, status).await);
        }

        let next = parse_next_page(response.headers()).map(|page| self.page_url(page));
        let rows: Vec<EventRow> = response.json().await.map_err(|e| FeedError::ApiError {
            status: status.as_u16(),
            message: format!("Failed to parse response: {e}"),
        })?;

        Ok(EventPage {
            events: rows.into_iter().filter_map(EventRow::into_event).collect(),
            next,
        })
    }
}

/// One row of the project events endpoint.
#[derive(Debug, Deserialize)]
struct EventRow {
    created_at: DateTime<Utc>,
    push_data: Option<PushData>,
}

/// The push payload of an event row.
#[derive(Debug, Deserialize)]
struct PushData {
    action: String,
    ref_type: String,
    #[serde(rename = "ref")]
    ref_name: Option<String>,
    commit_from: Option<String>,
    commit_to: Option<String>,
}

impl EventRow {
    /// Convert an API row into a domain event.
    ///
    /// Rows without push data (the `action=pushed` filter should exclude
    /// them, but the API is not contractual about it) and rows with
    /// unparseable ids are dropped rather than failing the page.
    fn into_event(self) -> Option<RemoteEvent> {
        let push = self.push_data?;
        let kind = match push.action.as_str() {
            "removed" => EventKind::BranchDelete,
            "pushed" | "created" => EventKind::Push,
            _ => EventKind::Other,
        };
        // Deletions carry no after-commit; the deleted tip is commit_from.
        let head = match push.commit_to {
            Some(raw) => Oid::new(raw).ok()?,
            None => Oid::zero(),
        };
        let before = push.commit_from.and_then(|raw| Oid::new(raw).ok());
        let namespace = if push.ref_type == "tag" { "tags" } else { "heads" };
        Some(RemoteEvent {
            kind,
            ref_name: format!("refs/{namespace}/{}", push.ref_name.unwrap_or_default()),
            head,
            before,
            // The events endpoint reports only the range endpoints, not
            // the pushed commits themselves.
            commits: Vec::new(),
            timestamp: self.created_at,
        })
    }
}

/// GitLab API error response body. Errors arrive under either key
/// depending on the endpoint.
#[derive(Debug, Deserialize)]
struct GitLabErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl GitLabErrorResponse {
    fn message(self) -> String {
        self.message
            .or(self.error)
            .unwrap_or_else(|| "Unknown error".to_string())
    }
}

/// Extract the next page number from the `x-next-page` response header.
/// GitLab sends it empty on the last page.
fn parse_next_page(headers: &HeaderMap) -> Option<u32> {
    headers
        .get("x-next-page")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// Parse a GitLab remote URL into (host, project path).
///
/// Supports SSH (`git@gitlab.example.com:group/project.git`) and HTTPS
/// (`https://gitlab.example.com/group/sub/project.git`) formats; the
/// project path keeps any subgroup segments.
///
/// # Example
///
/// ```
/// use dredge::forge::gitlab::parse_gitlab_url;
///
/// let (host, project) = parse_gitlab_url("git@gitlab.com:group/sub/project.git").unwrap();
/// assert_eq!(host, "gitlab.com");
/// assert_eq!(project, "group/sub/project");
/// ```
pub fn parse_gitlab_url(url: &str) -> Option<(String, String)> {
    // SSH format: git@host:group/project.git
    if let Some(rest) = url.strip_prefix("git@") {
        let (host, path) = rest.split_once(':')?;
        let path = path.strip_suffix(".git").unwrap_or(path);
        if !host.is_empty() && path.contains('/') {
            return Some((host.to_string(), path.to_string()));
        }
        return None;
    }

    // HTTPS format: https://host/group/project.git
    if let Some(rest) = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
    {
        let (host, path) = rest.split_once('/')?;
        let path = path.strip_suffix(".git").unwrap_or(path);
        if !host.is_empty() && path.contains('/') && !path.ends_with('/') {
            return Some((host.to_string(), path.to_string()));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    mod parse_gitlab_url {
        use super::*;

        #[test]
        fn ssh_with_git_suffix() {
            let (host, project) = parse_gitlab_url("git@gitlab.com:group/project.git").unwrap();
            assert_eq!(host, "gitlab.com");
            assert_eq!(project, "group/project");
        }

        #[test]
        fn ssh_keeps_subgroups() {
            let (host, project) =
                parse_gitlab_url("git@gitlab.example.com:group/sub/project.git").unwrap();
            assert_eq!(host, "gitlab.example.com");
            assert_eq!(project, "group/sub/project");
        }

        #[test]
        fn https_with_git_suffix() {
            let (host, project) =
                parse_gitlab_url("https://gitlab.com/group/project.git").unwrap();
            assert_eq!(host, "gitlab.com");
            assert_eq!(project, "group/project");
        }

        #[test]
        fn https_self_hosted() {
            let (host, project) =
                parse_gitlab_url("https://code.example.org/team/project").unwrap();
            assert_eq!(host, "code.example.org");
            assert_eq!(project, "team/project");
        }

        #[test]
        fn invalid_format() {
            assert!(parse_gitlab_url("not-a-url").is_none());
            assert!(parse_gitlab_url("git@gitlab.com:no-slash").is_none());
            assert!(parse_gitlab_url("https://gitlab.com/only-group/").is_none());
        }
    }

    mod event_row {
        use super::*;

        fn row(action: &str, from: Option<&str>, to: Option<&str>) -> EventRow {
            EventRow {
                created_at: Utc::now(),
                push_data: Some(PushData {
                    action: action.to_string(),
                    ref_type: "branch".to_string(),
                    ref_name: Some("feature".to_string()),
                    commit_from: from.map(String::from),
                    commit_to: to.map(String::from),
                }),
            }
        }

        #[test]
        fn pushed_maps_to_push() {
            let a = "a".repeat(40);
            let b = "b".repeat(40);
            let event = row("pushed", Some(&a), Some(&b)).into_event().unwrap();
            assert_eq!(event.kind, EventKind::Push);
            assert_eq!(event.head.as_str(), b);
            assert_eq!(event.before.unwrap().as_str(), a);
            assert_eq!(event.ref_name, "refs/heads/feature");
        }

        #[test]
        fn removed_maps_to_branch_delete_with_zero_head() {
            let a = "a".repeat(40);
            let event = row("removed", Some(&a), None).into_event().unwrap();
            assert_eq!(event.kind, EventKind::BranchDelete);
            assert!(event.head.is_zero());
            assert_eq!(event.before.unwrap().as_str(), a);
        }

        #[test]
        fn created_branch_maps_to_push() {
            let b = "b".repeat(40);
            let event = row("created", None, Some(&b)).into_event().unwrap();
            assert_eq!(event.kind, EventKind::Push);
            assert_eq!(event.head.as_str(), b);
            assert!(event.before.is_none());
        }

        #[test]
        fn row_without_push_data_is_dropped() {
            let bare = EventRow {
                created_at: Utc::now(),
                push_data: None,
            };
            assert!(bare.into_event().is_none());
        }

        #[test]
        fn malformed_commit_to_drops_row() {
            assert!(row("pushed", None, Some("garbage")).into_event().is_none());
        }
    }

    #[test]
    fn project_path_is_url_encoded() {
        let feed = GitLabActivity::new("group/sub/project", None);
        assert!(feed.page_url(1).contains("/projects/group%2Fsub%2Fproject/events"));
        assert!(feed.page_url(2).ends_with("page=2"));
    }

    #[test]
    fn debug_redacts_token() {
        let feed = GitLabActivity::new("group/project", Some("glpat-secret".into()));
        let debug = format!("{feed:?}");
        assert!(!debug.contains("glpat-secret"));
        assert!(debug.contains("has_token: true"));
    }
}
