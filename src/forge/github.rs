//! forge::github
//!
//! GitHub activity feed implementation using the REST API.
//!
//! # Design
//!
//! This module implements the `ActivityFeed` trait for GitHub over the
//! repository activity endpoint (`GET /repos/{owner}/{repo}/activity`),
//! which reports pushes, force-pushes, merges, and branch creations and
//! deletions with their before/after commit ids. The endpoint is
//! reverse-chronological and cursor-paginated via the `Link` response
//! header; the cursor handed back through [`EventPage::next`] is the full
//! URL of the next page.
//!
//! # Authentication
//!
//! A bearer token is optional: public repositories can be queried
//! unauthenticated at a much lower rate limit. The token is supplied by the
//! CLI layer (flag or `GITHUB_TOKEN`); this module never reads credentials
//! itself.
//!
//! # Rate Limiting
//!
//! GitHub surfaces rate limits as 403/429 responses. These map to
//! [`FeedError::RateLimited`], which the correlator treats as retryable
//! with bounded backoff before giving up on the remaining pages.
//!
//! # Example
//!
//! ```ignore
//! use dredge::forge::github::GitHubActivity;
//! use dredge::forge::ActivityFeed;
//!
//! let feed = GitHubActivity::new("octocat", "hello-world", Some("ghp_xxx".into()));
//! let page = feed.fetch_page(None).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LINK, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use super::traits::{ActivityFeed, EventKind, EventPage, FeedError, RemoteEvent};
use crate::core::types::Oid;

/// Default GitHub API base URL.
const DEFAULT_API_BASE: &str = "https://api.github.com";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "dredge-cli";

/// Per-request timeout. Independent of the correlator's retry budget.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Events requested per page (GitHub's maximum).
const PER_PAGE: u32 = 100;

/// GitHub activity feed implementation.
///
/// Implements the `ActivityFeed` trait for GitHub using the repository
/// activity REST endpoint.
pub struct GitHubActivity {
    /// HTTP client for making requests
    client: Client,
    /// Optional bearer token; unauthenticated access works for public repos
    token: Option<String>,
    /// Repository owner (user or organization)
    owner: String,
    /// Repository name
    repo: String,
    /// API base URL (configurable for GitHub Enterprise and tests)
    api_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubActivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubActivity")
            .field("has_token", &self.token.is_some())
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitHubActivity {
    /// Create a new GitHub activity feed for `owner/repo`.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            token,
            owner: owner.into(),
            repo: repo.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Create a feed with a custom API base URL.
    ///
    /// Use this for GitHub Enterprise installations
    /// (e.g. `https://github.example.com/api/v3`) and for tests against a
    /// local mock server.
    pub fn with_api_base(
        owner: impl Into<String>,
        repo: impl Into<String>,
        token: Option<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            ..Self::new(owner, repo, token)
        }
    }

    /// Create a feed from a remote URL.
    ///
    /// Parses the remote URL to extract owner and repo.
    ///
    /// # Example
    ///
    /// ```
    /// use dredge::forge::github::GitHubActivity;
    ///
    /// let feed = GitHubActivity::from_remote_url("git@github.com:owner/repo.git", None);
    /// assert!(feed.is_some());
    /// ```
    pub fn from_remote_url(url: &str, token: Option<String>) -> Option<Self> {
        let (owner, repo) = parse_github_url(url)?;
        Some(Self::new(owner, repo, token))
    }

    /// Get the repository owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Get the repository name.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, FeedError> {
        let mut headers = HeaderMap::new();
        if let Some(ref token) = self.token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|_| FeedError::AuthFailed("token contains invalid bytes".into()))?,
            );
        }
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// URL for the newest activity page.
    fn first_page_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/activity?per_page={}",
            self.api_base, self.owner, self.repo, PER_PAGE
        )
    }

    /// Handle an error response from the API.
    async fn handle_error_response(
        &self,
        response: Response,
        status: StatusCode,
    ) -> FeedError {
        // Distinguish rate limiting from permission problems before
        // consuming the body.
        let rate_limited = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == "0")
            .unwrap_or(false);

        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "Unknown error".to_string(),
        };

        match status {
            StatusCode::UNAUTHORIZED => FeedError::AuthFailed("Invalid or expired token".into()),
            StatusCode::TOO_MANY_REQUESTS => FeedError::RateLimited,
            StatusCode::FORBIDDEN if rate_limited => FeedError::RateLimited,
            StatusCode::FORBIDDEN => FeedError::AuthFailed(format!("Permission denied: {message}")),
            StatusCode::NOT_FOUND => FeedError::NotFound(format!(
                "{}/{}: {message}",
                self.owner, self.repo
            )),
            _ if status.is_server_error() => FeedError::ApiError {
                status: status.as_u16(),
                message: format!("GitHub server error: {message}"),
            },
            _ => FeedError::ApiError {
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[async_trait]
impl ActivityFeed for GitHubActivity {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<EventPage, FeedError> {
        let url = match cursor {
            Some(next) => next.to_string(),
            None => self.first_page_url(),
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

        let next = parse_link_next(response.headers());
        let rows: Vec<ActivityRow> = response.json().await.map_err(|e| FeedError::ApiError {
            status: status.as_u16(),
            message: format!("Failed to parse response: {e}"),
        })?;

        Ok(EventPage {
            events: rows.into_iter().filter_map(ActivityRow::into_event).collect(),
            next,
        })
    }
}

/// One row of the repository activity endpoint.
#[derive(Debug, Deserialize)]
struct ActivityRow {
    before: String,
    after: String,
    #[serde(rename = "ref")]
    ref_name: String,
    timestamp: DateTime<Utc>,
    activity_type: String,
}

impl ActivityRow {
    /// Convert an API row into a domain event.
    ///
    /// Rows with unparseable ids are dropped rather than failing the page.
    fn into_event(self) -> Option<RemoteEvent> {
        let kind = match self.activity_type.as_str() {
            "push" | "force_push" | "pr_merge" | "branch_creation" => EventKind::Push,
            "branch_deletion" => EventKind::BranchDelete,
            _ => EventKind::Other,
        };
        let head = Oid::new(&self.after).ok()?;
        let before = Oid::new(&self.before).ok();
        Some(RemoteEvent {
            kind,
            ref_name: self.ref_name,
            head,
            before,
            // The activity endpoint does not list the pushed commit range;
            // ancestor-level matches come from feeds that do.
            commits: Vec::new(),
            timestamp: self.timestamp,
        })
    }
}

/// GitHub API error response body.
#[derive(Debug, Deserialize)]
struct GitHubErrorResponse {
    #[serde(default)]
    message: String,
}

/// Extract the `rel="next"` URL from a `Link` response header.
fn parse_link_next(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    for part in link.split(',') {
        let mut sections = part.split(';');
        let url = sections.next()?.trim();
        let is_next = sections.any(|s| s.trim() == "rel=\"next\"");
        if is_next && url.starts_with('<') && url.ends_with('>') {
            return Some(url[1..url.len() - 1].to_string());
        }
    }
    None
}

/// Parse a GitHub remote URL into (owner, repo).
///
/// Supports SSH (`git@github.com:owner/repo.git`) and HTTPS
/// (`https://github.com/owner/repo.git`) formats.
///
/// # Example
///
/// ```
/// use dredge::forge::github::parse_github_url;
///
/// let (owner, repo) = parse_github_url("git@github.com:octocat/hello-world.git").unwrap();
/// assert_eq!(owner, "octocat");
/// assert_eq!(repo, "hello-world");
/// ```
pub fn parse_github_url(url: &str) -> Option<(String, String)> {
    // SSH format: git@github.com:owner/repo.git
    if let Some(rest) = url.strip_prefix("git@github.com:") {
        let rest = rest.strip_suffix(".git").unwrap_or(rest);
        let parts: Vec<&str> = rest.splitn(2, '/').collect();
        if parts.len() == 2 {
            return Some((parts[0].to_string(), parts[1].to_string()));
        }
    }

    // HTTPS format: https://github.com/owner/repo.git
    if let Some(rest) = url
        .strip_prefix("https://github.com/")
        .or_else(|| url.strip_prefix("http://github.com/"))
    {
        let rest = rest.strip_suffix(".git").unwrap_or(rest);
        let parts: Vec<&str> = rest.splitn(2, '/').collect();
        if parts.len() == 2 && !parts[1].is_empty() {
            return Some((parts[0].to_string(), parts[1].to_string()));
        }
    }

    None
}
