//! forge
//!
//! Abstraction for remote activity feeds (GitHub, GitLab).
//!
//! # Architecture
//!
//! The `ActivityFeed` trait defines the interface for querying a remote
//! hosting service's event history. The correlator depends only on the
//! trait, so feeds are independently substitutable and mockable:
//!
//! - Feed failures never compromise the local scan; they surface as a
//!   partial-correlation annotation on the affected reports
//! - Feed results are joined with local results by commit id only
//!
//! # Modules
//!
//! - `traits`: Core `ActivityFeed` trait and event types
//! - [`github`]: GitHub implementation over the repository activity REST API
//! - [`gitlab`]: GitLab implementation over the project events REST API
//! - [`mock`]: Mock implementation for deterministic testing
//!
//! # Example
//!
//! ```ignore
//! use dredge::forge::github::GitHubActivity;
//! use dredge::forge::ActivityFeed;
//!
//! let feed = GitHubActivity::from_remote_url(&origin_url, token)
//!     .ok_or_else(|| anyhow::anyhow!("origin is not a GitHub remote"))?;
//! let page = feed.fetch_page(None).await?;
//! ```

pub mod github;
pub mod gitlab;
pub mod mock;
mod traits;

pub use traits::{ActivityFeed, EventKind, EventPage, FeedError, RemoteEvent};
