//! git
//!
//! Single interface for all object store access.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. All store reads flow through
//! this interface. Direct parsing of `.git` internal files outside this
//! module is prohibited. No other module should import `git2`.
//!
//! The surface is strictly read-only: a forensic scan never mutates the
//! repository it examines.
//!
//! # Responsibilities
//!
//! - Repository discovery and opening
//! - Object enumeration (every stored id, reachable or not)
//! - Object reads (commit, tree, blob, tag) with typed parse errors
//! - Root set capture (ref tips and reflog entries, one snapshot per scan)
//! - Remote URL lookup
//!
//! # Modules
//!
//! - `interface`: the git2-backed [`Git`] store
//! - `store`: the [`ObjectReader`] seam and [`MemoryStore`] test double
//!
//! # Example
//!
//! ```ignore
//! use dredge::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! let all = git.list_all_object_ids()?;
//! let roots = git.list_roots()?;
//! ```

mod interface;
mod store;

pub use interface::{Git, GitError};
pub use store::{MemoryStore, ObjectReader};
