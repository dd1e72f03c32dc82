//! Dredge - forensic recovery of dangling Git objects.
//!
//! Dredge locates commits, trees, and blobs that are physically present in a
//! repository's object store but no longer reachable from any branch, tag, or
//! reflog entry, reconstructs their content, and correlates them against a
//! forge's activity feed to recover where they came from (a deleted branch, a
//! rewritten pull request). Such objects frequently contain secrets that were
//! "erased" by a force-push but survive until garbage collection.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to scan)
//! - [`scan`] - Discovery engine: classify -> reconstruct -> correlate -> report
//! - [`core`] - Domain types, object model, and report aggregation
//! - [`git`] - Single interface for all object store access
//! - [`forge`] - Abstraction for remote activity feeds (GitHub v1)
//! - [`decode`] - Content decoding boundary for recovered blobs
//! - [`ui`] - Output utilities
//!
//! # Correctness Invariants
//!
//! Dredge maintains the following invariants:
//!
//! 1. The repository is never mutated; every store operation is a read
//! 2. The root set is captured once per scan and never re-read mid-traversal
//! 3. Reachable and dangling sets are disjoint and cover every stored object
//! 4. Partial results are always preferred over no results

pub mod cli;
pub mod core;
pub mod decode;
pub mod forge;
pub mod git;
pub mod scan;
pub mod ui;
