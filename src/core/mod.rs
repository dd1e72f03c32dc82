//! core
//!
//! Core domain types for the scan.
//!
//! # Modules
//!
//! - [`types`] - Strong types: the `Oid` newtype
//! - [`object`] - Parsed object model: commits, trees, blobs, tags
//! - [`report`] - Report assembly from lineages and correlation matches
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Aggregation is pure: no store or network access
//! - All ordering is deterministic

pub mod object;
pub mod report;
pub mod types;
