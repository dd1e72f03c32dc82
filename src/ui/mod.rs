//! ui
//!
//! Output formatting.
//!
//! # Modules
//!
//! - [`output`] - Verbosity-aware printing and report rendering
//!
//! # Design
//!
//! All user-visible output goes through this module so formatting and the
//! quiet flag are handled in one place. Status goes to stderr-adjacent
//! helpers; report content goes to stdout (or a file) via the renderer.

pub mod output;
