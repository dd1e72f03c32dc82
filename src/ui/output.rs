//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag.
//! When `--json` is enabled, reports are serialized instead of rendered.

use std::fmt::Display;
use std::fmt::Write as _;

use crate::core::report::Report;
use crate::scan::ParentLink;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print a debug message (only in debug mode).
pub fn debug(message: impl Display, verbosity: Verbosity) {
    if verbosity == Verbosity::Debug {
        eprintln!("[debug] {}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Render the report list as human-readable text.
pub fn render_reports(reports: &[Report]) -> String {
    let mut out = String::new();
    for (i, report) in reports.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        render_report(&mut out, report);
    }
    out
}

fn render_report(out: &mut String, report: &Report) {
    let _ = write!(out, "dangling commit {}", report.head.short(12));
    if let Some(summary) = &report.summary {
        let _ = write!(out, "  {:?}", summary);
    }
    out.push('\n');
    if let (Some(author), Some(time)) = (&report.author, &report.author_time) {
        let _ = writeln!(out, "  author: {author} at {}", time.to_rfc3339());
    }
    if report.truncated {
        let _ = writeln!(out, "  lineage truncated (some objects already pruned)");
    }

    if let Some(c) = &report.correlation {
        let _ = writeln!(
            out,
            "  matched: {} of {} at {} ({})",
            c.kind,
            c.ref_name,
            c.timestamp.to_rfc3339(),
            match c.confidence {
                crate::scan::Confidence::Exact => "exact",
                crate::scan::Confidence::Ancestor => "ancestor",
            }
        );
    }
    if let Some(note) = &report.remote_note {
        let _ = writeln!(out, "  note: {note}");
    }

    if !report.commits.is_empty() {
        let _ = writeln!(out, "  commits:");
        for node in &report.commits {
            let _ = writeln!(out, "    {}  {}", node.oid.short(12), node.summary);
            for parent in &node.parents {
                let _ = match parent {
                    ParentLink::Followed(oid) => {
                        writeln!(out, "      parent {} (dangling)", oid.short(12))
                    }
                    ParentLink::Reachable(oid) => {
                        writeln!(out, "      parent {} (reachable)", oid.short(12))
                    }
                    ParentLink::Missing(oid) => {
                        writeln!(out, "      parent {} (missing)", oid.short(12))
                    }
                };
            }
        }
    }

    if !report.trees.is_empty() {
        let _ = writeln!(out, "  trees: {}", report.trees.len());
    }

    if !report.blobs.is_empty() {
        let _ = writeln!(out, "  blobs:");
        for blob in &report.blobs {
            match (&blob.content, &blob.decode_error) {
                (Some(content), _) => {
                    let _ = writeln!(
                        out,
                        "    {}  {} ({} bytes)",
                        blob.oid.short(12),
                        blob.path,
                        blob.size
                    );
                    for line in content.lines() {
                        let _ = writeln!(out, "      {line}");
                    }
                }
                (None, Some(err)) => {
                    let _ = writeln!(
                        out,
                        "    {}  {} ({} bytes, not shown: {err})",
                        blob.oid.short(12),
                        blob.path,
                        blob.size
                    );
                }
                (None, None) => {
                    let _ = writeln!(
                        out,
                        "    {}  {} ({} bytes)",
                        blob.oid.short(12),
                        blob.path,
                        blob.size
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::report::DecodedBlob;
    use crate::core::types::Oid;

    fn oid(c: char) -> Oid {
        Oid::new(c.to_string().repeat(40)).unwrap()
    }

    fn stub_report() -> Report {
        Report {
            head: oid('c'),
            author: Some("A U Thor <au@example.com>".into()),
            author_time: Some(chrono::DateTime::from_timestamp(100, 0).unwrap()),
            summary: Some("oops".into()),
            truncated: false,
            commits: vec![],
            trees: vec![],
            blobs: vec![DecodedBlob {
                oid: oid('b'),
                path: "config".into(),
                size: 10,
                content: Some("SECRET=xyz".into()),
                decode_error: None,
            }],
            correlation: None,
            remote_note: None,
        }
    }

    #[test]
    fn rendered_report_shows_head_and_content() {
        let text = render_reports(&[stub_report()]);
        assert!(text.contains("dangling commit"));
        assert!(text.contains(&oid('c').short(12)));
        assert!(text.contains("SECRET=xyz"));
    }

    #[test]
    fn undecodable_blob_renders_id_and_size_only() {
        let mut report = stub_report();
        report.blobs[0].content = None;
        report.blobs[0].decode_error = Some("invalid encoding: not valid UTF-8".into());

        let text = render_reports(&[report]);
        assert!(!text.contains("SECRET"));
        assert!(text.contains("not shown"));
        assert!(text.contains("10 bytes"));
    }

    #[test]
    fn empty_report_list_renders_empty() {
        assert!(render_reports(&[]).is_empty());
    }
}
