//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag.
//! Results go to stdout; warnings and errors go to stderr. With `--json`
//! the listing is machine-readable JSON.

use std::fmt::Display;

use crate::core::boundary::Boundary;
use crate::engine::{ApplyReport, Resolved, Source};

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

/// Print a success message (respects quiet mode).
pub fn success(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// One line per branch, oldest first: `<short-oid> <branch>`.
pub fn format_boundaries(boundaries: &[Boundary]) -> String {
    boundaries
        .iter()
        .map(|b| format!("{} {}", b.commit.short(7), b.branch))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Human-readable listing, noting when it reflects an unapplied rewrite.
pub fn format_resolved(resolved: &Resolved) -> String {
    let mut out = format_boundaries(&resolved.boundaries);
    if resolved.source == Source::PendingPlan {
        out.push_str("\n(positions after the pending rewrite; run with --apply to move the branches)");
    }
    out
}

/// Summary of an apply, one line per branch touched.
pub fn format_apply(report: &ApplyReport) -> String {
    let mut lines = Vec::new();
    for moved in &report.moved {
        lines.push(format!(
            "{}: {} -> {}",
            moved.branch,
            moved.from.short(7),
            moved.to.short(7)
        ));
    }
    for (branch, oid) in &report.created {
        lines.push(format!("{}: created at {}", branch, oid.short(7)));
    }
    if lines.is_empty() {
        lines.push("all branches already up to date".to_string());
    }
    lines.join("\n")
}
