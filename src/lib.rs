//! Stacked rebase for git.
//!
//! A stack is a linear chain of commits sliced into named branches, each
//! building on the one below it. This crate rewrites the whole stack with a
//! single interactive rebase and then moves every branch to the commit its
//! slice ended up at.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Compose, rebase, apply, resolve, and the branch sequencer
//! - [`core`] - Domain types, the plan language, autosquash, and rewrite reconciliation
//! - [`git`] - Single interface for all Git operations
//! - [`ui`] - User interaction utilities
//!
//! # Correctness Invariants
//!
//! 1. A plan is validated in full before anything is rewritten
//! 2. Branches move only through compare-and-swap ref updates
//! 3. A rewrite that has not been applied is never silently discarded
//! 4. The branch sequencer always returns HEAD to where it started

pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
pub mod ui;
