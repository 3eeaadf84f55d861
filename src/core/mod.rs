//! core
//!
//! Core domain types and the stacking algorithms.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid, RefName, BranchRef
//! - [`paths`] - Centralized path routing for stacked-rebase storage
//! - [`config`] - Configuration schema and loading
//! - [`boundary`] - Stack extraction with per-commit branch boundaries
//! - [`todo`] - Plan language, validation and generation
//! - [`autosquash`] - fixup!/squash! reordering
//! - [`rewrite`] - Rewrite log reconciliation and plan re-derivation
//! - [`state`] - Marker files
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Algorithms take a [`Vcs`](crate::git::Vcs) and never touch git directly
//! - Failures are typed; formatting happens at the CLI

pub mod autosquash;
pub mod boundary;
pub mod config;
pub mod paths;
pub mod rewrite;
pub mod state;
pub mod todo;
pub mod types;
