//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the only doorway to Git. No other module imports `git2`
//! or spawns `git`.
//!
//! - [`Vcs`] is the collaborator trait the stacking logic is written
//!   against: branch resolution, the ancestry walk, checkout, CAS branch
//!   moves.
//! - [`Git`] implements it with `git2` and adds repository-level queries
//!   (state, worktree status, config, hooks directory).
//! - [`MockVcs`] implements it in memory for tests.
//! - [`GitProcess`] runs the primitives only the CLI offers: the
//!   interactive rebase, push, and shell exec.
//!
//! # Invariants
//!
//! - Branch moves use compare-and-swap semantics
//! - All operations return strong types (Oid, BranchName, RefName)

mod interface;
pub mod mock;
mod process;
mod vcs;

pub use interface::{Git, GitError, GitState, RepoInfo, WorktreeStatus};
pub use mock::{MockOperation, MockVcs};
pub use process::{GitProcess, PushMode};
pub use vcs::{BranchTip, CommitInfo, Head, RevisionTarget, Vcs};
