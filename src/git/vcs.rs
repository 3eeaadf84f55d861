//! git::vcs
//!
//! The version-control collaborator seen by the rest of the crate.
//!
//! Boundary extraction, autosquash, apply and the branch sequencer only
//! depend on this trait, so they run unchanged against the git2-backed
//! [`Git`](super::Git) and the in-memory [`MockVcs`](super::MockVcs).

use super::GitError;
use crate::core::types::{BranchName, BranchRef, Oid};

/// What HEAD currently points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    /// A local branch is checked out.
    Branch(BranchName),
    /// HEAD is detached at a commit.
    Detached(Oid),
}

impl std::fmt::Display for Head {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Head::Branch(name) => write!(f, "{name}"),
            Head::Detached(oid) => write!(f, "{} (detached)", oid.short(7)),
        }
    }
}

/// A branch reference together with the commit it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchTip {
    /// The branch
    pub branch: BranchRef,
    /// The commit it points at
    pub oid: Oid,
}

/// Commit metadata needed by the stack walk and autosquash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// The commit
    pub oid: Oid,
    /// Parent commits, first parent first
    pub parents: Vec<Oid>,
    /// First line of the message
    pub summary: String,
}

impl CommitInfo {
    /// The first parent, if any.
    pub fn first_parent(&self) -> Option<&Oid> {
        self.parents.first()
    }
}

/// Result of resolving an arbitrary revision string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionTarget {
    /// The revision peels to a commit.
    Commit(Oid),
    /// The revision names a tree, blob or other non-commit object.
    Other {
        /// Object kind as git names it
        kind: String,
    },
}

/// Version-control primitives consumed by the stacking logic.
pub trait Vcs {
    /// Current HEAD.
    fn head(&self) -> Result<Head, GitError>;

    /// Resolve a local branch to its tip, `None` if it does not exist.
    fn resolve_branch(&self, branch: &BranchName) -> Result<Option<Oid>, GitError>;

    /// Every local branch, plus remote-tracking branches whose short name has
    /// no local counterpart.
    fn branch_tips(&self) -> Result<Vec<BranchTip>, GitError>;

    /// Read a commit's parents and summary.
    fn commit(&self, oid: &Oid) -> Result<CommitInfo, GitError>;

    /// Best common ancestor of two commits.
    fn merge_base(&self, a: &Oid, b: &Oid) -> Result<Option<Oid>, GitError>;

    /// Resolve a revision string; `None` when it does not name anything.
    fn resolve_revision(&self, revision: &str) -> Result<Option<RevisionTarget>, GitError>;

    /// Check out a local branch.
    fn checkout_branch(&self, branch: &BranchName) -> Result<(), GitError>;

    /// Detach HEAD at a commit.
    fn checkout_detached(&self, oid: &Oid) -> Result<(), GitError>;

    /// Make a branch usable as a checkout target, creating a local tracking
    /// branch for remote-only refs. Returns the local name.
    fn ensure_local_branch(&self, branch: &BranchRef) -> Result<BranchName, GitError>;

    /// Point a local branch at `new_oid`.
    ///
    /// `expected_old` is a compare-and-swap precondition: `None` means the
    /// branch must not exist yet.
    fn set_branch(
        &self,
        branch: &BranchName,
        new_oid: &Oid,
        expected_old: Option<&Oid>,
    ) -> Result<(), GitError>;

    /// Check out whatever `head` describes.
    fn restore_head(&self, head: &Head) -> Result<(), GitError> {
        match head {
            Head::Branch(name) => self.checkout_branch(name),
            Head::Detached(oid) => self.checkout_detached(oid),
        }
    }
}
