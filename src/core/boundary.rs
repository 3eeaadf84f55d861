//! core::boundary
//!
//! Branch boundary extraction.
//!
//! A stack is the first-parent chain from the merge-base of the initial
//! branch and the latest branch up to the latest branch's tip. Each commit
//! in that chain is annotated with every branch whose tip resolves to it.
//!
//! Tips are resolved once per extraction into a [`BoundaryIndex`]; commits
//! themselves are never annotated in place.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::core::autosquash::SquashKind;
use crate::core::types::{BranchName, BranchRef, Oid};
use crate::git::{BranchTip, CommitInfo, GitError, Head, RevisionTarget, Vcs};

/// Errors from boundary extraction.
#[derive(Debug, Error)]
pub enum BoundaryError {
    /// HEAD is not on a branch.
    #[error("HEAD is detached at {0}; check out the latest branch of the stack first")]
    DetachedHead(String),

    /// The initial branch does not resolve.
    #[error("initial branch '{0}' does not exist")]
    UnknownInitial(BranchName),

    /// The initial revision is not a commit.
    #[error("initial branch '{name}' resolves to a {kind}, not a commit")]
    InitialNotCommit {
        /// The requested initial
        name: BranchName,
        /// Object kind
        kind: String,
    },

    /// The two branches share no history.
    #[error("'{initial}' and '{latest}' have no common ancestor")]
    NoCommonAncestor {
        /// Initial branch
        initial: BranchName,
        /// Latest branch
        latest: BranchName,
    },

    /// The merge-base is only reachable through a merge's second parent.
    #[error("merge-base {base} is not on the first-parent history of '{latest}'")]
    BaseNotOnFirstParent {
        /// The merge-base
        base: String,
        /// Latest branch
        latest: BranchName,
    },

    /// Underlying git failure.
    #[error(transparent)]
    Git(#[from] GitError),
}

/// Map from commit to the branches whose tips resolve to it.
#[derive(Debug, Clone, Default)]
pub struct BoundaryIndex {
    by_commit: HashMap<Oid, BTreeSet<BranchRef>>,
}

impl BoundaryIndex {
    /// Build the index from resolved branch tips.
    pub fn new(tips: impl IntoIterator<Item = BranchTip>) -> Self {
        let mut by_commit: HashMap<Oid, BTreeSet<BranchRef>> = HashMap::new();
        for tip in tips {
            by_commit.entry(tip.oid).or_default().insert(tip.branch);
        }
        Self { by_commit }
    }

    /// Branches landing on `oid`, sorted.
    pub fn at(&self, oid: &Oid) -> Vec<BranchRef> {
        self.by_commit
            .get(oid)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// One commit of the stack with its boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAndBoundary {
    /// The commit
    pub commit: CommitInfo,
    /// Branches whose tips are this commit
    pub branches: Vec<BranchRef>,
    /// Set by autosquash on relocated fixup!/squash! commits
    pub squash: Option<SquashKind>,
}

impl CommitAndBoundary {
    /// The commit id.
    pub fn oid(&self) -> &Oid {
        &self.commit.oid
    }
}

/// A branch and the commit it ends at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Boundary {
    /// The branch
    pub branch: BranchRef,
    /// Its tip
    pub commit: Oid,
}

/// The extracted stack, oldest commit first.
///
/// `commits[0]` is the merge-base and always carries exactly the initial
/// branch; the last element always carries the latest branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    /// Branch the stack is rebased onto
    pub initial: BranchName,
    /// Branch checked out when the stack was read
    pub latest: BranchName,
    /// Commits with boundaries
    pub commits: Vec<CommitAndBoundary>,
}

impl Stack {
    /// Commits after the base, the ones a rebase rewrites.
    pub fn rewritten(&self) -> &[CommitAndBoundary] {
        self.commits.get(1..).unwrap_or(&[])
    }

    /// Every branch of the stack except the initial one, oldest first.
    ///
    /// The latest branch is always the final entry, even when other
    /// branches share its commit.
    pub fn boundaries(&self) -> Vec<Boundary> {
        let mut out: Vec<Boundary> = self
            .rewritten()
            .iter()
            .flat_map(|element| {
                element.branches.iter().map(|branch| Boundary {
                    branch: branch.clone(),
                    commit: element.oid().clone(),
                })
            })
            .filter(|b| !(b.branch.remote.is_none() && b.branch.name == self.latest))
            .collect();
        if let Some(last) = self.commits.last() {
            if self.commits.len() > 1 {
                out.push(Boundary {
                    branch: BranchRef::local(self.latest.clone()),
                    commit: last.oid().clone(),
                });
            }
        }
        out
    }
}

/// Extract the stack between `initial` and the checked-out branch.
pub fn extract_from_head(vcs: &dyn Vcs, initial: &BranchName) -> Result<Stack, BoundaryError> {
    match vcs.head()? {
        Head::Branch(latest) => extract(vcs, initial, &latest),
        Head::Detached(oid) => Err(BoundaryError::DetachedHead(oid.short(7).to_string())),
    }
}

/// Extract the stack between `initial` and `latest`.
pub fn extract(
    vcs: &dyn Vcs,
    initial: &BranchName,
    latest: &BranchName,
) -> Result<Stack, BoundaryError> {
    let initial_oid = resolve_initial(vcs, initial)?;
    let latest_oid = vcs
        .resolve_branch(latest)?
        .ok_or_else(|| GitError::RefNotFound {
            refname: format!("refs/heads/{latest}"),
        })?;

    let base = vcs.merge_base(&initial_oid, &latest_oid)?.ok_or_else(|| {
        BoundaryError::NoCommonAncestor {
            initial: initial.clone(),
            latest: latest.clone(),
        }
    })?;

    let index = BoundaryIndex::new(vcs.branch_tips()?);

    let mut chain = Vec::new();
    let mut cursor = latest_oid;
    while cursor != base {
        let info = vcs.commit(&cursor)?;
        let Some(parent) = info.first_parent().cloned() else {
            return Err(BoundaryError::BaseNotOnFirstParent {
                base: base.short(7).to_string(),
                latest: latest.clone(),
            });
        };
        chain.push(info);
        cursor = parent;
    }
    chain.push(vcs.commit(&base)?);
    chain.reverse();

    let last = chain.len() - 1;
    let commits = chain
        .into_iter()
        .enumerate()
        .map(|(i, commit)| {
            let mut branches = if i == 0 {
                vec![BranchRef::local(initial.clone())]
            } else {
                index.at(&commit.oid)
            };
            if i == last && !branches.iter().any(|b| &b.name == latest) {
                branches.push(BranchRef::local(latest.clone()));
            }
            CommitAndBoundary {
                commit,
                branches,
                squash: None,
            }
        })
        .collect::<Vec<_>>();

    debug!(
        initial = %initial,
        latest = %latest,
        commits = commits.len(),
        "extracted stack"
    );

    Ok(Stack {
        initial: initial.clone(),
        latest: latest.clone(),
        commits,
    })
}

/// Resolve the initial branch, accepting remote-tracking names such as
/// `origin/main` when no local branch matches.
pub fn resolve_initial(vcs: &dyn Vcs, initial: &BranchName) -> Result<Oid, BoundaryError> {
    if let Some(oid) = vcs.resolve_branch(initial)? {
        return Ok(oid);
    }
    match vcs.resolve_revision(initial.as_str())? {
        Some(RevisionTarget::Commit(oid)) => Ok(oid),
        Some(RevisionTarget::Other { kind }) => Err(BoundaryError::InitialNotCommit {
            name: initial.clone(),
            kind,
        }),
        None => Err(BoundaryError::UnknownInitial(initial.clone())),
    }
}
