//! git::mock
//!
//! In-memory [`Vcs`] implementation for deterministic testing.
//!
//! # Design
//!
//! The mock stores commits, local branches and remote-tracking branches in
//! memory, records every checkout, and can be told to fail specific
//! checkouts so sequencer error paths are reachable without a repository.
//!
//! # Example
//!
//! ```
//! use stacked_rebase::core::types::BranchName;
//! use stacked_rebase::git::{Head, MockVcs, Vcs};
//!
//! let vcs = MockVcs::new();
//! let root = vcs.add_commit(&[], "root");
//! let next = vcs.add_commit(&[&root], "next");
//! let main = BranchName::new("main").unwrap();
//! vcs.set_local_branch(&main, &next);
//! vcs.set_head(Head::Branch(main.clone()));
//!
//! assert_eq!(vcs.resolve_branch(&main).unwrap(), Some(next.clone()));
//! assert_eq!(vcs.commit(&next).unwrap().parents, vec![root]);
//! ```

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use super::vcs::{BranchTip, CommitInfo, Head, RevisionTarget, Vcs};
use super::GitError;
use crate::core::types::{BranchName, BranchRef, Oid, RefName};

/// Mock version-control store.
///
/// Clones share state, so a test can keep a handle while the code under
/// test owns another.
#[derive(Debug, Clone, Default)]
pub struct MockVcs {
    inner: Arc<Mutex<MockVcsInner>>,
}

#[derive(Debug, Default)]
struct MockVcsInner {
    commits: HashMap<Oid, CommitInfo>,
    /// Insertion order, used for deterministic ids and abbreviation lookup.
    order: Vec<Oid>,
    local: BTreeMap<BranchName, Oid>,
    remote: BTreeMap<(String, BranchName), Oid>,
    /// Named non-commit objects (trees, blobs) for revision lookups.
    objects: HashMap<String, String>,
    head: Option<Head>,
    failing_checkouts: HashSet<BranchName>,
    operations: Vec<MockOperation>,
}

/// Recorded mutation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    /// `checkout_branch`
    CheckoutBranch(BranchName),
    /// `checkout_detached`
    CheckoutDetached(Oid),
    /// `ensure_local_branch` created a tracking branch
    CreateTracking {
        /// Remote the branch came from
        remote: String,
        /// Branch name
        name: BranchName,
    },
    /// `set_branch`
    SetBranch {
        /// Branch moved
        name: BranchName,
        /// New target
        oid: Oid,
    },
}

impl MockVcs {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockVcsInner> {
        // A panicking test thread must not hide the state from the assertions.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a commit with the given parents and summary, returning its id.
    pub fn add_commit(&self, parents: &[&Oid], summary: &str) -> Oid {
        let mut inner = self.lock();
        let counter = inner.order.len() + 1;
        // Spread the counter over the leading digits so abbreviations differ.
        let mixed = (counter as u128).wrapping_mul(0x9e37_79b9_7f4a_7c15_f39c_c060_5ced_c835);
        let hex = format!("{:032x}{:08x}", mixed, counter);
        let oid = Oid::new(hex).expect("formatted counter is a valid object id");
        inner.commits.insert(
            oid.clone(),
            CommitInfo {
                oid: oid.clone(),
                parents: parents.iter().map(|p| (*p).clone()).collect(),
                summary: summary.to_string(),
            },
        );
        inner.order.push(oid.clone());
        oid
    }

    /// Build a first-parent chain on top of `base`, one commit per summary.
    pub fn add_chain(&self, base: &Oid, summaries: &[&str]) -> Vec<Oid> {
        let mut parent = base.clone();
        let mut out = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let oid = self.add_commit(&[&parent], summary);
            out.push(oid.clone());
            parent = oid;
        }
        out
    }

    /// Create or move a local branch without recording an operation.
    pub fn set_local_branch(&self, name: &BranchName, oid: &Oid) {
        self.lock().local.insert(name.clone(), oid.clone());
    }

    /// Create or move a remote-tracking branch.
    pub fn set_remote_branch(&self, remote: &str, name: &BranchName, oid: &Oid) {
        self.lock()
            .remote
            .insert((remote.to_string(), name.clone()), oid.clone());
    }

    /// Register a non-commit object reachable under `name`.
    pub fn add_object(&self, name: &str, kind: &str) {
        self.lock()
            .objects
            .insert(name.to_string(), kind.to_string());
    }

    /// Set HEAD directly.
    pub fn set_head(&self, head: Head) {
        self.lock().head = Some(head);
    }

    /// Make every checkout of `name` fail.
    pub fn fail_checkout_of(&self, name: &BranchName) {
        self.lock().failing_checkouts.insert(name.clone());
    }

    /// Mutations recorded so far.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    /// Current local branch table.
    pub fn local_branches(&self) -> BTreeMap<BranchName, Oid> {
        self.lock().local.clone()
    }
}

impl MockVcsInner {
    fn commit(&self, oid: &Oid) -> Result<&CommitInfo, GitError> {
        self.commits.get(oid).ok_or_else(|| GitError::ObjectNotFound {
            oid: oid.to_string(),
        })
    }

    fn ancestors(&self, start: &Oid) -> Result<Vec<Oid>, GitError> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut queue = VecDeque::from([start.clone()]);
        while let Some(oid) = queue.pop_front() {
            if !seen.insert(oid.clone()) {
                continue;
            }
            queue.extend(self.commit(&oid)?.parents.iter().cloned());
            out.push(oid);
        }
        Ok(out)
    }
}

impl Vcs for MockVcs {
    fn head(&self) -> Result<Head, GitError> {
        self.lock().head.clone().ok_or_else(|| GitError::RefNotFound {
            refname: "HEAD".to_string(),
        })
    }

    fn resolve_branch(&self, branch: &BranchName) -> Result<Option<Oid>, GitError> {
        Ok(self.lock().local.get(branch).cloned())
    }

    fn branch_tips(&self) -> Result<Vec<BranchTip>, GitError> {
        let inner = self.lock();
        let mut tips: Vec<BranchTip> = inner
            .local
            .iter()
            .map(|(name, oid)| BranchTip {
                branch: BranchRef::local(name.clone()),
                oid: oid.clone(),
            })
            .collect();
        tips.extend(
            inner
                .remote
                .iter()
                .filter(|((_, name), _)| !inner.local.contains_key(name))
                .map(|((remote, name), oid)| BranchTip {
                    branch: BranchRef::remote(remote.clone(), name.clone()),
                    oid: oid.clone(),
                }),
        );
        Ok(tips)
    }

    fn commit(&self, oid: &Oid) -> Result<CommitInfo, GitError> {
        self.lock().commit(oid).cloned()
    }

    fn merge_base(&self, a: &Oid, b: &Oid) -> Result<Option<Oid>, GitError> {
        let inner = self.lock();
        let from_a: HashSet<Oid> = inner.ancestors(a)?.into_iter().collect();
        Ok(inner
            .ancestors(b)?
            .into_iter()
            .find(|oid| from_a.contains(oid)))
    }

    fn resolve_revision(&self, revision: &str) -> Result<Option<RevisionTarget>, GitError> {
        let inner = self.lock();
        if let Some(kind) = inner.objects.get(revision) {
            return Ok(Some(RevisionTarget::Other { kind: kind.clone() }));
        }
        if let Ok(name) = BranchName::new(revision) {
            if let Some(oid) = inner.local.get(&name) {
                return Ok(Some(RevisionTarget::Commit(oid.clone())));
            }
        }
        let matches: Vec<&Oid> = inner
            .order
            .iter()
            .filter(|oid| oid.matches_abbrev(revision))
            .collect();
        match matches.as_slice() {
            [only] => Ok(Some(RevisionTarget::Commit((*only).clone()))),
            _ => Ok(None),
        }
    }

    fn checkout_branch(&self, branch: &BranchName) -> Result<(), GitError> {
        let mut inner = self.lock();
        if inner.failing_checkouts.contains(branch) || !inner.local.contains_key(branch) {
            return Err(GitError::RefNotFound {
                refname: RefName::for_branch(branch).to_string(),
            });
        }
        inner.head = Some(Head::Branch(branch.clone()));
        inner
            .operations
            .push(MockOperation::CheckoutBranch(branch.clone()));
        Ok(())
    }

    fn checkout_detached(&self, oid: &Oid) -> Result<(), GitError> {
        let mut inner = self.lock();
        inner.commit(oid)?;
        inner.head = Some(Head::Detached(oid.clone()));
        inner
            .operations
            .push(MockOperation::CheckoutDetached(oid.clone()));
        Ok(())
    }

    fn ensure_local_branch(&self, branch: &BranchRef) -> Result<BranchName, GitError> {
        let mut inner = self.lock();
        let Some(remote) = &branch.remote else {
            return Ok(branch.name.clone());
        };
        if inner.local.contains_key(&branch.name) {
            return Ok(branch.name.clone());
        }
        let oid = inner
            .remote
            .get(&(remote.clone(), branch.name.clone()))
            .cloned()
            .ok_or_else(|| GitError::RefNotFound {
                refname: branch.refname().to_string(),
            })?;
        inner.local.insert(branch.name.clone(), oid);
        inner.operations.push(MockOperation::CreateTracking {
            remote: remote.clone(),
            name: branch.name.clone(),
        });
        Ok(branch.name.clone())
    }

    fn set_branch(
        &self,
        branch: &BranchName,
        new_oid: &Oid,
        expected_old: Option<&Oid>,
    ) -> Result<(), GitError> {
        let mut inner = self.lock();
        let current = inner.local.get(branch).cloned();
        if current.as_ref() != expected_old {
            return Err(GitError::CasFailed {
                refname: RefName::for_branch(branch).to_string(),
                expected: expected_old.map_or_else(|| "<none>".to_string(), Oid::to_string),
                actual: current.map_or_else(|| "<none>".to_string(), |o| o.to_string()),
            });
        }
        inner.commit(new_oid)?;
        inner.local.insert(branch.clone(), new_oid.clone());
        inner.operations.push(MockOperation::SetBranch {
            name: branch.clone(),
            oid: new_oid.clone(),
        });
        Ok(())
    }
}
