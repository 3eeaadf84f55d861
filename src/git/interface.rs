//! git::interface
//!
//! Git interface implementation using git2.
//!
//! This module is the only place in the crate that imports `git2`. Every
//! read and every ref mutation that does not need the git CLI goes through
//! [`Git`], which normalizes libgit2 failures into [`GitError`].
//!
//! # Error Handling
//!
//! - [`GitError::NotARepo`]: Not inside a Git repository
//! - [`GitError::RefNotFound`]: Requested ref does not exist
//! - [`GitError::CasFailed`]: Compare-and-swap precondition failed
//! - [`GitError::DirtyWorktree`]: Working tree has uncommitted changes
//! - [`GitError::ProcessFailed`]: A git CLI invocation exited non-zero

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::vcs::{BranchTip, CommitInfo, Head, RevisionTarget, Vcs};
use crate::core::types::{BranchName, BranchRef, Oid, RefName, TypeError};

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found
        refname: String,
    },

    /// Compare-and-swap precondition failed.
    #[error("CAS failed for {refname}: expected {expected}, found {actual}")]
    CasFailed {
        /// The ref being updated
        refname: String,
        /// The expected old value
        expected: String,
        /// The actual current value
        actual: String,
    },

    /// Working tree has uncommitted changes.
    #[error("working tree is dirty: {details}")]
    DirtyWorktree {
        /// Description of what's dirty
        details: String,
    },

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The OID that was not found
        oid: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// Invalid ref name format.
    #[error("invalid ref name: {message}")]
    InvalidRefName {
        /// Description of the problem
        message: String,
    },

    /// Permission or filesystem error.
    #[error("repository access error: {message}")]
    AccessError {
        /// Description of the error
        message: String,
    },

    /// A git subprocess could not be started.
    #[error("failed to run git {command}: {message}")]
    Spawn {
        /// The git subcommand
        command: String,
        /// The OS error
        message: String,
    },

    /// A git subprocess exited unsuccessfully.
    #[error("git {command} failed ({status}){}", stderr_suffix(.stderr))]
    ProcessFailed {
        /// The git invocation, without the leading `git`
        command: String,
        /// Exit status as reported by the OS
        status: String,
        /// Captured standard error, if any
        stderr: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

impl GitError {
    /// Create a GitError from a git2::Error with the ref or oid it concerned.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => {
                if context.starts_with("refs/") || context == "HEAD" {
                    GitError::RefNotFound {
                        refname: context.to_string(),
                    }
                } else {
                    GitError::ObjectNotFound {
                        oid: context.to_string(),
                    }
                }
            }
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            git2::ErrorCode::Locked => GitError::AccessError {
                message: format!("repository is locked: {}", err.message()),
            },
            git2::ErrorCode::Conflict => GitError::DirtyWorktree {
                details: format!("{}: {}", context, err.message()),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }

    fn internal(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => GitError::InvalidOid { oid: msg },
            TypeError::InvalidRefName(msg) | TypeError::InvalidBranchName(msg) => {
                GitError::InvalidRefName { message: msg }
            }
        }
    }
}

/// Information about a Git repository.
#[derive(Debug, Clone)]
pub struct RepoInfo {
    /// Path to the per-worktree .git directory
    pub git_dir: PathBuf,
    /// Path to the shared git directory (equals `git_dir` outside linked worktrees)
    pub common_dir: PathBuf,
    /// Path to working directory
    pub work_dir: PathBuf,
}

/// State of in-progress Git operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitState {
    /// No operation in progress.
    Clean,

    /// Rebase in progress.
    Rebase {
        /// Current step in the rebase (1-indexed), if available.
        current: Option<usize>,
        /// Total steps in the rebase, if available.
        total: Option<usize>,
    },

    /// Merge, cherry-pick, revert, bisect or am in progress.
    Other {
        /// Short description of the operation
        operation: &'static str,
    },
}

impl GitState {
    /// Check if any operation is in progress.
    ///
    /// ```
    /// use stacked_rebase::git::GitState;
    ///
    /// assert!(!GitState::Clean.is_in_progress());
    /// assert!(GitState::Other { operation: "merge" }.is_in_progress());
    /// ```
    pub fn is_in_progress(&self) -> bool {
        !matches!(self, GitState::Clean)
    }

    /// Whether a rebase specifically is in progress.
    pub fn is_rebase(&self) -> bool {
        matches!(self, GitState::Rebase { .. })
    }
}

impl std::fmt::Display for GitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitState::Clean => write!(f, "clean"),
            GitState::Rebase {
                current: Some(c),
                total: Some(t),
            } => write!(f, "rebase ({}/{})", c, t),
            GitState::Rebase { .. } => write!(f, "rebase"),
            GitState::Other { operation } => write!(f, "{}", operation),
        }
    }
}

/// Summary of working tree status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorktreeStatus {
    /// Number of staged changes
    pub staged: usize,
    /// Number of unstaged changes to tracked files
    pub unstaged: usize,
    /// Whether there are unresolved conflicts
    pub has_conflicts: bool,
}

impl WorktreeStatus {
    /// Check if the worktree has no tracked changes at all.
    pub fn is_clean(&self) -> bool {
        self.staged == 0 && self.unstaged == 0 && !self.has_conflicts
    }
}

impl std::fmt::Display for WorktreeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} staged, {} unstaged", self.staged, self.unstaged)?;
        if self.has_conflicts {
            write!(f, ", conflicts")?;
        }
        Ok(())
    }
}

/// The Git interface.
///
/// Holds one `git2::Repository` and implements [`Vcs`] on top of it.
///
/// ```ignore
/// use stacked_rebase::git::{Git, Vcs};
/// use std::path::Path;
///
/// let git = Git::open(Path::new("."))?;
/// let head = git.head()?;
/// for tip in git.branch_tips()? {
///     println!("{} -> {}", tip.branch, tip.oid.short(7));
/// }
/// ```
pub struct Git {
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Opening and Info
    // =========================================================================

    /// Open the repository containing `path`.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    /// - [`GitError::BareRepo`] if the repository has no working directory
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        if repo.is_bare() {
            return Err(GitError::BareRepo);
        }

        Ok(Self { repo })
    }

    /// Get repository information.
    pub fn info(&self) -> Result<RepoInfo, GitError> {
        let work_dir = self.repo.workdir().ok_or(GitError::BareRepo)?.to_path_buf();
        Ok(RepoInfo {
            git_dir: self.repo.path().to_path_buf(),
            common_dir: self.repo.commondir().to_path_buf(),
            work_dir,
        })
    }

    /// Path to the per-worktree .git directory.
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    /// Directory git runs hooks from (`core.hooksPath` or `<common-dir>/hooks`).
    pub fn hooks_dir(&self) -> Result<PathBuf, GitError> {
        match self.config_string("core.hooksPath")? {
            Some(custom) => {
                let custom = PathBuf::from(custom);
                if custom.is_absolute() {
                    Ok(custom)
                } else {
                    let work_dir = self.repo.workdir().ok_or(GitError::BareRepo)?;
                    Ok(work_dir.join(custom))
                }
            }
            None => Ok(self.repo.commondir().join("hooks")),
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Read a boolean from git config, `None` when unset.
    pub fn config_bool(&self, key: &str) -> Result<Option<bool>, GitError> {
        let config = self.repo.config().map_err(GitError::internal)?;
        match config.get_bool(key) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, key)),
        }
    }

    /// Read a string from git config, `None` when unset.
    pub fn config_string(&self, key: &str) -> Result<Option<String>, GitError> {
        let config = self.repo.config().map_err(GitError::internal)?;
        match config.get_string(key) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, key)),
        }
    }

    // =========================================================================
    // State Detection
    // =========================================================================

    /// Get the current Git state (rebase, merge, etc.).
    pub fn state(&self) -> GitState {
        match self.repo.state() {
            git2::RepositoryState::Clean => GitState::Clean,
            git2::RepositoryState::Rebase
            | git2::RepositoryState::RebaseInteractive
            | git2::RepositoryState::RebaseMerge
            | git2::RepositoryState::ApplyMailboxOrRebase => {
                let (current, total) = self.read_rebase_progress();
                GitState::Rebase { current, total }
            }
            git2::RepositoryState::Merge => GitState::Other { operation: "merge" },
            git2::RepositoryState::CherryPick | git2::RepositoryState::CherryPickSequence => {
                GitState::Other {
                    operation: "cherry-pick",
                }
            }
            git2::RepositoryState::Revert | git2::RepositoryState::RevertSequence => {
                GitState::Other {
                    operation: "revert",
                }
            }
            git2::RepositoryState::Bisect => GitState::Other {
                operation: "bisect",
            },
            git2::RepositoryState::ApplyMailbox => GitState::Other { operation: "am" },
        }
    }

    /// Read rebase progress from .git/rebase-merge.
    fn read_rebase_progress(&self) -> (Option<usize>, Option<usize>) {
        let dir = self.repo.path().join("rebase-merge");
        let read = |name: &str| {
            std::fs::read_to_string(dir.join(name))
                .ok()
                .and_then(|s| s.trim().parse().ok())
        };
        (read("msgnum"), read("end"))
    }

    /// Get working tree status summary, ignoring untracked files.
    pub fn worktree_status(&self) -> Result<WorktreeStatus, GitError> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(false).include_ignored(false);

        let statuses = self
            .repo
            .statuses(Some(&mut opts))
            .map_err(GitError::internal)?;

        let mut result = WorktreeStatus::default();
        for entry in statuses.iter() {
            let status = entry.status();
            if status.is_conflicted() {
                result.has_conflicts = true;
            }
            if status.is_index_new()
                || status.is_index_modified()
                || status.is_index_deleted()
                || status.is_index_renamed()
                || status.is_index_typechange()
            {
                result.staged += 1;
            }
            if status.is_wt_modified()
                || status.is_wt_deleted()
                || status.is_wt_renamed()
                || status.is_wt_typechange()
            {
                result.unstaged += 1;
            }
        }
        Ok(result)
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    fn git2_oid(oid: &Oid) -> Result<git2::Oid, GitError> {
        git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))
    }

    fn to_oid(oid: git2::Oid) -> Result<Oid, GitError> {
        Ok(Oid::new(oid.to_string())?)
    }

    fn try_resolve_ref(&self, refname: &str) -> Result<Option<Oid>, GitError> {
        match self.repo.find_reference(refname) {
            Ok(reference) => {
                let commit = reference
                    .peel_to_commit()
                    .map_err(|e| GitError::from_git2(e, refname))?;
                Ok(Some(Self::to_oid(commit.id())?))
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, refname)),
        }
    }

    /// Names of all configured remotes, longest first so prefix matching
    /// picks `upstream/fork` over `upstream` when both exist.
    fn remote_names(&self) -> Result<Vec<String>, GitError> {
        let remotes = self.repo.remotes().map_err(GitError::internal)?;
        let mut names: Vec<String> = remotes.iter().flatten().map(String::from).collect();
        names.sort_by_key(|name| std::cmp::Reverse(name.len()));
        Ok(names)
    }

    fn checkout_object(&self, spec: &str) -> Result<(), GitError> {
        let object = self
            .repo
            .revparse_single(spec)
            .map_err(|e| GitError::from_git2(e, spec))?;
        let mut builder = git2::build::CheckoutBuilder::new();
        builder.safe();
        self.repo
            .checkout_tree(&object, Some(&mut builder))
            .map_err(|e| GitError::from_git2(e, spec))
    }
}

impl Vcs for Git {
    fn head(&self) -> Result<Head, GitError> {
        let head = self
            .repo
            .head()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;

        if head.is_branch() {
            if let Some(name) = head.shorthand() {
                return Ok(Head::Branch(BranchName::new(name)?));
            }
        }

        let commit = head
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;
        Ok(Head::Detached(Self::to_oid(commit.id())?))
    }

    fn resolve_branch(&self, branch: &BranchName) -> Result<Option<Oid>, GitError> {
        self.try_resolve_ref(RefName::for_branch(branch).as_str())
    }

    fn branch_tips(&self) -> Result<Vec<BranchTip>, GitError> {
        let remotes = self.remote_names()?;
        let branches = self.repo.branches(None).map_err(GitError::internal)?;

        let mut local = Vec::new();
        let mut remote = Vec::new();
        for entry in branches {
            let (branch, kind) = entry.map_err(GitError::internal)?;
            let reference = branch.get();
            // Symbolic refs such as origin/HEAD are aliases, not tips.
            if reference.symbolic_target().is_some() {
                continue;
            }
            let Some(full_name) = branch.name().ok().flatten() else {
                continue;
            };
            let Ok(commit) = reference.peel_to_commit() else {
                continue;
            };
            let oid = Self::to_oid(commit.id())?;

            match kind {
                git2::BranchType::Local => {
                    if let Ok(name) = BranchName::new(full_name) {
                        local.push(BranchTip {
                            branch: BranchRef::local(name),
                            oid,
                        });
                    }
                }
                git2::BranchType::Remote => {
                    let split = remotes.iter().find_map(|r| {
                        full_name
                            .strip_prefix(r.as_str())
                            .and_then(|rest| rest.strip_prefix('/'))
                            .map(|rest| (r.clone(), rest))
                    });
                    if let Some((remote_name, short)) = split {
                        if let Ok(name) = BranchName::new(short) {
                            remote.push(BranchTip {
                                branch: BranchRef::remote(remote_name, name),
                                oid,
                            });
                        }
                    }
                }
            }
        }

        remote.retain(|tip| !local.iter().any(|l| l.branch.name == tip.branch.name));
        local.extend(remote);
        Ok(local)
    }

    fn commit(&self, oid: &Oid) -> Result<CommitInfo, GitError> {
        let commit = self
            .repo
            .find_commit(Self::git2_oid(oid)?)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;

        let parents = commit
            .parent_ids()
            .map(Self::to_oid)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CommitInfo {
            oid: oid.clone(),
            parents,
            summary: commit.summary().unwrap_or("").to_string(),
        })
    }

    fn merge_base(&self, a: &Oid, b: &Oid) -> Result<Option<Oid>, GitError> {
        match self.repo.merge_base(Self::git2_oid(a)?, Self::git2_oid(b)?) {
            Ok(oid) => Ok(Some(Self::to_oid(oid)?)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::internal(e)),
        }
    }

    fn resolve_revision(&self, revision: &str) -> Result<Option<RevisionTarget>, GitError> {
        let object = match self.repo.revparse_single(revision) {
            Ok(object) => object,
            Err(e)
                if matches!(
                    e.code(),
                    git2::ErrorCode::NotFound
                        | git2::ErrorCode::InvalidSpec
                        | git2::ErrorCode::Ambiguous
                ) =>
            {
                return Ok(None)
            }
            Err(e) => return Err(GitError::from_git2(e, revision)),
        };

        match object.peel(git2::ObjectType::Commit) {
            Ok(commit) => Ok(Some(RevisionTarget::Commit(Self::to_oid(commit.id())?))),
            Err(_) => Ok(Some(RevisionTarget::Other {
                kind: object
                    .kind()
                    .map(|k| k.str().to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
            })),
        }
    }

    fn checkout_branch(&self, branch: &BranchName) -> Result<(), GitError> {
        let refname = RefName::for_branch(branch);
        self.checkout_object(refname.as_str())?;
        self.repo
            .set_head(refname.as_str())
            .map_err(|e| GitError::from_git2(e, refname.as_str()))
    }

    fn checkout_detached(&self, oid: &Oid) -> Result<(), GitError> {
        self.checkout_object(oid.as_str())?;
        self.repo
            .set_head_detached(Self::git2_oid(oid)?)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))
    }

    fn ensure_local_branch(&self, branch: &BranchRef) -> Result<BranchName, GitError> {
        let Some(remote) = &branch.remote else {
            return Ok(branch.name.clone());
        };
        if self.resolve_branch(&branch.name)?.is_some() {
            return Ok(branch.name.clone());
        }

        let remote_ref = branch.refname();
        let commit = self
            .repo
            .find_reference(remote_ref.as_str())
            .and_then(|r| r.peel_to_commit())
            .map_err(|e| GitError::from_git2(e, remote_ref.as_str()))?;
        let mut local = self
            .repo
            .branch(branch.name.as_str(), &commit, false)
            .map_err(|e| GitError::from_git2(e, branch.name.as_str()))?;
        local
            .set_upstream(Some(&format!("{}/{}", remote, branch.name)))
            .map_err(GitError::internal)?;
        Ok(branch.name.clone())
    }

    fn set_branch(
        &self,
        branch: &BranchName,
        new_oid: &Oid,
        expected_old: Option<&Oid>,
    ) -> Result<(), GitError> {
        let refname = RefName::for_branch(branch);
        let current = self.try_resolve_ref(refname.as_str())?;

        if current.as_ref() != expected_old {
            return Err(GitError::CasFailed {
                refname: refname.to_string(),
                expected: expected_old.map_or_else(|| "<none>".to_string(), Oid::to_string),
                actual: current.map_or_else(|| "<none>".to_string(), |o| o.to_string()),
            });
        }

        let target = Self::git2_oid(new_oid)?;
        let checked_out = matches!(self.head(), Ok(Head::Branch(ref b)) if b == branch);
        if checked_out {
            // Moving the checked-out branch has to move the index and worktree too.
            let status = self.worktree_status()?;
            if !status.is_clean() {
                return Err(GitError::DirtyWorktree {
                    details: format!("cannot move checked-out branch {branch}: {status}"),
                });
            }
            let object = self
                .repo
                .find_object(target, None)
                .map_err(|e| GitError::from_git2(e, new_oid.as_str()))?;
            self.repo
                .reset(&object, git2::ResetType::Hard, None)
                .map_err(|e| GitError::from_git2(e, refname.as_str()))?;
            return Ok(());
        }

        self.repo
            .reference(
                refname.as_str(),
                target,
                true,
                &format!("stacked-rebase: move {branch}"),
            )
            .map_err(|e| GitError::from_git2(e, refname.as_str()))?;
        Ok(())
    }
}
