//! core::paths
//!
//! Centralized path routing for stacked-rebase storage locations.
//!
//! # Storage Layout
//!
//! Everything lives under `<git_dir>/stacked-rebase/`:
//! - `git-rebase-todo` - The stacked plan the user edits
//! - `git-rebase-todo.regular` - The plan handed to `git rebase -i`
//! - `rewritten-list` - Rewrite events appended by the post-rewrite hook
//! - `needs-to-apply` - Copy of the event log while branches are stale
//! - `applied` - Copy of the event log once branches were moved
//! - `initial-branch` - The last initial branch used
//! - `recording` - Present while the post-rewrite hook should log events
//! - `config.toml` - Repository configuration
//!
//! A rebase belongs to one worktree, so the per-worktree `git_dir` is used
//! rather than the shared common dir.
//!
//! # Example
//!
//! ```
//! use stacked_rebase::core::paths::RebasePaths;
//! use std::path::PathBuf;
//!
//! let paths = RebasePaths::new(PathBuf::from("/repo/.git"));
//! assert_eq!(
//!     paths.plan_path(),
//!     PathBuf::from("/repo/.git/stacked-rebase/git-rebase-todo")
//! );
//! ```

use std::path::{Path, PathBuf};

use crate::git::RepoInfo;

/// Directory name under the git dir.
pub const DIR_NAME: &str = "stacked-rebase";

/// Path routing for stacked-rebase storage.
///
/// No code outside this module should compute `*.join("stacked-rebase")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebasePaths {
    /// Path to the per-worktree .git directory.
    pub git_dir: PathBuf,
}

impl RebasePaths {
    /// Create paths rooted at `git_dir`.
    pub fn new(git_dir: PathBuf) -> Self {
        Self { git_dir }
    }

    /// Create paths from repository info.
    pub fn from_repo_info(info: &RepoInfo) -> Self {
        Self::new(info.git_dir.clone())
    }

    /// `<git_dir>/stacked-rebase/`
    pub fn root(&self) -> PathBuf {
        self.git_dir.join(DIR_NAME)
    }

    /// Stacked plan file.
    pub fn plan_path(&self) -> PathBuf {
        self.root().join("git-rebase-todo")
    }

    /// Plan with stacked commands removed, as given to git.
    pub fn regular_plan_path(&self) -> PathBuf {
        self.root().join("git-rebase-todo.regular")
    }

    /// Rewrite-event log.
    pub fn rewritten_list_path(&self) -> PathBuf {
        self.root().join("rewritten-list")
    }

    /// Marker written when a finished rewrite has not reached the branches.
    pub fn needs_to_apply_path(&self) -> PathBuf {
        self.root().join("needs-to-apply")
    }

    /// Marker written after the branches were moved.
    pub fn applied_path(&self) -> PathBuf {
        self.root().join("applied")
    }

    /// Remembered initial branch.
    pub fn initial_branch_path(&self) -> PathBuf {
        self.root().join("initial-branch")
    }

    /// Present from the start of a rebase until it is applied.
    pub fn recording_path(&self) -> PathBuf {
        self.root().join("recording")
    }

    /// Repository configuration file.
    pub fn repo_config_path(&self) -> PathBuf {
        self.root().join("config.toml")
    }

    /// git's own rebase state directory, present while a rebase is stopped.
    pub fn git_rebase_merge_dir(&self) -> PathBuf {
        self.git_dir.join("rebase-merge")
    }

    /// Whether `path` lies inside the storage directory.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(self.root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_files_live_under_root() {
        let paths = RebasePaths::new(PathBuf::from("/repo/.git"));
        for path in [
            paths.plan_path(),
            paths.regular_plan_path(),
            paths.rewritten_list_path(),
            paths.needs_to_apply_path(),
            paths.applied_path(),
            paths.initial_branch_path(),
            paths.repo_config_path(),
        ] {
            assert!(paths.contains(&path), "{} escapes root", path.display());
        }
        assert!(!paths.contains(&paths.git_rebase_merge_dir()));
    }

    #[test]
    fn linked_worktree_uses_its_own_git_dir() {
        let info = RepoInfo {
            git_dir: PathBuf::from("/repo/.git/worktrees/wt"),
            common_dir: PathBuf::from("/repo/.git"),
            work_dir: PathBuf::from("/wt"),
        };
        let paths = RebasePaths::from_repo_info(&info);
        assert_eq!(
            paths.rewritten_list_path(),
            PathBuf::from("/repo/.git/worktrees/wt/stacked-rebase/rewritten-list")
        );
    }
}
