//! core::state
//!
//! On-disk state under `<git-dir>/stacked-rebase/`.
//!
//! # Marker Files
//!
//! A finished rewrite leaves the event log (`rewritten-list`). Until the
//! branches are moved, the log differs from the `applied` marker:
//!
//! | log | applied | needs to apply |
//! |-----|---------|----------------|
//! | absent | any | no |
//! | present | absent | yes |
//! | present | equal to log | no |
//! | present | differs from log | yes |
//!
//! `needs-to-apply` holds a copy of the log taken when the rewrite finished;
//! it is advisory and only used for reporting. Markers are not locks.
//!
//! The post-rewrite hook only logs while `recording` exists, i.e. from the
//! start of a stacked rebase until it is applied, so unrelated amends later
//! on do not make the branches look stale.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::core::paths::RebasePaths;
use crate::core::types::BranchName;

/// Errors from reading or writing state files.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Access to the state directory.
#[derive(Debug, Clone)]
pub struct RebaseState {
    paths: RebasePaths,
}

impl RebaseState {
    pub fn new(paths: RebasePaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &RebasePaths {
        &self.paths
    }

    // =========================================================================
    // Plan files
    // =========================================================================

    /// The stacked plan, if one was written.
    pub fn read_plan(&self) -> Result<Option<String>, StateError> {
        read_optional(&self.paths.plan_path())
    }

    pub fn write_plan(&self, text: &str) -> Result<(), StateError> {
        write(&self.paths.plan_path(), text)
    }

    pub fn write_regular_plan(&self, text: &str) -> Result<PathBuf, StateError> {
        let path = self.paths.regular_plan_path();
        write(&path, text)?;
        Ok(path)
    }

    // =========================================================================
    // Rewrite log and markers
    // =========================================================================

    /// The rewrite-event log, if any rewrite was recorded.
    pub fn read_rewritten_list(&self) -> Result<Option<String>, StateError> {
        read_optional(&self.paths.rewritten_list_path())
    }

    /// Create an empty log when the rewrite recorded nothing.
    pub fn ensure_rewritten_list(&self) -> Result<(), StateError> {
        let path = self.paths.rewritten_list_path();
        if !path.exists() {
            write(&path, "")?;
        }
        Ok(())
    }

    /// Forget everything about the previous rewrite.
    pub fn reset_for_new_rebase(&self) -> Result<(), StateError> {
        for path in [
            self.paths.rewritten_list_path(),
            self.paths.needs_to_apply_path(),
            self.paths.applied_path(),
        ] {
            remove_optional(&path)?;
        }
        Ok(())
    }

    /// Let the post-rewrite hook log events.
    pub fn start_recording(&self) -> Result<(), StateError> {
        write(&self.paths.recording_path(), "")
    }

    pub fn is_recording(&self) -> bool {
        self.paths.recording_path().exists()
    }

    /// Record that the current log has not reached the branches.
    pub fn mark_needs_to_apply(&self) -> Result<(), StateError> {
        let log = self.read_rewritten_list()?.unwrap_or_default();
        write(&self.paths.needs_to_apply_path(), &log)
    }

    /// Record that the current log was applied.
    pub fn mark_applied(&self) -> Result<(), StateError> {
        let log = self.read_rewritten_list()?.unwrap_or_default();
        write(&self.paths.applied_path(), &log)?;
        remove_optional(&self.paths.needs_to_apply_path())?;
        remove_optional(&self.paths.recording_path())
    }

    /// Whether a finished rewrite still has to be applied to the branches.
    pub fn needs_to_apply(&self) -> Result<bool, StateError> {
        let Some(log) = self.read_rewritten_list()? else {
            return Ok(false);
        };
        let applied = read_optional(&self.paths.applied_path())?;
        let pending = applied.as_deref() != Some(log.as_str());
        debug!(pending, "needs-to-apply check");
        Ok(pending)
    }

    // =========================================================================
    // Initial branch
    // =========================================================================

    pub fn remember_initial(&self, branch: &BranchName) -> Result<(), StateError> {
        write(&self.paths.initial_branch_path(), &format!("{branch}\n"))
    }

    /// The last initial branch used, ignoring an unreadable or invalid file.
    pub fn remembered_initial(&self) -> Option<BranchName> {
        read_optional(&self.paths.initial_branch_path())
            .ok()
            .flatten()
            .and_then(|s| BranchName::new(s.trim()).ok())
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, StateError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StateError::Read {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn write(path: &Path, contents: &str) -> Result<(), StateError> {
    let err = |source| StateError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(err)?;
    }
    fs::write(path, contents).map_err(err)
}

fn remove_optional(path: &Path) -> Result<(), StateError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StateError::Write {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
