//! engine::rebase
//!
//! Run the rewrite through `git rebase -i` and record what it did.
//!
//! Git is given the regular part of the plan. A `post-rewrite` hook appends
//! every rewrite event to `rewritten-list` while recording is on, which is
//! everything apply needs to move the branches afterwards.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::apply::{apply, ApplyReport};
use super::compose::{compose, ComposeOptions};
use super::EngineError;
use crate::core::state::RebaseState;
use crate::core::todo::to_regular;
use crate::core::types::BranchName;
use crate::git::{Git, GitError, GitProcess, GitState};
use crate::ui::editor::PlanEditor;

/// Marks a hook as ours; any other hook is left alone.
pub const HOOK_MARKER: &str = "installed by git-stacked-rebase";

const HOOK_SCRIPT: &str = r#"#!/bin/sh
# installed by git-stacked-rebase
dir="$(git rev-parse --git-dir)/stacked-rebase"
[ -f "$dir/recording" ] || exit 0
{ echo "$1"; cat; echo; } >> "$dir/rewritten-list"
"#;

/// Settings for a stacked rebase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebaseOptions {
    pub compose: ComposeOptions,
    /// Apply without asking once the rewrite finishes.
    pub auto_apply: bool,
}

/// Where a rebase invocation left things.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Git stopped (conflict, `edit`, `break`); continue later.
    Paused(GitState),
    /// The rewrite finished; the branches have not been moved.
    NeedsApply,
    /// The rewrite finished and the branches were moved.
    Applied(ApplyReport),
}

/// Start a stacked rebase of HEAD's stack onto `initial`.
pub fn start(
    git: &Git,
    process: &GitProcess,
    state: &RebaseState,
    initial: &BranchName,
    editor: &mut dyn PlanEditor,
    options: RebaseOptions,
) -> Result<Outcome, EngineError> {
    let git_state = git.state();
    if git_state.is_in_progress() {
        return Err(EngineError::InProgress(git_state));
    }
    let status = git.worktree_status()?;
    if !status.is_clean() {
        return Err(GitError::DirtyWorktree {
            details: status.to_string(),
        }
        .into());
    }
    if state.needs_to_apply()? {
        if !options.auto_apply {
            return Err(EngineError::PendingApply);
        }
        info!("applying the previous stacked rebase first");
        apply(git, state, options.compose.validate)?;
    }

    let composed = compose(git, state, initial, editor, options.compose)?;
    state.remember_initial(initial)?;
    let todo = state.write_regular_plan(&to_regular(&composed.instructions))?;

    state.reset_for_new_rebase()?;
    install_hook(git)?;
    state.start_recording()?;

    if let Err(e) = process.rebase_interactive(initial.as_str(), &todo) {
        // A stop on a conflict also exits non-zero.
        if !git.state().is_rebase() {
            return Err(e.into());
        }
    }
    finish(git, state, options)
}

/// `git rebase --continue`, then finish.
pub fn continue_rebase(
    git: &Git,
    process: &GitProcess,
    state: &RebaseState,
    options: RebaseOptions,
) -> Result<Outcome, EngineError> {
    if !git.state().is_rebase() {
        return Err(EngineError::NotRebasing);
    }
    if let Err(e) = process.rebase_continue() {
        if !git.state().is_rebase() {
            return Err(e.into());
        }
    }
    finish(git, state, options)
}

/// Record the end of a rewrite and apply it if configured to.
pub fn finish(
    git: &Git,
    state: &RebaseState,
    options: RebaseOptions,
) -> Result<Outcome, EngineError> {
    let git_state = git.state();
    if git_state.is_rebase() {
        debug!(state = %git_state, "rebase paused");
        return Ok(Outcome::Paused(git_state));
    }

    state.ensure_rewritten_list()?;
    state.mark_needs_to_apply()?;
    if options.auto_apply {
        let report = apply(git, state, options.compose.validate)?;
        return Ok(Outcome::Applied(report));
    }
    Ok(Outcome::NeedsApply)
}

/// Install the post-rewrite hook into the repository's hooks directory.
pub fn install_hook(git: &Git) -> Result<PathBuf, EngineError> {
    install_hook_in(&git.hooks_dir()?)
}

fn install_hook_in(dir: &Path) -> Result<PathBuf, EngineError> {
    let path = dir.join("post-rewrite");
    let hook_err = |source| EngineError::Hook {
        path: path.clone(),
        source,
    };

    match fs::read_to_string(&path) {
        Ok(existing) if !existing.contains(HOOK_MARKER) => {
            return Err(EngineError::ForeignHook(path.clone()));
        }
        Ok(existing) if existing == HOOK_SCRIPT => return Ok(path.clone()),
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(hook_err(e)),
    }

    fs::create_dir_all(dir).map_err(hook_err)?;
    fs::write(&path, HOOK_SCRIPT).map_err(hook_err)?;
    make_executable(&path).map_err(hook_err)?;
    debug!(path = %path.display(), "installed post-rewrite hook");
    Ok(path)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn installs_into_missing_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("hooks");
        let path = install_hook_in(&dir).unwrap();
        let script = fs::read_to_string(&path).unwrap();
        assert!(script.contains(HOOK_MARKER));
        assert!(script.starts_with("#!/bin/sh\n"));
    }

    #[cfg(unix)]
    #[test]
    fn hook_is_executable() {
        use std::os::unix::fs::PermissionsExt;
        let temp = TempDir::new().unwrap();
        let path = install_hook_in(temp.path()).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn our_old_hook_is_replaced() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("post-rewrite");
        fs::write(&path, format!("#!/bin/sh\n# {HOOK_MARKER}\nexit 0\n")).unwrap();
        install_hook_in(temp.path()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), HOOK_SCRIPT);
    }

    #[test]
    fn foreign_hook_is_refused() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("post-rewrite");
        fs::write(&path, "#!/bin/sh\necho mine\n").unwrap();
        let err = install_hook_in(temp.path()).unwrap_err();
        assert!(matches!(err, EngineError::ForeignHook(_)));
        assert_eq!(fs::read_to_string(&path).unwrap(), "#!/bin/sh\necho mine\n");
    }
}
