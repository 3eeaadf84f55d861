//! git::process
//!
//! The few primitives that only the git CLI provides.
//!
//! The interactive rebase itself, `rebase --continue`/`--edit-todo`, push
//! and user-supplied exec commands run as child processes with inherited
//! stdio so editors, conflict messages and hooks reach the terminal.
//! Everything else goes through [`Git`](super::Git).

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use tracing::debug;

use super::GitError;
use crate::core::types::BranchName;

/// How a branch is pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushMode {
    /// Plain fast-forward push.
    Normal,
    /// `--force-with-lease`
    ForceWithLease,
    /// `--force`
    Force,
}

impl PushMode {
    /// Pick the mode from the `--force` flag and the lease setting.
    pub fn from_flags(force: bool, with_lease: bool) -> Self {
        match (force, with_lease) {
            (false, _) => PushMode::Normal,
            (true, true) => PushMode::ForceWithLease,
            (true, false) => PushMode::Force,
        }
    }

    fn flag(self) -> Option<&'static str> {
        match self {
            PushMode::Normal => None,
            PushMode::ForceWithLease => Some("--force-with-lease"),
            PushMode::Force => Some("--force"),
        }
    }
}

/// Runs git (and shell) commands in a working directory.
#[derive(Debug, Clone)]
pub struct GitProcess {
    work_dir: PathBuf,
}

impl GitProcess {
    /// Run commands from `work_dir`.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    /// The working directory commands run in.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Start `git rebase -i <onto>` with the todo list replaced by `todo`.
    ///
    /// Git's own autosquash is disabled; fixups have already been placed.
    /// A non-zero exit usually means the rebase stopped on a conflict, so
    /// callers check the repository state before treating it as fatal.
    pub fn rebase_interactive(&self, onto: &str, todo: &Path) -> Result<(), GitError> {
        let editor = format!("cp {}", shell_quote(&todo.to_string_lossy()));
        self.run_interactive(
            &["rebase", "--interactive", "--no-autosquash", onto],
            &[("GIT_SEQUENCE_EDITOR", editor.as_str())],
        )
    }

    /// `git rebase --continue`
    pub fn rebase_continue(&self) -> Result<(), GitError> {
        self.run_interactive(&["rebase", "--continue"], &[])
    }

    /// `git rebase --edit-todo`
    pub fn rebase_edit_todo(&self) -> Result<(), GitError> {
        self.run_interactive(&["rebase", "--edit-todo"], &[])
    }

    /// Push `branch` to the same name on `remote`.
    pub fn push(&self, remote: &str, branch: &BranchName, mode: PushMode) -> Result<(), GitError> {
        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
        let mut args = vec!["push"];
        if let Some(flag) = mode.flag() {
            args.push(flag);
        }
        args.push(remote);
        args.push(&refspec);
        self.run_captured(&args).map(drop)
    }

    /// Run `command` through `sh -c` in the working directory.
    pub fn exec_shell(&self, command: &str) -> Result<(), GitError> {
        debug!(command, "exec");
        let status = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.work_dir)
            .status()
            .map_err(|e| GitError::Spawn {
                command: format!("sh -c {command}"),
                message: e.to_string(),
            })?;
        check_status(status, command, String::new())
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    /// Run git with inherited stdio.
    fn run_interactive(&self, args: &[&str], envs: &[(&str, &str)]) -> Result<(), GitError> {
        debug!(args = ?args, "git");
        let status = Command::new("git")
            .args(args)
            .envs(envs.iter().map(|(k, v)| (OsStr::new(k), OsStr::new(v))))
            .current_dir(&self.work_dir)
            .status()
            .map_err(|e| spawn_error(args, e))?;
        check_status(status, &args.join(" "), String::new())
    }

    /// Run git and capture its stdout, keeping stderr for the error.
    fn run_captured(&self, args: &[&str]) -> Result<String, GitError> {
        debug!(args = ?args, "git");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.work_dir)
            .output()
            .map_err(|e| spawn_error(args, e))?;
        check_status(
            output.status,
            &args.join(" "),
            String::from_utf8_lossy(&output.stderr).into_owned(),
        )?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn spawn_error(args: &[&str], err: std::io::Error) -> GitError {
    GitError::Spawn {
        command: args.first().copied().unwrap_or_default().to_string(),
        message: err.to_string(),
    }
}

fn check_status(status: ExitStatus, command: &str, stderr: String) -> Result<(), GitError> {
    if status.success() {
        Ok(())
    } else {
        Err(GitError::ProcessFailed {
            command: command.to_string(),
            status: status.to_string(),
            stderr,
        })
    }
}

/// Quote `s` for POSIX `sh` as one word.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_mode_from_flags() {
        assert_eq!(PushMode::from_flags(false, true), PushMode::Normal);
        assert_eq!(PushMode::from_flags(true, true), PushMode::ForceWithLease);
        assert_eq!(PushMode::from_flags(true, false), PushMode::Force);
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("/tmp/plain"), "'/tmp/plain'");
        assert_eq!(shell_quote("/tmp/it's"), r"'/tmp/it'\''s'");
    }

    #[test]
    fn exec_reports_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let process = GitProcess::new(dir.path());
        process.exec_shell("true").unwrap();

        let err = process.exec_shell("exit 3").unwrap_err();
        match err {
            GitError::ProcessFailed { command, .. } => assert_eq!(command, "exit 3"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn exec_runs_in_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let process = GitProcess::new(dir.path());
        process.exec_shell("touch marker").unwrap();
        assert!(dir.path().join("marker").exists());
    }
}
