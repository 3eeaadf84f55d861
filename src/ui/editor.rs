//! ui::editor
//!
//! Plan editing.
//!
//! # Design
//!
//! Composition only needs "let someone change this file". Interactive runs
//! open the user's editor and block until it exits; automated runs supply a
//! function that rewrites the text.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::debug;

use crate::core::todo::PlanValidationError;

/// Errors from editing a plan.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("failed to start editor '{command}': {source}")]
    Spawn { command: String, source: io::Error },

    #[error("editor '{command}' exited with {status}")]
    Failed { command: String, status: String },

    #[error("failed to access plan file {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

/// Something that edits the plan file in place.
pub trait PlanEditor {
    /// Edit `path` and return once the edit is complete.
    fn edit(&mut self, path: &Path) -> Result<(), EditorError>;

    /// Called with the full report after an edited plan failed to
    /// validate. Returning `true` opens the editor again.
    fn retry_after(&mut self, _error: &PlanValidationError) -> bool {
        false
    }
}

/// Runs an external editor command through `sh`.
#[derive(Debug, Clone)]
pub struct ProcessEditor {
    command: String,
    retry: Option<fn(&PlanValidationError) -> bool>,
}

impl ProcessEditor {
    /// Use `command` verbatim; it may contain arguments.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            retry: None,
        }
    }

    /// Pick the editor the way git does: configured value, then
    /// `GIT_EDITOR`, `core.editor`, `VISUAL`, `EDITOR`, and finally `vi`.
    pub fn resolve(configured: Option<&str>, core_editor: Option<&str>) -> Self {
        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        let command = configured
            .map(str::to_string)
            .or_else(|| env("GIT_EDITOR"))
            .or_else(|| core_editor.map(str::to_string))
            .or_else(|| env("VISUAL"))
            .or_else(|| env("EDITOR"))
            .unwrap_or_else(|| "vi".to_string());
        Self::new(command)
    }

    /// Ask `retry` whether to reopen the editor after a bad plan.
    pub fn with_retry(mut self, retry: fn(&PlanValidationError) -> bool) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl PlanEditor for ProcessEditor {
    fn edit(&mut self, path: &Path) -> Result<(), EditorError> {
        debug!(editor = %self.command, path = %path.display(), "opening editor");
        let status = Command::new("sh")
            .arg("-c")
            .arg(format!("{} \"$@\"", self.command))
            .arg("sh")
            .arg(path)
            .status()
            .map_err(|source| EditorError::Spawn {
                command: self.command.clone(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(EditorError::Failed {
                command: self.command.clone(),
                status: status.to_string(),
            })
        }
    }

    fn retry_after(&mut self, error: &PlanValidationError) -> bool {
        self.retry.map(|retry| retry(error)).unwrap_or(false)
    }
}

/// Edits the plan with a function, for non-interactive use.
pub struct FnEditor<F> {
    edit: F,
    max_attempts: usize,
    attempts: usize,
}

impl<F> FnEditor<F>
where
    F: FnMut(&str, usize) -> String,
{
    /// `edit` receives the current text and the attempt number (starting
    /// at 1) and returns the new text. One attempt unless configured.
    pub fn new(edit: F) -> Self {
        Self {
            edit,
            max_attempts: 1,
            attempts: 0,
        }
    }

    pub fn with_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// Leaves the plan untouched.
pub fn keep_plan() -> FnEditor<impl FnMut(&str, usize) -> String> {
    FnEditor::new(|text: &str, _| text.to_string())
}

impl<F> PlanEditor for FnEditor<F>
where
    F: FnMut(&str, usize) -> String,
{
    fn edit(&mut self, path: &Path) -> Result<(), EditorError> {
        let io_err = |source| EditorError::Io {
            path: path.to_path_buf(),
            source,
        };
        self.attempts += 1;
        let text = fs::read_to_string(path).map_err(io_err)?;
        let edited = (self.edit)(&text, self.attempts);
        fs::write(path, edited).map_err(io_err)
    }

    fn retry_after(&mut self, _error: &PlanValidationError) -> bool {
        self.attempts < self.max_attempts
    }
}
