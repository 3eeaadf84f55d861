//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$STACKED_REBASE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/stacked-rebase/config.toml`
//! 3. `~/.stacked-rebase/config.toml` (canonical write location)
//!
//! # Repo Config
//!
//! Located at `<git-dir>/stacked-rebase/config.toml`.
//!
//! # Validation
//!
//! Values are validated after parsing (e.g., `initial_branch` must be a
//! valid branch name, `branch_name_max_len` must be positive).

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::BranchName;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// interactive = true
/// auto_apply = false
/// autosquash = true
/// editor = "vim"
/// remote = "origin"
/// force_with_lease = true
/// branch_name_max_len = 128
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Prompt and open editors
    pub interactive: Option<bool>,

    /// Apply a finished rewrite to the branches without asking
    pub auto_apply: Option<bool>,

    /// Reorder fixup!/squash! commits when composing the plan
    pub autosquash: Option<bool>,

    /// Editor command for the plan
    pub editor: Option<String>,

    /// Remote to push to
    pub remote: Option<String>,

    /// Use --force-with-lease instead of --force
    pub force_with_lease: Option<bool>,

    /// Upper bound on branch names written into a plan
    pub branch_name_max_len: Option<usize>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_common(
            self.editor.as_deref(),
            self.remote.as_deref(),
            self.branch_name_max_len,
        )
    }
}

/// Repository configuration.
///
/// # Example
///
/// ```toml
/// initial_branch = "main"
/// remote = "upstream"
/// auto_apply = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// Branch the stack is rebased onto when none is given
    pub initial_branch: Option<String>,

    /// Prompt and open editors
    pub interactive: Option<bool>,

    /// Apply a finished rewrite to the branches without asking
    pub auto_apply: Option<bool>,

    /// Reorder fixup!/squash! commits when composing the plan
    pub autosquash: Option<bool>,

    /// Editor command for the plan
    pub editor: Option<String>,

    /// Remote to push to
    pub remote: Option<String>,

    /// Use --force-with-lease instead of --force
    pub force_with_lease: Option<bool>,

    /// Upper bound on branch names written into a plan
    pub branch_name_max_len: Option<usize>,
}

impl RepoConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(initial) = &self.initial_branch {
            BranchName::new(initial).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid initial branch name: {}", e))
            })?;
        }
        validate_common(
            self.editor.as_deref(),
            self.remote.as_deref(),
            self.branch_name_max_len,
        )
    }
}

fn validate_common(
    editor: Option<&str>,
    remote: Option<&str>,
    max_len: Option<usize>,
) -> Result<(), ConfigError> {
    if let Some(editor) = editor {
        if editor.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "editor cannot be empty".to_string(),
            ));
        }
    }

    if let Some(remote) = remote {
        if remote.is_empty() || remote.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidValue(format!(
                "invalid remote name '{}'",
                remote
            )));
        }
    }

    if max_len == Some(0) {
        return Err(ConfigError::InvalidValue(
            "branch_name_max_len must be at least 1".to_string(),
        ));
    }

    Ok(())
}
