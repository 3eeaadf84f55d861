//! ui::prompts
//!
//! Interactive prompts and confirmations.
//!
//! # Design
//!
//! Prompts are only shown in interactive mode. In non-interactive mode,
//! operations requiring user input must either have defaults or fail
//! with a clear error message.

use dialoguer::Confirm;
use thiserror::Error;

use crate::core::todo::PlanValidationError;

/// Errors from prompts.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("not in interactive mode")]
    NotInteractive,

    #[error("failed to read confirmation: {0}")]
    Io(String),
}

/// Prompt for confirmation (yes/no).
///
/// Returns `Ok(true)` if the user confirms, `Ok(false)` if they decline.
/// Returns `Err(PromptError::NotInteractive)` if not in interactive mode.
pub fn confirm(message: &str, default: bool, interactive: bool) -> Result<bool, PromptError> {
    if !interactive {
        return Err(PromptError::NotInteractive);
    }
    Confirm::new()
        .with_prompt(message)
        .default(default)
        .interact()
        .map_err(|e| PromptError::Io(e.to_string()))
}

/// Print a rejected plan and ask whether to edit it again.
///
/// Used as the retry hook of the interactive plan editor; a failed prompt
/// counts as "no".
pub fn retry_plan_edit(error: &PlanValidationError) -> bool {
    super::output::error(error);
    confirm("Edit the plan again?", true, true).unwrap_or(false)
}
