//! engine::compose
//!
//! Build the plan, let the user edit it, and validate the result.

use tracing::{debug, warn};

use super::EngineError;
use crate::core::autosquash;
use crate::core::boundary::{extract_from_head, Stack};
use crate::core::state::RebaseState;
use crate::core::todo::{parse_plan_text, render_plan, validate, Instruction, ValidateOptions};
use crate::core::types::BranchName;
use crate::git::Vcs;
use crate::ui::editor::PlanEditor;

/// Composition settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComposeOptions {
    /// Move fixup!/squash! commits next to their targets first.
    pub autosquash: bool,
    pub validate: ValidateOptions,
}

/// An edited and validated plan.
#[derive(Debug, Clone)]
pub struct Composed {
    /// The stack the plan was generated from
    pub stack: Stack,
    /// The plan as saved by the user
    pub instructions: Vec<Instruction>,
}

/// Extract the stack, write its plan and run the edit-validate loop.
///
/// A plan that fails validation is handed back to the editor as long as
/// [`PlanEditor::retry_after`] asks for it; otherwise the full report is
/// returned as the error.
pub fn compose(
    vcs: &dyn Vcs,
    state: &RebaseState,
    initial: &BranchName,
    editor: &mut dyn PlanEditor,
    options: ComposeOptions,
) -> Result<Composed, EngineError> {
    let mut stack = extract_from_head(vcs, initial)?;
    if options.autosquash {
        stack = autosquash::reorder(vcs, stack)?;
    }
    state.write_plan(&render_plan(&stack))?;
    let path = state.paths().plan_path();

    loop {
        editor.edit(&path)?;
        let text = state.read_plan()?.unwrap_or_default();
        match validate(&parse_plan_text(&text), options.validate) {
            Ok(instructions) => {
                debug!(lines = instructions.len(), "plan accepted");
                return Ok(Composed {
                    stack,
                    instructions,
                });
            }
            Err(e) => {
                warn!(bad_lines = e.bad_lines().len(), "plan rejected");
                if !editor.retry_after(&e) {
                    return Err(e.into());
                }
            }
        }
    }
}
