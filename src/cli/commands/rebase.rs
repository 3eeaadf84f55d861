//! rebase commands - start, continue, and inspect a stacked rebase

use anyhow::{Context as _, Result};

use super::Session;
use crate::engine::{self, Context, EngineError, Outcome};
use crate::ui::editor::ProcessEditor;
use crate::ui::output;
use crate::ui::prompts;

/// Compose and edit the plan, then run the rewrite.
///
/// # Arguments
///
/// * `ctx` - Execution context
/// * `initial` - Initial branch from the command line
/// * `autosquash` - Command-line override of the autosquash setting
pub fn rebase(ctx: &Context, initial: Option<&str>, autosquash: Option<bool>) -> Result<()> {
    let session = Session::open(ctx)?;
    let initial = session.initial(initial)?;
    let options = session.rebase_options(autosquash);

    let core_editor = session.git.config_string("core.editor")?;
    let mut editor = ProcessEditor::resolve(session.config.editor(), core_editor.as_deref());
    if session.interactive {
        editor = editor.with_retry(prompts::retry_plan_edit);
    }
    output::debug(
        format!("editing the plan with `{}`", editor.command()),
        session.verbosity,
    );

    let outcome = engine::start(
        &session.git,
        &session.process,
        &session.state,
        &initial,
        &mut editor,
        options,
    )?;
    report(&session, outcome)
}

/// Continue a paused stacked rebase.
pub fn continue_op(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx)?;
    let options = session.rebase_options(None);
    let outcome = engine::continue_rebase(&session.git, &session.process, &session.state, options)?;
    report(&session, outcome)
}

/// Open the paused rebase's todo in git's editor.
pub fn edit_todo(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx)?;
    if !session.git.state().is_rebase() {
        return Err(EngineError::NotRebasing.into());
    }
    session
        .process
        .rebase_edit_todo()
        .context("git rebase --edit-todo failed")?;
    Ok(())
}

/// Print the saved stacked plan.
pub fn view_todo(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx)?;
    let plan = session
        .state
        .read_plan()
        .map_err(EngineError::from)?
        .ok_or_else(|| EngineError::NoPlan(session.state.paths().plan_path()))?;
    print!("{}", plan);
    Ok(())
}

fn report(session: &Session, outcome: Outcome) -> Result<()> {
    let verbosity = session.verbosity;
    match outcome {
        Outcome::Paused(state) => {
            output::print(
                format!(
                    "Stopped during {}. Resolve, then run `git stacked-rebase --continue`.",
                    state
                ),
                verbosity,
            );
        }
        Outcome::Applied(report) => {
            output::success(output::format_apply(&report), verbosity);
            for warning in &report.warnings {
                output::warn(warning, verbosity);
            }
        }
        Outcome::NeedsApply => {
            let confirmed = session.interactive
                && prompts::confirm("Move the branches to the rewritten commits?", true, true)
                    .unwrap_or(false);
            if confirmed {
                let report = engine::apply(&session.git, &session.state, session.validate_options())?;
                output::success(output::format_apply(&report), verbosity);
                for warning in &report.warnings {
                    output::warn(warning, verbosity);
                }
            } else {
                output::print(
                    "Rewrite finished. Run `git stacked-rebase --apply` to move the branches.",
                    verbosity,
                );
            }
        }
    }
    Ok(())
}
