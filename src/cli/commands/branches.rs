//! branch commands - apply, push, exec, and list over the stack's branches

use anyhow::{Context as _, Result};

use super::Session;
use crate::engine::actions::{exec_all, push_all};
use crate::engine::{self, Context, EngineError, SequencerOptions, Strategy};
use crate::git::PushMode;
use crate::ui::output;

/// Which branch actions to run, in field order.
#[derive(Debug, Clone, Default)]
pub struct BranchActions {
    pub apply: bool,
    pub push: bool,
    pub force: bool,
    pub exec: Option<String>,
    pub reverse: bool,
}

/// Apply a finished rewrite, then push, then exec, as requested.
pub fn branches(ctx: &Context, initial: Option<&str>, actions: BranchActions) -> Result<()> {
    let session = Session::open(ctx)?;
    let verbosity = session.verbosity;
    let options = session.validate_options();

    if actions.apply {
        let report = engine::apply(&session.git, &session.state, options)?;
        output::success(output::format_apply(&report), verbosity);
        for warning in &report.warnings {
            output::warn(warning, verbosity);
        }
    }

    if !actions.push && actions.exec.is_none() {
        return Ok(());
    }
    let initial = session.initial(initial)?;
    let sequencer = SequencerOptions {
        reverse: actions.reverse,
    };

    if actions.push {
        // Pushing the old commits of a rewritten stack would publish stale work.
        if session.state.needs_to_apply().map_err(EngineError::from)? {
            return Err(EngineError::PendingApply.into());
        }
        let resolved = engine::resolve(
            &session.git,
            &session.state,
            &initial,
            Strategy::FreshWalk,
            options,
        )?;
        let remote = session.config.remote();
        let mode = PushMode::from_flags(actions.force, session.config.force_with_lease());
        let report = push_all(
            &session.git,
            &session.process,
            &resolved.boundaries,
            remote,
            mode,
            sequencer,
        )
        .map_err(EngineError::from)
        .context("push failed")?;
        output::success(
            format!("Pushed {} branch(es) to {}", report.visited, remote),
            verbosity,
        );
    }

    if let Some(command) = actions.exec.as_deref() {
        let resolved = engine::resolve(
            &session.git,
            &session.state,
            &initial,
            Strategy::Adaptive,
            options,
        )?;
        for warning in &resolved.warnings {
            output::warn(warning, verbosity);
        }
        let report = exec_all(
            &session.git,
            &session.process,
            &resolved.boundaries,
            command,
            sequencer,
        )
        .map_err(EngineError::from)
        .context("exec failed")?;
        output::success(
            format!("Ran `{}` on {} branch(es)", command, report.visited),
            verbosity,
        );
    }

    Ok(())
}

/// Print the stack's branches, oldest first.
pub fn list(ctx: &Context, initial: Option<&str>, json: bool) -> Result<()> {
    let session = Session::open(ctx)?;
    let initial = session.initial(initial)?;
    let resolved = engine::resolve(
        &session.git,
        &session.state,
        &initial,
        Strategy::Adaptive,
        session.validate_options(),
    )?;

    if json {
        let text =
            serde_json::to_string_pretty(&resolved).context("Failed to serialize listing")?;
        println!("{}", text);
    } else {
        for warning in &resolved.warnings {
            output::warn(warning, session.verbosity);
        }
        if !resolved.boundaries.is_empty() {
            println!("{}", output::format_resolved(&resolved));
        }
    }
    Ok(())
}
