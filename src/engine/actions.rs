//! engine::actions
//!
//! Per-branch actions run through the sequencer.

use tracing::info;

use super::sequencer::{self, SequencerError, SequencerOptions, SequencerReport};
use crate::core::boundary::Boundary;
use crate::git::{GitProcess, PushMode, Vcs};

/// Push every branch to `remote`. Rejected pushes are collected.
pub fn push_all(
    vcs: &dyn Vcs,
    process: &GitProcess,
    boundaries: &[Boundary],
    remote: &str,
    mode: PushMode,
    options: SequencerOptions,
) -> Result<SequencerReport, SequencerError> {
    sequencer::run_with_signals(vcs, boundaries, options, |_, step| {
        info!(branch = %step.branch, remote, ?mode, "push");
        process
            .push(remote, &step.branch, mode)
            .map_err(|e| e.to_string())
    })
}

/// Run `command` with each branch checked out. Non-zero exits are collected.
pub fn exec_all(
    vcs: &dyn Vcs,
    process: &GitProcess,
    boundaries: &[Boundary],
    command: &str,
    options: SequencerOptions,
) -> Result<SequencerReport, SequencerError> {
    sequencer::run_with_signals(vcs, boundaries, options, |_, step| {
        info!(branch = %step.branch, command, "exec");
        process.exec_shell(command).map_err(|e| e.to_string())
    })
}
