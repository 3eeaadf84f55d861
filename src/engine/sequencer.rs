//! engine::sequencer
//!
//! Visit every branch of the stack, run an action on it, and come back.
//!
//! # Invariants
//!
//! - HEAD after a run equals HEAD before it, on success, on collected
//!   failures and on cancellation.
//! - `is_latest` is computed from the position in the input list, so the
//!   latest branch is identified the same way in either direction.
//! - A failing step never stops the walk; failures are reported together
//!   once the original HEAD is back.

use std::fmt;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::cancel::{CancelToken, SignalScope};
use crate::core::boundary::Boundary;
use crate::core::types::{BranchName, BranchRef, Oid};
use crate::git::{GitError, Head, Vcs};

/// Run options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequencerOptions {
    /// Walk latest-first.
    pub reverse: bool,
}

/// What the sequencer checked out for a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckedOut {
    /// The branch already points at the boundary commit.
    Branch(BranchName),
    /// The branch lags behind its planned commit; HEAD is detached there.
    Detached(Oid),
}

/// One visit.
#[derive(Debug, Clone)]
pub struct SequencerStep<'a> {
    /// The boundary being visited
    pub boundary: &'a Boundary,
    /// Local name of the branch
    pub branch: BranchName,
    /// What HEAD is during the action
    pub checked_out: CheckedOut,
    /// Position in the input list
    pub index: usize,
    /// Whether this is the last boundary of the input list
    pub is_latest: bool,
}

/// A failed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepError {
    pub branch: BranchRef,
    pub message: String,
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.branch, self.message)
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerReport {
    /// Steps whose action ran
    pub visited: usize,
    /// HEAD restored at the end
    pub restored: Head,
}

/// Sequencer failures.
#[derive(Debug, Error)]
pub enum SequencerError {
    /// One or more steps failed; every other step still ran.
    #[error("{} branch(es) failed:\n{}", .0.len(), render_errors(.0))]
    Aggregate(Vec<StepError>),

    /// The run was interrupted after restoring HEAD.
    #[error("interrupted; restored {restored}")]
    Cancelled { restored: Head },

    /// HEAD could not be read before starting.
    #[error("failed to read HEAD: {0}")]
    Head(GitError),

    /// HEAD could not be restored.
    #[error("failed to restore {head}: {source}")]
    Restore {
        head: Head,
        source: GitError,
        /// Step failures collected before the restore attempt
        errors: Vec<StepError>,
    },

    /// Signal handlers could not be installed.
    #[error("failed to install signal handlers: {0}")]
    Signals(std::io::Error),
}

fn render_errors(errors: &[StepError]) -> String {
    errors
        .iter()
        .map(|e| format!("  {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Visit `boundaries` with SIGINT/SIGTERM routed to a fresh token for the
/// duration of the run.
pub fn run_with_signals<F>(
    vcs: &dyn Vcs,
    boundaries: &[Boundary],
    options: SequencerOptions,
    action: F,
) -> Result<SequencerReport, SequencerError>
where
    F: FnMut(&dyn Vcs, &SequencerStep<'_>) -> Result<(), String>,
{
    let token = CancelToken::new();
    let _scope = SignalScope::install(&token).map_err(SequencerError::Signals)?;
    run(vcs, boundaries, options, &token, action)
}

/// Visit `boundaries`, calling `action` on each.
///
/// `cancel` is polled before every checkout.
pub fn run<F>(
    vcs: &dyn Vcs,
    boundaries: &[Boundary],
    options: SequencerOptions,
    cancel: &CancelToken,
    mut action: F,
) -> Result<SequencerReport, SequencerError>
where
    F: FnMut(&dyn Vcs, &SequencerStep<'_>) -> Result<(), String>,
{
    let original = vcs.head().map_err(SequencerError::Head)?;
    let total = boundaries.len();
    let mut order: Vec<usize> = (0..total).collect();
    if options.reverse {
        order.reverse();
    }

    let mut errors = Vec::new();
    let mut visited = 0;
    for index in order {
        if cancel.is_cancelled() {
            break;
        }
        let boundary = &boundaries[index];
        let (branch, checked_out) = match check_out(vcs, boundary) {
            Ok(done) => done,
            Err(e) => {
                warn!(branch = %boundary.branch, error = %e, "checkout failed");
                errors.push(StepError {
                    branch: boundary.branch.clone(),
                    message: format!("checkout failed: {e}"),
                });
                continue;
            }
        };
        let step = SequencerStep {
            boundary,
            branch,
            checked_out,
            index,
            is_latest: index + 1 == total,
        };
        debug!(branch = %step.branch, index, is_latest = step.is_latest, "step");
        visited += 1;
        if let Err(message) = action(vcs, &step) {
            errors.push(StepError {
                branch: boundary.branch.clone(),
                message,
            });
        }
    }

    if let Err(source) = vcs.restore_head(&original) {
        return Err(SequencerError::Restore {
            head: original,
            source,
            errors,
        });
    }
    info!(head = %original, "restored");

    if cancel.is_cancelled() {
        return Err(SequencerError::Cancelled { restored: original });
    }
    if !errors.is_empty() {
        return Err(SequencerError::Aggregate(errors));
    }
    Ok(SequencerReport {
        visited,
        restored: original,
    })
}

fn check_out(vcs: &dyn Vcs, boundary: &Boundary) -> Result<(BranchName, CheckedOut), GitError> {
    let local = vcs.ensure_local_branch(&boundary.branch)?;
    if vcs.resolve_branch(&local)?.as_ref() == Some(&boundary.commit) {
        vcs.checkout_branch(&local)?;
        Ok((local.clone(), CheckedOut::Branch(local)))
    } else {
        vcs.checkout_detached(&boundary.commit)?;
        Ok((local, CheckedOut::Detached(boundary.commit.clone())))
    }
}
