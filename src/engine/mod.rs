//! engine
//!
//! Drives a stacked rebase from plan composition to moved branches.
//!
//! # Lifecycle
//!
//! ```text
//! compose (extract -> autosquash -> render -> edit -> validate)
//!   -> rebase (regular todo, post-rewrite hook, git rebase -i)
//!   -> finish (needs-to-apply marker)
//!   -> apply (reconcile -> rederive -> move branches -> applied marker)
//! ```
//!
//! The [`sequencer`] walks the resulting branches for push, exec and list,
//! using one of the [`resolve`] strategies to decide where they are.
//!
//! # Errors
//!
//! Every failure is an [`EngineError`]. [`EngineError::kind`] sorts them
//! into the categories the CLI reports differently; formatting happens only
//! at the CLI.

pub mod actions;
pub mod apply;
pub mod cancel;
pub mod compose;
pub mod rebase;
pub mod resolve;
pub mod sequencer;

pub use apply::{apply, ApplyReport, BranchMove};
pub use cancel::{CancelToken, SignalScope};
pub use compose::{compose, ComposeOptions, Composed};
pub use rebase::{continue_rebase, finish, start, Outcome, RebaseOptions};
pub use resolve::{resolve, Resolved, Source, Strategy};
pub use sequencer::{SequencerError, SequencerOptions, SequencerReport, SequencerStep, StepError};

use std::path::PathBuf;

use thiserror::Error;

use crate::core::autosquash::AutosquashError;
use crate::core::boundary::BoundaryError;
use crate::core::config::ConfigError;
use crate::core::rewrite::RewriteError;
use crate::core::state::StateError;
use crate::core::todo::PlanValidationError;
use crate::git::{GitError, GitState};
use crate::ui::editor::EditorError;

/// Execution context for commands.
///
/// Contains global settings derived from CLI flags.
#[derive(Debug, Clone)]
pub struct Context {
    /// Working directory override.
    pub cwd: Option<PathBuf>,
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
    /// Interactive mode enabled.
    pub interactive: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            cwd: None,
            debug: false,
            quiet: false,
            interactive: true,
        }
    }
}

impl Context {
    /// The directory to open the repository from.
    pub fn work_dir(&self) -> std::io::Result<PathBuf> {
        match &self.cwd {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir(),
        }
    }
}

/// How an error should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The user can fix the input and rerun.
    UserInput,
    /// History or the rewrite log breaks an invariant.
    Structural,
    /// Several per-branch actions failed.
    Aggregate,
    /// The operator interrupted the run.
    Cancelled,
    /// Git, the filesystem or a child process failed.
    Environment,
}

/// Errors from engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Plan(#[from] PlanValidationError),

    #[error(transparent)]
    Boundary(#[from] BoundaryError),

    #[error(transparent)]
    Autosquash(#[from] AutosquashError),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error(transparent)]
    Sequencer(#[from] SequencerError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Editor(#[from] EditorError),

    /// Another git operation is running.
    #[error("a {0} is in progress; finish it first (or use --continue)")]
    InProgress(GitState),

    /// `--continue` without a rebase to continue.
    #[error("no rebase in progress")]
    NotRebasing,

    /// The previous rewrite has not been applied.
    #[error("the previous stacked rebase has not been applied to the branches; run with --apply first")]
    PendingApply,

    /// Apply without a plan.
    #[error("no stacked plan at {0}")]
    NoPlan(PathBuf),

    /// Apply without a rewrite log.
    #[error("no rewrite log at {0}; nothing to apply")]
    NoRewriteLog(PathBuf),

    /// A post-rewrite hook we did not write is in the way.
    #[error("{0} exists and was not installed by git-stacked-rebase; remove it or chain it by hand")]
    ForeignHook(PathBuf),

    /// The hook could not be written.
    #[error("failed to install {path}: {source}")]
    Hook {
        path: PathBuf,
        source: std::io::Error,
    },

    /// No initial branch on the command line or in any configuration.
    #[error("no initial branch given and none configured or remembered")]
    NoInitialBranch,
}

impl EngineError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Plan(_)
            | EngineError::Git(GitError::DirtyWorktree { .. })
            | EngineError::Config(_)
            | EngineError::InProgress(_)
            | EngineError::NotRebasing
            | EngineError::PendingApply
            | EngineError::NoPlan(_)
            | EngineError::ForeignHook(_)
            | EngineError::NoInitialBranch => ErrorKind::UserInput,

            EngineError::Boundary(e) => match e {
                BoundaryError::DetachedHead(_)
                | BoundaryError::UnknownInitial(_)
                | BoundaryError::InitialNotCommit { .. } => ErrorKind::UserInput,
                BoundaryError::Git(_) => ErrorKind::Environment,
                BoundaryError::NoCommonAncestor { .. }
                | BoundaryError::BaseNotOnFirstParent { .. } => ErrorKind::Structural,
            },

            EngineError::Autosquash(AutosquashError::Git(_)) => ErrorKind::Environment,
            EngineError::Autosquash(_) | EngineError::Rewrite(_) => ErrorKind::Structural,

            EngineError::Sequencer(e) => match e {
                SequencerError::Aggregate(_) => ErrorKind::Aggregate,
                SequencerError::Cancelled { .. } => ErrorKind::Cancelled,
                _ => ErrorKind::Environment,
            },

            EngineError::State(_)
            | EngineError::Git(_)
            | EngineError::Editor(_)
            | EngineError::NoRewriteLog(_)
            | EngineError::Hook { .. } => ErrorKind::Environment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod context {
        use super::*;

        #[test]
        fn default_values() {
            let ctx = Context::default();
            assert!(ctx.cwd.is_none());
            assert!(!ctx.debug);
            assert!(!ctx.quiet);
            assert!(ctx.interactive);
        }

        #[test]
        fn explicit_cwd_is_used() {
            let ctx = Context {
                cwd: Some(PathBuf::from("/custom")),
                ..Context::default()
            };
            assert_eq!(ctx.work_dir().unwrap(), PathBuf::from("/custom"));
        }
    }

    mod engine_error {
        use super::*;
        use crate::core::types::{BranchName, Oid};
        use crate::git::Head;

        #[test]
        fn classification() {
            assert_eq!(
                EngineError::from(PlanValidationError::Empty).kind(),
                ErrorKind::UserInput
            );
            let oid = Oid::new("a".repeat(40)).unwrap();
            assert_eq!(
                EngineError::from(RewriteError::Cycle(oid)).kind(),
                ErrorKind::Structural
            );
            assert_eq!(
                EngineError::from(SequencerError::Aggregate(vec![])).kind(),
                ErrorKind::Aggregate
            );
            let restored = Head::Branch(BranchName::new("main").unwrap());
            assert_eq!(
                EngineError::from(SequencerError::Cancelled { restored }).kind(),
                ErrorKind::Cancelled
            );
            assert_eq!(
                EngineError::from(GitError::BareRepo).kind(),
                ErrorKind::Environment
            );
        }

        #[test]
        fn plan_errors_keep_their_report() {
            let err = EngineError::from(PlanValidationError::Empty);
            assert!(err.to_string().contains("branch-end-initial"));
        }
    }
}
