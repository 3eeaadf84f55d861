//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each handler:
//! 1. Opens a [`Session`] (repository, state directory, merged config)
//! 2. Calls the engine to do the work
//! 3. Formats and displays the result
//!
//! Handlers do NOT perform repository mutations directly.

mod branches;
mod rebase;

pub use branches::{branches, list, BranchActions};
pub use rebase::{continue_op, edit_todo, rebase, view_todo};

use anyhow::{Context as _, Result};

use crate::cli::args::{Action, Cli};
use crate::core::config::{Config, GitConfigDefaults};
use crate::core::paths::RebasePaths;
use crate::core::state::RebaseState;
use crate::core::todo::ValidateOptions;
use crate::core::types::BranchName;
use crate::engine::{ComposeOptions, Context, EngineError, RebaseOptions};
use crate::git::{Git, GitProcess};
use crate::ui::output::{self, Verbosity};

/// Dispatch the parsed command line to its handler.
pub fn dispatch(cli: &Cli, ctx: &Context) -> Result<()> {
    let initial = cli.initial.as_deref();
    match cli.action() {
        Action::Continue => continue_op(ctx),
        Action::EditTodo => edit_todo(ctx),
        Action::ViewTodo => view_todo(ctx),
        Action::List { json } => list(ctx, initial, json),
        Action::Branches {
            apply,
            push,
            force,
            exec,
        } => branches(
            ctx,
            initial,
            branches::BranchActions {
                apply,
                push,
                force,
                exec,
                reverse: cli.reverse,
            },
        ),
        Action::Rebase => rebase(ctx, initial, cli.autosquash_flag()),
    }
}

/// Everything a handler needs from the repository it runs in.
pub(crate) struct Session {
    pub git: Git,
    pub process: GitProcess,
    pub state: RebaseState,
    pub config: Config,
    pub verbosity: Verbosity,
    pub interactive: bool,
}

impl Session {
    /// Open the repository around `ctx`'s working directory and load config.
    pub fn open(ctx: &Context) -> Result<Self> {
        let cwd = ctx
            .work_dir()
            .context("Failed to determine working directory")?;
        let git = Git::open(&cwd).context("Failed to open repository")?;
        let info = git.info().context("Failed to read repository layout")?;
        let paths = RebasePaths::from_repo_info(&info);
        let verbosity = Verbosity::from_flags(ctx.quiet, ctx.debug);

        let loaded = Config::load(Some(&paths)).map_err(EngineError::from)?;
        for warning in &loaded.warnings {
            output::warn(
                format!("{}: {}", warning.path.display(), warning.message),
                verbosity,
            );
        }
        let defaults = GitConfigDefaults {
            auto_apply: git.config_bool("stackedrebase.autoApplyIfNeeded")?,
            autosquash: match git.config_bool("stackedrebase.autoSquash")? {
                Some(v) => Some(v),
                None => git.config_bool("rebase.autoSquash")?,
            },
        };
        let config = loaded.config.with_git_defaults(defaults);
        for (scope, path) in [
            ("global", config.global_config_loaded_from()),
            ("repo", config.repo_config_loaded_from()),
        ] {
            if let Some(path) = path {
                output::debug(format!("{} config: {}", scope, path.display()), verbosity);
            }
        }
        let interactive = ctx.interactive && config.interactive();

        Ok(Self {
            process: GitProcess::new(info.work_dir),
            state: RebaseState::new(paths),
            git,
            config,
            verbosity,
            interactive,
        })
    }

    /// Initial branch: command line, then repo config, then the last one used.
    pub fn initial(&self, arg: Option<&str>) -> Result<BranchName> {
        if let Some(name) = arg.or(self.config.initial_branch()) {
            return BranchName::new(name)
                .with_context(|| format!("Invalid initial branch '{}'", name));
        }
        self.state
            .remembered_initial()
            .ok_or_else(|| EngineError::NoInitialBranch.into())
    }

    pub fn validate_options(&self) -> ValidateOptions {
        ValidateOptions {
            branch_name_max_len: self.config.branch_name_max_len(),
        }
    }

    /// Rebase settings with an optional command-line autosquash override.
    pub fn rebase_options(&self, autosquash: Option<bool>) -> RebaseOptions {
        RebaseOptions {
            compose: ComposeOptions {
                autosquash: autosquash.unwrap_or_else(|| self.config.autosquash()),
                validate: self.validate_options(),
            },
            auto_apply: self.config.auto_apply(),
        }
    }
}
