//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--interactive` / `--no-interactive`: Control prompts
//! - `--quiet` / `-q`: Minimal output

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::Parser;

/// Stacked rebase for git: rewrite a stack of branches as one interactive rebase
#[derive(Parser, Debug)]
#[command(name = "git-stacked-rebase")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
WORKFLOW EXAMPLES:
    # Edit the plan for the stack between main and the current branch
    git stacked-rebase main

    # Continue after resolving a conflict
    git stacked-rebase --continue

    # Move the branches once the rewrite is done
    git stacked-rebase --apply

    # Force-push every branch of the stack
    git stacked-rebase --push --force

    # Run the tests on every branch, latest first
    git stacked-rebase --exec 'cargo test' --reverse")]
pub struct Cli {
    /// Branch the stack is rebased onto (default: configured or last used)
    pub initial: Option<String>,

    /// Move the branches to the commits a finished rewrite produced
    #[arg(short, long)]
    pub apply: bool,

    /// Continue a paused stacked rebase
    #[arg(
        short = 'c',
        long = "continue",
        conflicts_with_all = ["edit_todo", "view_todo", "list"]
    )]
    pub continue_rebase: bool,

    /// Push every branch of the stack
    #[arg(short, long)]
    pub push: bool,

    /// Force-push (with lease unless configured otherwise)
    #[arg(short, long, requires = "push")]
    pub force: bool,

    /// Run a shell command with each branch checked out
    #[arg(short = 'x', long, value_name = "CMD")]
    pub exec: Option<String>,

    /// Visit branches latest-first
    #[arg(long)]
    pub reverse: bool,

    /// Edit the todo of the paused rebase
    #[arg(short = 'e', long, conflicts_with_all = ["view_todo", "list"])]
    pub edit_todo: bool,

    /// Print the saved stacked plan
    #[arg(long, conflicts_with = "list")]
    pub view_todo: bool,

    /// List the branches of the stack
    #[arg(long)]
    pub list: bool,

    /// Print the listing as JSON
    #[arg(long, requires = "list")]
    pub json: bool,

    /// Move fixup!/squash! commits next to their targets
    #[arg(long, overrides_with = "no_autosquash")]
    pub autosquash: bool,

    /// Keep fixup!/squash! commits where they are
    #[arg(long, overrides_with = "autosquash")]
    pub no_autosquash: bool,

    /// Run as if started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output; implies --no-interactive
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable interactive prompts
    #[arg(long = "interactive", global = true, conflicts_with = "no_interactive")]
    pub interactive_flag: bool,

    /// Disable interactive prompts
    #[arg(long, global = true)]
    pub no_interactive: bool,
}

/// What one invocation does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// `--continue`
    Continue,
    /// `--edit-todo`
    EditTodo,
    /// `--view-todo`
    ViewTodo,
    /// `--list [--json]`
    List { json: bool },
    /// Any of `--apply`, `--push`, `--exec`, in that order.
    Branches {
        apply: bool,
        push: bool,
        force: bool,
        exec: Option<String>,
    },
    /// Start a stacked rebase.
    Rebase,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Determine if interactive mode is enabled.
    ///
    /// Returns true if:
    /// - `--interactive` was explicitly set, OR
    /// - Neither `--no-interactive` nor `--quiet` was set AND stdin is a TTY
    pub fn interactive(&self) -> bool {
        if self.interactive_flag {
            true
        } else if self.no_interactive || self.quiet {
            false
        } else {
            std::io::stdin().is_terminal()
        }
    }

    /// `Some` when autosquash was set on the command line.
    pub fn autosquash_flag(&self) -> Option<bool> {
        if self.no_autosquash {
            Some(false)
        } else if self.autosquash {
            Some(true)
        } else {
            None
        }
    }

    /// The action selected by the flags.
    pub fn action(&self) -> Action {
        if self.continue_rebase {
            Action::Continue
        } else if self.edit_todo {
            Action::EditTodo
        } else if self.view_todo {
            Action::ViewTodo
        } else if self.list {
            Action::List { json: self.json }
        } else if self.apply || self.push || self.exec.is_some() {
            Action::Branches {
                apply: self.apply,
                push: self.push,
                force: self.force,
                exec: self.exec.clone(),
            }
        } else {
            Action::Rebase
        }
    }
}
