//! cli
//!
//! Command-line interface layer.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Set up logging
//! - Delegate to command handlers
//! - Map errors to exit codes
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to the
//! [`crate::engine`], which owns every repository mutation.

pub mod args;
pub mod commands;

pub use args::{Action, Cli};

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::engine::{self, EngineError, ErrorKind};

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "STACKED_REBASE_LOG";

/// Exit code for an interrupted run (128 + SIGINT).
pub const EXIT_CANCELLED: u8 = 130;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug);

    let ctx = engine::Context {
        cwd: cli.cwd.clone(),
        debug: cli.debug,
        quiet: cli.quiet,
        interactive: cli.interactive(),
    };

    commands::dispatch(&cli, &ctx)
}

/// Install the stderr subscriber. `--debug` raises the default level.
fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    // A second init (tests driving `run`) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Process exit code for an error returned by [`run`].
pub fn exit_code(err: &anyhow::Error) -> u8 {
    let cancelled = err.chain().any(|cause| {
        cause
            .downcast_ref::<EngineError>()
            .is_some_and(|e| e.kind() == ErrorKind::Cancelled)
    });
    if cancelled {
        EXIT_CANCELLED
    } else {
        1
    }
}
