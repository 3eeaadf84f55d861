//! git-stacked-rebase binary entry point.

use std::process::ExitCode;

use stacked_rebase::cli;
use stacked_rebase::ui::output;

fn main() -> ExitCode {
    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::error(format!("{:#}", err));
            ExitCode::from(cli::exit_code(&err))
        }
    }
}
