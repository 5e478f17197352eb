//! Provides the main entry point to the program.
use human_panic::setup_panic;
use staffplan::cli::run_cli;
use staffplan::error::ExitStatus;
use staffplan::log::is_logger_initialised;
use std::process::ExitCode;

fn main() -> ExitCode {
    setup_panic!();

    let Err(err) = run_cli() else {
        return ExitStatus::Success.into();
    };

    // Use the logger if it has been set up, so the error also ends up in the log file
    if is_logger_initialised() {
        log::error!("{err:?}");
    } else {
        eprintln!("Error: {err:?}");
    }

    ExitStatus::from_error(&err).into()
}
