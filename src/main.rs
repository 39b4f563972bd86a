//! Dirlock: advisory cross-process directory locks.
//!
//! This is the main entry point for the `dirlock` CLI. It sets up logging,
//! parses arguments, dispatches to the appropriate command handler, and
//! handles errors with proper exit codes.

mod cli;
mod commands;

use cli::Cli;
use dirlock::exit_codes;
use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    let env = env_logger::Env::default()
        .filter_or("DIRLOCK_LOG", "warn")
        .write_style_or("DIRLOCK_LOG_STYLE", "auto");
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .format_target(false)
        .format_module_path(false)
        .init();

    let cli = Cli::parse_args();

    match commands::dispatch(cli) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            _ = writeln!(io::stderr(), "Error: {}", err);

            ExitCode::from(err.exit_code() as u8)
        }
    }
}
