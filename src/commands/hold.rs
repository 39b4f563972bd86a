//! Running a command under a directory lock.

use crate::cli::HoldArgs;
use dirlock::error::{LockError, Result};
use dirlock::{Config, LockRegistry, LogObserver};
use log::info;
use std::process::Command;

/// Split a command line into argv without invoking a shell.
pub fn split_command(command: &str) -> Result<Vec<String>> {
    let argv = shell_words::split(command).map_err(|e| {
        LockError::User(format!(
            "failed to parse command '{}': {}\n\n\
             Fix: check for unmatched quotes or invalid escape sequences.",
            command, e
        ))
    })?;

    if argv.is_empty() {
        return Err(LockError::User(
            "command is empty after parsing.\n\n\
             Fix: pass the program to run, e.g. `dirlock hold <DIR> \"make all\"`."
                .to_string(),
        ));
    }

    Ok(argv)
}

/// Lock `args.dir`, run the command and release the lock once it exits.
pub fn cmd_hold(config: Config, args: HoldArgs) -> Result<()> {
    let argv = split_command(&args.command)?;

    let registry = LockRegistry::with_system_probe(config)?;
    let lock = registry.acquire(&args.dir, &mut LogObserver)?;
    info!("running '{}' under lock on '{}'", args.command, args.dir.display());

    let status = Command::new(&argv[0])
        .args(&argv[1..])
        .status()
        .map_err(|e| {
            LockError::User(format!(
                "failed to execute '{}': {}\n\n\
                 Fix: ensure the command is installed and in PATH.",
                argv[0], e
            ))
        });

    registry.release(lock);

    let status = status?;
    if status.success() {
        Ok(())
    } else {
        Err(LockError::ChildFailed(status.code().unwrap_or(-1)))
    }
}
