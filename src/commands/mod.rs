//! Command implementations for dirlock.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations.

mod hold;

use crate::cli::{ClearArgs, Cli, Command, InspectArgs};
use dirlock::error::{LockError, Result};
use dirlock::{Config, SystemProbe, clear_lock, inspect_lock};
use log::debug;
use std::path::Path;

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    debug!("using config: {:?}", config);

    match cli.command {
        Command::Hold(args) => hold::cmd_hold(config, args),
        Command::Inspect(args) => cmd_inspect(&config, args),
        Command::Clear(args) => cmd_clear(&config, args),
    }
}

/// Load the config file if one was given, otherwise use the defaults.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Ok(Config::default()),
    }
}

fn cmd_inspect(config: &Config, args: InspectArgs) -> Result<()> {
    let info = inspect_lock(&args.dir, config, &SystemProbe)?;

    if args.json {
        let json = serde_json::to_string_pretty(&info)
            .map_err(|e| LockError::User(format!("failed to serialize lock info: {}", e)))?;
        println!("{}", json);
        return Ok(());
    }

    match info {
        Some(info) => println!("{}", info),
        None => println!("No lock on {}", args.dir.display()),
    }
    Ok(())
}

fn cmd_clear(config: &Config, args: ClearArgs) -> Result<()> {
    let cleared = clear_lock(&args.dir, config, &SystemProbe, args.force)?;

    println!("Cleared lock: {}", cleared.path.display());
    println!();
    println!("{}", cleared);
    Ok(())
}
