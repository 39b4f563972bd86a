//! CLI argument parsing for dirlock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Dirlock: advisory cross-process directory locks.
///
/// A directory is locked by exclusively creating a lock file inside it.
/// Other dirlock processes wait until it is released, or reclaim it once
/// its owner is gone or its heartbeat has stopped.
#[derive(Parser, Debug)]
#[command(name = "dirlock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// YAML config file overriding the lock file name and timings.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for dirlock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command while holding the lock on a directory.
    ///
    /// Blocks until the lock is acquired, runs the command without a shell
    /// and releases the lock when it exits. The command's exit code is
    /// propagated.
    Hold(HoldArgs),

    /// Show who holds the lock on a directory.
    Inspect(InspectArgs),

    /// Remove the lock file of a directory.
    ///
    /// Refuses unless the owner is known to be gone, or --force is given.
    Clear(ClearArgs),
}

/// Arguments for the `hold` command.
#[derive(Args, Debug)]
pub struct HoldArgs {
    /// Directory to lock.
    pub dir: PathBuf,

    /// Command line to run under the lock, split like a POSIX shell would.
    pub command: String,
}

/// Arguments for the `inspect` command.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Directory whose lock should be shown.
    pub dir: PathBuf,

    /// Print the lock as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `clear` command.
#[derive(Args, Debug)]
pub struct ClearArgs {
    /// Directory whose lock should be removed.
    pub dir: PathBuf,

    /// Remove the lock even if its owner may still be running.
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_debug_assert() {
        // Verifies the CLI arguments configuration is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_hold() {
        let cli = Cli::try_parse_from(["dirlock", "hold", "/srv/share", "make -j4 'all targets'"])
            .unwrap();
        assert!(cli.config.is_none());
        if let Command::Hold(args) = cli.command {
            assert_eq!(args.dir, PathBuf::from("/srv/share"));
            assert_eq!(args.command, "make -j4 'all targets'");
        } else {
            panic!("Expected Hold command");
        }
    }

    #[test]
    fn parse_hold_requires_command() {
        assert!(Cli::try_parse_from(["dirlock", "hold", "/srv/share"]).is_err());
    }

    #[test]
    fn parse_inspect_json() {
        let cli = Cli::try_parse_from(["dirlock", "inspect", "/srv/share", "--json"]).unwrap();
        if let Command::Inspect(args) = cli.command {
            assert_eq!(args.dir, PathBuf::from("/srv/share"));
            assert!(args.json);
        } else {
            panic!("Expected Inspect command");
        }
    }

    #[test]
    fn parse_clear_defaults_to_no_force() {
        let cli = Cli::try_parse_from(["dirlock", "clear", "/srv/share"]).unwrap();
        if let Command::Clear(args) = cli.command {
            assert!(!args.force);
        } else {
            panic!("Expected Clear command");
        }
    }

    #[test]
    fn parse_clear_force() {
        let cli = Cli::try_parse_from(["dirlock", "clear", "/srv/share", "--force"]).unwrap();
        if let Command::Clear(args) = cli.command {
            assert_eq!(args.dir, PathBuf::from("/srv/share"));
            assert!(args.force);
        } else {
            panic!("Expected Clear command");
        }
    }

    #[test]
    fn parse_global_config_after_subcommand() {
        let cli = Cli::try_parse_from([
            "dirlock",
            "inspect",
            "/srv/share",
            "--config",
            "/etc/dirlock.yaml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/dirlock.yaml")));
    }
}
