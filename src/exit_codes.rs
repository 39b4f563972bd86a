//! Exit code constants for the dirlock CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid config, refused clear)
//! - 2: Local process identity could not be determined
//! - 3: I/O failure creating the lock file
//! - 4: Lock failure (wait cancelled, directory missing)
//!
//! `dirlock hold` exits with the held command's own code when it fails.

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid config, or a refused operation.
pub const USER_ERROR: i32 = 1;

/// The local machine/user/session identity could not be resolved.
pub const IDENTITY_FAILURE: i32 = 2;

/// The lock file could not be created for a reason other than contention.
pub const IO_FAILURE: i32 = 3;

/// Lock acquisition failure: the wait was cancelled or the directory vanished.
pub const LOCK_FAILURE: i32 = 4;
