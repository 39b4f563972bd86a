//! Error types for dirlock.
//!
//! Uses thiserror for derive macros. Only identity resolution and the initial
//! "can I get a lock at all" path produce hard errors; heartbeats, deletes and
//! privilege elevation degrade silently because the protocol heals itself via
//! the abandonment timeout.

use crate::exit_codes;
use std::path::PathBuf;
use thiserror::Error;

/// The local process identity (or another process's session) could not be
/// determined.
#[derive(Error, Debug)]
pub enum IdentityError {
    /// The host name could not be read.
    #[error("failed to determine machine name: {0}")]
    MachineName(#[source] std::io::Error),

    /// The session of a process could not be queried.
    #[error("failed to query session of process {pid}: {source}")]
    Session {
        pid: u64,
        #[source]
        source: std::io::Error,
    },

    /// The process table could not be inspected.
    #[error("failed to inspect process table: {0}")]
    ProcessTable(String),
}

/// A lock file record could not be decoded.
///
/// Never fatal: a corrupt record only means the owner is unknown, and the
/// waiter falls back to timing-only abandonment detection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CorruptRecordError {
    #[error("lock record ended after {0} bytes")]
    Truncated(usize),

    #[error("lock record has an unknown header")]
    BadMagic,

    #[error("lock record has unsupported format version {0}")]
    UnsupportedVersion(i32),

    #[error("lock record field is {0} bytes long, which exceeds the limit")]
    FieldTooLong(u32),

    #[error("lock record owner id is {0} bytes, expected 16")]
    BadOwnerId(usize),

    #[error("lock record text field is not valid UTF-8")]
    BadText,
}

/// Main error type for dirlock operations.
#[derive(Error, Debug)]
pub enum LockError {
    /// The local identity is required to ever trust a lock.
    #[error("cannot determine local process identity: {0}")]
    Identity(#[from] IdentityError),

    /// A lock file could not be created, read or removed for a reason other
    /// than contention.
    #[error("I/O error on lock file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The directory to lock does not exist.
    #[error("directory '{}' does not exist", .0.display())]
    DirectoryMissing(PathBuf),

    /// The caller aborted the wait.
    #[error("waiting for lock on '{}' was cancelled", .0.display())]
    Cancelled(PathBuf),

    /// Configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// User provided invalid arguments or asked for a refused operation.
    #[error("{0}")]
    User(String),

    /// The command run under `dirlock hold` exited unsuccessfully.
    #[error("command exited with code {0}")]
    ChildFailed(i32),
}

impl LockError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LockError::Identity(_) => exit_codes::IDENTITY_FAILURE,
            LockError::Io { .. } => exit_codes::IO_FAILURE,
            LockError::DirectoryMissing(_) => exit_codes::LOCK_FAILURE,
            LockError::Cancelled(_) => exit_codes::LOCK_FAILURE,
            LockError::Config(_) => exit_codes::USER_ERROR,
            LockError::User(_) => exit_codes::USER_ERROR,
            LockError::ChildFailed(code) => *code,
        }
    }
}

/// Result type alias for dirlock operations.
pub type Result<T> = std::result::Result<T, LockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_error_has_correct_exit_code() {
        let err = LockError::from(IdentityError::ProcessTable("denied".to_string()));
        assert_eq!(err.exit_code(), exit_codes::IDENTITY_FAILURE);
    }

    #[test]
    fn io_error_has_correct_exit_code() {
        let err = LockError::Io {
            path: PathBuf::from("/tmp/x/sync.dirlock"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert_eq!(err.exit_code(), exit_codes::IO_FAILURE);
        assert!(err.to_string().contains("sync.dirlock"));
    }

    #[test]
    fn lock_failures_share_exit_code() {
        let missing = LockError::DirectoryMissing(PathBuf::from("/nowhere"));
        let cancelled = LockError::Cancelled(PathBuf::from("/somewhere"));
        assert_eq!(missing.exit_code(), exit_codes::LOCK_FAILURE);
        assert_eq!(cancelled.exit_code(), exit_codes::LOCK_FAILURE);
    }

    #[test]
    fn child_failure_propagates_code() {
        assert_eq!(LockError::ChildFailed(7).exit_code(), 7);
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = LockError::DirectoryMissing(PathBuf::from("/data/share"));
        assert_eq!(err.to_string(), "directory '/data/share' does not exist");

        let err = CorruptRecordError::UnsupportedVersion(9);
        assert_eq!(err.to_string(), "lock record has unsupported format version 9");
    }
}
