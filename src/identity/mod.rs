//! Process identity resolution and owner liveness classification.
//!
//! A lock record names the process that created it by machine, user, session
//! and process id. None of these identify an owner for good: they only let a
//! waiter decide whether the recorded process is plausibly still running.
//!
//! - **Windows**: the session is the parent process id, found by enumerating
//!   the process table (an open-handle probe is unreliable for processes
//!   that crashed moments ago).
//! - **POSIX**: the session is `getsid(pid)`; existence is probed with
//!   signal 0.

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
use unix as platform;
#[cfg(windows)]
use windows as platform;

use crate::error::IdentityError;
use log::warn;
use serde::{Deserialize, Serialize};

/// Identity of a process, as recorded in a lock file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessIdentity {
    /// Platform-qualified host name, e.g. `Linux.build01.example.com`.
    pub machine_name: String,

    /// Platform user identity, e.g. `1000(alice)` or `alice`.
    pub user_id: String,

    /// Parent pid on Windows, `getsid` on POSIX.
    pub session_id: u64,

    /// OS process id.
    pub process_id: u64,
}

/// Liveness of the process recorded as a lock owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessStatus {
    /// The record was written by this very process.
    ItsUs,
    /// The recorded process is still running in the recorded session.
    Running,
    /// The recorded process is gone, or its pid now belongs to another session.
    NotRunning,
    /// The owner lives on another machine or under another user.
    CantTell,
}

impl ProcessStatus {
    /// Whether the owner is known to be gone, so no grace period is needed.
    pub fn owner_is_gone(self) -> bool {
        matches!(self, ProcessStatus::ItsUs | ProcessStatus::NotRunning)
    }
}

impl std::fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessStatus::ItsUs => write!(f, "ITS_US"),
            ProcessStatus::Running => write!(f, "RUNNING"),
            ProcessStatus::NotRunning => write!(f, "NOT_RUNNING"),
            ProcessStatus::CantTell => write!(f, "CANT_TELL"),
        }
    }
}

/// OS seam for everything the lock protocol needs to know about processes.
pub trait ProcessProbe: Send + Sync {
    /// Identity of the current process.
    fn local_identity(&self) -> Result<ProcessIdentity, IdentityError>;

    /// Current session of `pid`, or `None` if no such process exists.
    fn session_of(&self, pid: u64) -> Result<Option<u64>, IdentityError>;

    /// Try to acquire backup/restore privileges. Best-effort; callers ignore failures.
    fn elevate_privileges(&self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Probe backed by the running operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl ProcessProbe for SystemProbe {
    fn local_identity(&self) -> Result<ProcessIdentity, IdentityError> {
        platform::local_identity()
    }

    fn session_of(&self, pid: u64) -> Result<Option<u64>, IdentityError> {
        platform::session_of(pid)
    }
}

/// Classify the recorded `owner` of a lock relative to the `local` process.
///
/// Owners on another machine or under another user are never assumed dead.
pub fn classify(
    owner: &ProcessIdentity,
    local: &ProcessIdentity,
    probe: &dyn ProcessProbe,
) -> ProcessStatus {
    if owner.machine_name != local.machine_name || owner.user_id != local.user_id {
        return ProcessStatus::CantTell;
    }

    if owner.session_id == local.session_id && owner.process_id == local.process_id {
        return ProcessStatus::ItsUs;
    }

    match probe.session_of(owner.process_id) {
        Ok(None) => ProcessStatus::NotRunning,
        // pid was reused by an unrelated process
        Ok(Some(session)) if session != owner.session_id => ProcessStatus::NotRunning,
        Ok(Some(_)) => ProcessStatus::Running,
        Err(e) => {
            warn!("cannot tell whether lock owner is alive: {}", e);
            ProcessStatus::CantTell
        }
    }
}
