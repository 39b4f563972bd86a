//! Windows identity: account names and parent-pid sessions from the process table.

use super::ProcessIdentity;
use crate::error::IdentityError;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

pub(super) fn local_identity() -> Result<ProcessIdentity, IdentityError> {
    let host = hostname::get().map_err(IdentityError::MachineName)?;
    let machine_name = format!("Windows.{}", host.to_string_lossy());

    let user_id = std::env::var("USERNAME")
        .ok()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| IdentityError::ProcessTable("USERNAME is not set".to_string()))?;

    let pid = std::process::id();
    let session_id = parent_of(pid).ok_or_else(|| {
        IdentityError::ProcessTable(format!("process {} is missing from the process table", pid))
    })?;

    Ok(ProcessIdentity {
        machine_name,
        user_id,
        session_id,
        process_id: u64::from(pid),
    })
}

pub(super) fn session_of(pid: u64) -> Result<Option<u64>, IdentityError> {
    match u32::try_from(pid) {
        Ok(pid) => Ok(parent_of(pid)),
        Err(_) => Ok(None),
    }
}

/// Parent pid of `pid`; stays valid after the parent itself exits.
fn parent_of(pid: u32) -> Option<u64> {
    let pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::nothing(),
    );
    sys.process(pid)
        .map(|process| process.parent().map_or(0, |parent| u64::from(parent.as_u32())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_of_current_process() {
        assert!(parent_of(std::process::id()).is_some());
    }

    #[test]
    fn test_parent_of_missing_process() {
        assert_eq!(parent_of(u32::MAX - 1), None);
    }

    #[test]
    fn test_session_of_out_of_range_pid() {
        assert_eq!(session_of(u64::MAX).unwrap(), None);
    }
}
