//! Inspecting and manually clearing lock files.

use super::file::{self, RecordRead};
use super::observer::{NoopObserver, StatusReporter};
use super::types::LockInfo;
use super::waiter::{self, Removal};
use crate::config::Config;
use crate::error::{LockError, Result};
use crate::identity::{self, ProcessProbe, ProcessStatus};
use chrono::{DateTime, Utc};
use log::info;
use std::fs;
use std::path::Path;

/// Read the lock guarding `dir` without touching it.
///
/// Returns `Ok(None)` if the directory is not locked.
pub fn inspect_lock(
    dir: &Path,
    config: &Config,
    probe: &dyn ProcessProbe,
) -> Result<Option<LockInfo>> {
    let path = config.lock_path_for(dir);
    let io_error = |source: std::io::Error| LockError::Io {
        path: path.clone(),
        source,
    };

    let meta = match fs::metadata(&path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_error(e)),
    };

    let (record, corruption) = match file::read_record(&path).map_err(io_error)? {
        RecordRead::Missing => return Ok(None),
        RecordRead::Corrupt(e) => (None, Some(e.to_string())),
        RecordRead::Valid(record) => (Some(record), None),
    };

    let status = match &record {
        Some(record) => {
            let local = probe.local_identity()?;
            identity::classify(&record.owner, &local, probe)
        }
        None => ProcessStatus::CantTell,
    };

    Ok(Some(LockInfo {
        path: path.clone(),
        record,
        corruption,
        size: meta.len(),
        modified_at: meta.modified().ok().map(DateTime::<Utc>::from),
        status,
    }))
}

/// Remove the lock guarding `dir`.
///
/// Without `force`, only locks whose owner is known to be gone are removed:
/// clearing a live lock lets two owners into the directory at once.
pub fn clear_lock(
    dir: &Path,
    config: &Config,
    probe: &dyn ProcessProbe,
    force: bool,
) -> Result<LockInfo> {
    let Some(info) = inspect_lock(dir, config, probe)? else {
        return Err(LockError::User(format!(
            "no lock exists at: {}",
            config.lock_path_for(dir).display()
        )));
    };

    if !force && info.status != ProcessStatus::NotRunning {
        return Err(LockError::User(format!(
            "refusing to clear lock with owner status {} without --force.\n\n\
             Clearing a lock whose owner is still active lets two processes into the directory.\n\
             Only clear locks if you are certain the owner has crashed.\n\n\
             To clear the lock, run:\n  dirlock clear {} --force",
            info.status,
            dir.display()
        )));
    }

    // The owner may have changed since it was classified above.
    let local = probe.local_identity()?;
    let expected_guid = info.record.as_ref().map(|record| record.owner_guid);
    let mut observer = NoopObserver;
    let mut reporter = StatusReporter::new(&mut observer);
    match waiter::remove_if_unchanged(&info.path, expected_guid, None, config, &local, &mut reporter)? {
        Removal::Removed => {
            info!("cleared lock '{}'", info.path.display());
            Ok(info)
        }
        Removal::Gone => Err(LockError::User(format!(
            "lock at {} was released while clearing it",
            info.path.display()
        ))),
        Removal::Replaced | Removal::LateLifeSign => Err(LockError::User(format!(
            "lock at {} changed owner while clearing it; nothing was removed.\n\n\
             Run `dirlock inspect {}` to see the new owner.",
            info.path.display(),
            dir.display()
        ))),
    }
}
