//! Waiting on a contended lock and reclaiming abandoned ones.
//!
//! A waiter polls the lock file size. The owner's heartbeat keeps changing it;
//! once it has stood still for the abandonment window, or the owner was found
//! to be gone up front, the waiter deletes the lock so the caller can retry
//! the exclusive create.
//!
//! Reclaimers serialize on a `<lock file>.del` marker created with the same
//! exclusive-create primitive. The marker never re-enters this protocol: a
//! marker left behind by a crashed reclaimer is removed once neither its
//! owner GUID nor its size has changed for one abandonment window, and a
//! marker is only ever removed by a reclaimer that saw its GUID.

use super::file::{self, RecordRead};
use super::observer::StatusReporter;
use super::record::LockFileRecord;
use crate::config::Config;
use crate::error::{LockError, Result};
use crate::identity::{self, ProcessIdentity, ProcessProbe, ProcessStatus};
use log::{debug, info, warn};
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;
use uuid::Uuid;

/// Everything a waiter needs besides the lock path.
pub(crate) struct WaitContext<'a> {
    pub config: &'a Config,
    pub probe: &'a dyn ProcessProbe,
    pub local: &'a ProcessIdentity,
    /// Whether a GUID belongs to a lock held (or being released) by this process.
    pub held_here: &'a dyn Fn(&Uuid) -> bool,
}

/// Outcome of a verified lock removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Removal {
    /// The lock file was deleted.
    Removed,
    /// The lock file had already disappeared.
    Gone,
    /// Another owner's record sits at the path now.
    Replaced,
    /// The owner emitted a heartbeat after it was judged abandoned.
    LateLifeSign,
}

/// Block until the lock at `lock_path` is released or reclaimed.
///
/// Returning `Ok(())` does not mean the caller owns the lock; it must retry
/// the exclusive create.
pub(crate) fn wait_for_release(
    lock_path: &Path,
    ctx: &WaitContext<'_>,
    reporter: &mut StatusReporter<'_>,
) -> Result<()> {
    let dir = lock_dir(lock_path);

    let original = match file::read_record(lock_path) {
        Ok(RecordRead::Missing) => return Ok(()),
        Ok(RecordRead::Valid(record)) => Some(record),
        Ok(RecordRead::Corrupt(e)) => {
            debug!("lock '{}' is unreadable: {}", lock_path.display(), e);
            None
        }
        Err(e) => {
            debug!("failed to read lock '{}': {}", lock_path.display(), e);
            None
        }
    };
    let original_guid = original.as_ref().map(|record| record.owner_guid);

    if original_guid.is_some_and(|guid| (ctx.held_here)(&guid)) {
        return Ok(());
    }

    let status = match &original {
        Some(record) => identity::classify(&record.owner, ctx.local, ctx.probe),
        None => ProcessStatus::CantTell,
    };
    debug!("lock '{}' owner status: {}", lock_path.display(), status);

    reporter.report(format!("Waiting while directory is locked: {}", dir.display()));
    if let Some(record) = &original {
        reporter.report(owner_text(record));
    }

    let owner_gone = status.owner_is_gone();
    let window = ctx.config.abandonment_window();

    let mut size_old = match file::file_size(lock_path) {
        Ok(None) => return Ok(()),
        Ok(Some(size)) => size,
        Err(_) => 0,
    };
    let mut last_life_sign = Instant::now();

    loop {
        match file::file_size(lock_path) {
            Ok(None) => return Ok(()),
            Ok(Some(size)) if size != size_old => {
                size_old = size;
                last_life_sign = Instant::now();
            }
            Ok(Some(_)) => {}
            Err(e) => debug!("failed to poll lock '{}': {}", lock_path.display(), e),
        }

        let silent_for = last_life_sign.elapsed();
        if owner_gone || silent_for >= window {
            reporter.report("Removing abandoned lock...".to_string());
            let removal = remove_if_unchanged(
                lock_path,
                original_guid,
                Some(size_old),
                ctx.config,
                ctx.local,
                reporter,
            );
            match removal {
                Ok(Removal::LateLifeSign) => {
                    debug!("late heartbeat on '{}', waiting again", lock_path.display())
                }
                Ok(_) => return Ok(()),
                Err(LockError::Io { path, source }) => {
                    warn!("failed to remove abandoned lock '{}': {}", path.display(), source)
                }
                Err(e) => return Err(e),
            }
        } else {
            let remaining = window - silent_for;
            reporter.report(format!(
                "Detecting abandoned lock... {} sec",
                remaining.as_millis().div_ceil(1000)
            ));
        }

        if !reporter.pump() {
            return Err(LockError::Cancelled(dir.to_path_buf()));
        }
        thread::sleep(ctx.config.poll_interval());
    }
}

fn owner_text(record: &LockFileRecord) -> String {
    format!(
        "Lock owner: {} on {} (pid {})",
        record.owner.user_id, record.owner.machine_name, record.owner.process_id
    )
}

fn lock_dir(lock_path: &Path) -> &Path {
    lock_path.parent().unwrap_or(lock_path)
}

/// Delete the lock at `lock_path` while holding its deletion marker.
///
/// The file is only removed if it still carries `expected_guid` (`None` for
/// an unreadable record) and, when `expected_size` is given, has not grown.
pub(crate) fn remove_if_unchanged(
    lock_path: &Path,
    expected_guid: Option<Uuid>,
    expected_size: Option<u64>,
    config: &Config,
    local: &ProcessIdentity,
    reporter: &mut StatusReporter<'_>,
) -> Result<Removal> {
    let Some(_marker) = DeletionMarker::acquire(lock_path, config, local, reporter)? else {
        return Ok(Removal::Gone);
    };

    let current_guid = match file::read_record(lock_path) {
        Ok(RecordRead::Missing) => return Ok(Removal::Gone),
        Ok(read) => read.record().map(|record| record.owner_guid),
        Err(_) => None,
    };
    if current_guid != expected_guid {
        debug!("lock '{}' changed owner meanwhile", lock_path.display());
        return Ok(Removal::Replaced);
    }

    if let Some(expected) = expected_size {
        match file::file_size(lock_path) {
            Ok(None) => return Ok(Removal::Gone),
            Ok(Some(size)) if size != expected => return Ok(Removal::LateLifeSign),
            _ => {}
        }
    }

    match fs::remove_file(lock_path) {
        Ok(()) => {
            info!("removed lock '{}'", lock_path.display());
            Ok(Removal::Removed)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Removal::Gone),
        Err(source) => Err(LockError::Io {
            path: lock_path.to_path_buf(),
            source,
        }),
    }
}

/// What a waiter last saw at a marker path.
#[derive(Debug, PartialEq, Eq)]
struct MarkerSighting {
    owner_guid: Option<Uuid>,
    size: Option<u64>,
}

impl MarkerSighting {
    fn take(path: &Path) -> Self {
        let owner_guid = match file::read_record(path) {
            Ok(read) => read.record().map(|record| record.owner_guid),
            Err(_) => None,
        };
        Self {
            owner_guid,
            size: file::file_size(path).ok().flatten(),
        }
    }
}

/// Remove `path` if it still holds a record with `owner_guid`.
fn remove_if_carrying(path: &Path, owner_guid: Option<Uuid>) -> bool {
    match file::read_record(path) {
        Ok(RecordRead::Missing) | Err(_) => false,
        Ok(read) if read.record().map(|record| record.owner_guid) == owner_guid => {
            file::remove(path);
            true
        }
        Ok(_) => false,
    }
}

/// Exclusive marker serializing reclaimers of one lock file.
pub(crate) struct DeletionMarker {
    path: PathBuf,
    owner_guid: Uuid,
}

impl DeletionMarker {
    /// Marker path for `lock_path`; distinct lock files never share one.
    pub(crate) fn path_for(lock_path: &Path) -> PathBuf {
        let mut name = lock_path
            .file_name()
            .map(OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".del");
        lock_path.with_file_name(name)
    }

    /// Create the marker, waiting out other reclaimers.
    ///
    /// A foreign marker counts as stale once neither its owner nor its size
    /// has changed for one abandonment window. Returns `None` if the lock
    /// file disappeared while waiting.
    pub(crate) fn acquire(
        lock_path: &Path,
        config: &Config,
        local: &ProcessIdentity,
        reporter: &mut StatusReporter<'_>,
    ) -> Result<Option<Self>> {
        let path = Self::path_for(lock_path);
        let mut seen: Option<MarkerSighting> = None;
        let mut last_change = Instant::now();

        loop {
            if let Ok(None) = file::file_size(lock_path) {
                return Ok(None);
            }

            let record = LockFileRecord::new(local.clone());
            match file::try_create(&path, &record) {
                Ok(true) => {
                    return Ok(Some(Self {
                        path,
                        owner_guid: record.owner_guid,
                    }));
                }
                Ok(false) => {
                    let current = MarkerSighting::take(&path);
                    if seen.as_ref() != Some(&current) {
                        seen = Some(current);
                        last_change = Instant::now();
                    } else if last_change.elapsed() >= config.abandonment_window() {
                        if remove_if_carrying(&path, current.owner_guid) {
                            warn!("removed stale deletion marker '{}'", path.display());
                        }
                        seen = None;
                        last_change = Instant::now();
                        continue;
                    }
                }
                Err(e) => debug!("failed to create marker '{}': {}", path.display(), e),
            }

            if !reporter.pump() {
                return Err(LockError::Cancelled(lock_dir(lock_path).to_path_buf()));
            }
            thread::sleep(config.poll_interval());
        }
    }
}

impl Drop for DeletionMarker {
    fn drop(&mut self) {
        if !remove_if_carrying(&self.path, Some(self.owner_guid)) {
            warn!("deletion marker '{}' was taken over", self.path.display());
        }
    }
}
