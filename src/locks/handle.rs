//! RAII directory lock handle.

use super::heartbeat::HeartbeatState;
use super::observer::WaitObserver;
use super::registry::{LockHolder, LockRegistry};
use crate::error::Result;
use log::debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Exclusive, advisory lock on a directory.
///
/// Construction blocks until the lock is ours (instantly when this process
/// already holds it, possibly minutes when an abandoned lock must first be
/// detected). Dropping the last handle for a directory stops its heartbeat
/// and deletes the lock file.
#[derive(Debug)]
pub struct DirLock {
    dir: PathBuf,
    /// `None` for directories exempt from locking.
    holder: Option<Arc<LockHolder>>,
}

impl DirLock {
    /// Lock `dir` through `registry`, reporting progress to `observer`.
    pub fn acquire<P: AsRef<Path>>(
        registry: &LockRegistry,
        dir: P,
        observer: &mut dyn WaitObserver,
    ) -> Result<Self> {
        let dir = dir.as_ref();

        if registry.is_exempt(dir) {
            debug!("'{}' is exempt from locking", dir.display());
            return Ok(Self {
                dir: dir.to_path_buf(),
                holder: None,
            });
        }

        let holder = registry.acquire_shared(dir, observer)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            holder: Some(holder),
        })
    }

    /// The directory as passed by the caller.
    pub fn directory(&self) -> &Path {
        &self.dir
    }

    /// Path of the lock file, unless the directory is exempt.
    pub fn lock_path(&self) -> Option<&Path> {
        self.holder.as_deref().map(LockHolder::lock_path)
    }

    /// GUID recorded in the lock file, unless the directory is exempt.
    pub fn owner_guid(&self) -> Option<Uuid> {
        self.holder.as_deref().map(LockHolder::owner_guid)
    }

    /// State of the heartbeat thread, unless the directory is exempt.
    pub fn heartbeat_state(&self) -> Option<HeartbeatState> {
        self.holder.as_deref().map(LockHolder::heartbeat_state)
    }

    /// Whether no lock file was needed for this directory.
    pub fn is_exempt(&self) -> bool {
        self.holder.is_none()
    }
}
