//! Per-process registry of held directory locks.
//!
//! Every lock this process holds is recorded twice: by canonical lock-file path
//! and by owner GUID. A second request for the same directory, or for an alias
//! whose lock file carries a GUID we already hold, shares the existing lock
//! instead of waiting on ourselves forever.
//!
//! The registry is an explicit context object: create one per application (or
//! session) and hand it to whatever issues locks.

use super::file::{self, RecordRead};
use super::heartbeat::{Heartbeat, HeartbeatState};
use super::observer::{StatusReporter, WaitObserver};
use super::record::LockFileRecord;
use super::waiter::{self, WaitContext};
use crate::config::Config;
use crate::error::{LockError, Result};
use crate::identity::{ProcessIdentity, ProcessProbe, SystemProbe};
use globset::GlobSet;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, Once, Weak};
use std::thread;
use uuid::Uuid;

/// One acquired lock file, shared by every handle for that directory.
///
/// Dropping the last reference stops the heartbeat, deletes the lock file and
/// forgets the GUID, in that order.
#[derive(Debug)]
pub(crate) struct LockHolder {
    lock_path: PathBuf,
    owner_guid: Uuid,
    heartbeat: Heartbeat,
    registry: Weak<Mutex<RegistryState>>,
}

impl LockHolder {
    pub(crate) fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    pub(crate) fn owner_guid(&self) -> Uuid {
        self.owner_guid
    }

    pub(crate) fn heartbeat_state(&self) -> HeartbeatState {
        self.heartbeat.state()
    }
}

impl Drop for LockHolder {
    fn drop(&mut self) {
        // Hold the registry while the file goes away, so no acquirer mistakes
        // our half-released lock for an abandoned one.
        let registry = self.registry.upgrade();
        let mut state = registry.as_deref().map(lock_state);

        self.heartbeat.stop();
        file::remove(&self.lock_path);

        if let Some(state) = state.as_mut() {
            state.guid_to_holder.remove(&self.owner_guid);
        }
        info!("released lock '{}'", self.lock_path.display());
    }
}

/// Registry lookup result for an owner GUID.
enum Held {
    Live(Arc<LockHolder>),
    /// The last handle is gone but the holder is still deleting its file.
    Releasing,
    Unknown,
}

#[derive(Debug, Default)]
pub(crate) struct RegistryState {
    path_to_guid: HashMap<String, Uuid>,
    guid_to_holder: HashMap<Uuid, Weak<LockHolder>>,
}

impl RegistryState {
    /// Drop path entries whose lock has been released.
    fn prune(&mut self) {
        let holders = &self.guid_to_holder;
        self.path_to_guid.retain(|_, guid| {
            holders
                .get(guid)
                .is_some_and(|holder| holder.strong_count() > 0)
        });
    }

    fn lookup(&self, guid: &Uuid) -> Held {
        match self.guid_to_holder.get(guid) {
            Some(holder) => holder.upgrade().map_or(Held::Releasing, Held::Live),
            None => Held::Unknown,
        }
    }

    /// Whether `guid` is held, or still being released, by this process.
    fn knows(&self, guid: &Uuid) -> bool {
        self.guid_to_holder.contains_key(guid)
    }

    fn live_count(&self) -> usize {
        self.guid_to_holder
            .values()
            .filter(|holder| holder.strong_count() > 0)
            .count()
    }
}

fn lock_state(state: &Mutex<RegistryState>) -> MutexGuard<'_, RegistryState> {
    state.lock().unwrap_or_else(|poison| poison.into_inner())
}

/// Registry of locks held by this process.
pub struct LockRegistry {
    config: Config,
    exempt: GlobSet,
    probe: Arc<dyn ProcessProbe>,
    local: ProcessIdentity,
    state: Arc<Mutex<RegistryState>>,
    privileges: Once,
}

impl LockRegistry {
    /// Create a registry, validating `config` and resolving the local identity.
    pub fn new(config: Config, probe: Arc<dyn ProcessProbe>) -> Result<Self> {
        config.validate()?;
        let exempt = config.exempt_globs()?;
        let local = probe.local_identity()?;
        debug!("local identity: {:?}", local);

        Ok(Self {
            config,
            exempt,
            probe,
            local,
            state: Arc::new(Mutex::new(RegistryState::default())),
            privileges: Once::new(),
        })
    }

    /// Create a registry using the operating system's process information.
    pub fn with_system_probe(config: Config) -> Result<Self> {
        Self::new(config, Arc::new(SystemProbe))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn local_identity(&self) -> &ProcessIdentity {
        &self.local
    }

    /// Number of distinct lock files currently held by this process.
    pub fn held_count(&self) -> usize {
        lock_state(&self.state).live_count()
    }

    /// Acquire the lock for `dir`, blocking until it is ours.
    pub fn acquire<P: AsRef<Path>>(
        &self,
        dir: P,
        observer: &mut dyn WaitObserver,
    ) -> Result<super::DirLock> {
        super::DirLock::acquire(self, dir, observer)
    }

    /// Release a handle and prune registry entries it leaves behind.
    pub fn release(&self, lock: super::DirLock) {
        drop(lock);
        lock_state(&self.state).prune();
    }

    /// Whether `dir` needs no lock at all.
    pub(crate) fn is_exempt(&self, dir: &Path) -> bool {
        if self.exempt.is_match(dir) {
            return true;
        }
        if let Ok(canonical) = fs::canonicalize(dir)
            && self.exempt.is_match(&canonical)
        {
            return true;
        }
        self.config.exempt_read_only
            && fs::metadata(dir).is_ok_and(|meta| meta.is_dir() && meta.permissions().readonly())
    }

    /// Share an existing lock for `dir` or create a new one, waiting out
    /// other owners as needed.
    pub(crate) fn acquire_shared(
        &self,
        dir: &Path,
        observer: &mut dyn WaitObserver,
    ) -> Result<Arc<LockHolder>> {
        let lock_path = self.config.lock_path_for(dir);
        let key = registry_key(&lock_path);
        let mut reporter = StatusReporter::new(observer);

        self.privileges.call_once(|| {
            if let Err(e) = self.probe.elevate_privileges() {
                debug!("privilege elevation failed: {}", e);
            }
        });

        let mut first_attempt = true;
        loop {
            let mut state = lock_state(&self.state);
            state.prune();

            if let Some(guid) = state.path_to_guid.get(&key).copied()
                && let Held::Live(holder) = state.lookup(&guid)
            {
                debug!("sharing held lock '{}'", lock_path.display());
                return Ok(holder);
            }

            let record = LockFileRecord::new(self.local.clone());
            match file::try_create(&lock_path, &record) {
                Ok(true) => {
                    let holder = self.start_holder(&lock_path, record.owner_guid)?;
                    state.path_to_guid.insert(key, holder.owner_guid);
                    state
                        .guid_to_holder
                        .insert(holder.owner_guid, Arc::downgrade(&holder));
                    info!("acquired lock '{}'", lock_path.display());
                    return Ok(holder);
                }
                Ok(false) => {}
                Err(source) => {
                    drop(state);
                    if !dir.exists() {
                        return Err(LockError::DirectoryMissing(dir.to_path_buf()));
                    }
                    if first_attempt {
                        return Err(LockError::Io {
                            path: lock_path,
                            source,
                        });
                    }
                    warn!("retrying lock '{}': {}", lock_path.display(), source);
                    self.pause(dir, &mut reporter)?;
                    continue;
                }
            }
            first_attempt = false;

            // The file may be ours under another path alias.
            let mut releasing = false;
            if let Ok(RecordRead::Valid(existing)) = file::read_record(&lock_path) {
                match state.lookup(&existing.owner_guid) {
                    Held::Live(holder) => {
                        debug!("lock '{}' is an alias of a held lock", lock_path.display());
                        state.path_to_guid.insert(key, existing.owner_guid);
                        return Ok(holder);
                    }
                    Held::Releasing => releasing = true,
                    Held::Unknown => {}
                }
            }
            drop(state);

            if releasing {
                self.pause(dir, &mut reporter)?;
                continue;
            }

            let held_here = |guid: &Uuid| lock_state(&self.state).knows(guid);
            let ctx = WaitContext {
                config: &self.config,
                probe: self.probe.as_ref(),
                local: &self.local,
                held_here: &held_here,
            };
            waiter::wait_for_release(&lock_path, &ctx, &mut reporter)?;
        }
    }

    /// Start the heartbeat for a freshly created lock file.
    ///
    /// On failure the file is removed again: an owner without heartbeat would
    /// be declared abandoned while still working.
    fn start_holder(&self, lock_path: &Path, owner_guid: Uuid) -> Result<Arc<LockHolder>> {
        let heartbeat = Heartbeat::start(lock_path.to_path_buf(), self.config.heartbeat_interval())
            .map_err(|source| {
                file::remove(lock_path);
                LockError::Io {
                    path: lock_path.to_path_buf(),
                    source,
                }
            })?;

        Ok(Arc::new(LockHolder {
            lock_path: lock_path.to_path_buf(),
            owner_guid,
            heartbeat,
            registry: Arc::downgrade(&self.state),
        }))
    }

    /// Sleep one poll tick, giving the observer a chance to cancel.
    fn pause(&self, dir: &Path, reporter: &mut StatusReporter<'_>) -> Result<()> {
        if !reporter.pump() {
            return Err(LockError::Cancelled(dir.to_path_buf()));
        }
        thread::sleep(self.config.poll_interval());
        Ok(())
    }
}

/// Normalized registry key for a lock file path.
///
/// Symlinks are resolved through the directory; Windows and macOS paths are
/// case-insensitive.
fn registry_key(lock_path: &Path) -> String {
    let resolved = match (lock_path.parent(), lock_path.file_name()) {
        (Some(dir), Some(name)) => fs::canonicalize(dir)
            .map(|dir| dir.join(name))
            .unwrap_or_else(|_| lock_path.to_path_buf()),
        _ => lock_path.to_path_buf(),
    };
    let key = resolved.to_string_lossy().into_owned();
    if cfg!(any(windows, target_os = "macos")) {
        key.to_lowercase()
    } else {
        key
    }
}
