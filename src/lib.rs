//! Dirlock: advisory cross-process directory locks built from plain
//! filesystem primitives.
//!
//! A directory is locked by exclusively creating a small lock file inside
//! it. The owner keeps the file growing with a heartbeat; waiters detect
//! abandoned locks (crashed owners, reused process ids) and reclaim them.
//! Works on local disks and network shares alike because it needs nothing
//! beyond create-exclusive, append, stat and delete.
//!
//! ```no_run
//! use dirlock::{Config, LockRegistry, NoopObserver};
//!
//! let registry = LockRegistry::with_system_probe(Config::default())?;
//! let lock = registry.acquire("/srv/share/project", &mut NoopObserver)?;
//! // ... work in the directory ...
//! drop(lock);
//! # Ok::<(), dirlock::LockError>(())
//! ```

pub mod config;
pub mod error;
pub mod exit_codes;
pub mod identity;
pub mod locks;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use error::{CorruptRecordError, IdentityError, LockError, Result};
pub use identity::{ProcessIdentity, ProcessProbe, ProcessStatus, SystemProbe};
pub use locks::{
    CallbackObserver, DirLock, LockInfo, LockRegistry, LogObserver, NoopObserver, WaitObserver,
    clear_lock, inspect_lock,
};
