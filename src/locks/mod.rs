//! Advisory directory locking built from filesystem primitives.
//!
//! # Lock Files
//!
//! Locking directory `D` means creating `D/<lock_file_name>` with
//! **create_new** semantics (exclusive create), so exactly one process wins.
//! The file holds a binary [`LockFileRecord`] naming the owner: a fresh GUID
//! plus machine, user, session and process id.
//!
//! # Liveness
//!
//! The owner appends one byte every heartbeat interval. A waiter polls the
//! file size; when it stops changing for the abandonment window, or the owner
//! is known to be dead (no such pid, or the pid now lives in another session),
//! the waiter reclaims the lock. Reclaimers serialize on a `.del` marker file.
//!
//! # Sharing Within a Process
//!
//! A [`LockRegistry`] remembers every lock this process holds, by path and by
//! GUID. Locking a directory twice (directly or through a path alias) shares
//! one lock file; it is deleted when the last [`DirLock`] is dropped.

mod file;
mod handle;
mod heartbeat;
mod observer;
mod operations;
mod record;
mod registry;
mod types;
mod waiter;


// Re-export public API
pub use handle::DirLock;
pub use heartbeat::HeartbeatState;
pub use observer::{CallbackObserver, LogObserver, NoopObserver, WaitObserver};
pub use operations::{clear_lock, inspect_lock};
pub use record::{FORMAT_VERSION, LockFileRecord, MAGIC};
pub use registry::LockRegistry;
pub use types::LockInfo;
