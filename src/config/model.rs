//! Config struct definition and default implementation.

use serde::{Deserialize, Serialize};

/// Default name of the lock file created inside a locked directory.
pub const DEFAULT_LOCK_FILE_NAME: &str = "sync.dirlock";

/// Default interval between two heartbeat appends.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 5_000;

/// Default time without a heartbeat after which a lock counts as abandoned.
pub const DEFAULT_ABANDONMENT_WINDOW_MS: u64 = 30_000;

/// Default polling tick of a waiter.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Configuration for directory locking.
///
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Lock file settings
    // =========================================================================
    /// Name of the lock file created inside the locked directory.
    #[serde(default = "default_lock_file_name")]
    pub lock_file_name: String,

    // =========================================================================
    // Timing settings
    // =========================================================================
    /// Milliseconds between two heartbeat appends by the lock owner.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Milliseconds without a size change after which a waiter treats the
    /// lock as abandoned.
    #[serde(default = "default_abandonment_window_ms")]
    pub abandonment_window_ms: u64,

    /// Milliseconds between two polls of a contended lock file.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    // =========================================================================
    // Exemptions
    // =========================================================================
    /// Glob patterns of directories that never need a lock.
    #[serde(default)]
    pub exempt_paths: Vec<String>,

    /// Whether directories reported as read-only are exempt from locking.
    #[serde(default = "default_true")]
    pub exempt_read_only: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lock_file_name: default_lock_file_name(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            abandonment_window_ms: default_abandonment_window_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            exempt_paths: Vec::new(),
            exempt_read_only: default_true(),
        }
    }
}

fn default_lock_file_name() -> String {
    DEFAULT_LOCK_FILE_NAME.to_string()
}

fn default_heartbeat_interval_ms() -> u64 {
    DEFAULT_HEARTBEAT_INTERVAL_MS
}

fn default_abandonment_window_ms() -> u64 {
    DEFAULT_ABANDONMENT_WINDOW_MS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_true() -> bool {
    true
}
