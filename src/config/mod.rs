//! Configuration model for dirlock.
//!
//! This module defines the Config struct, usually loaded from a YAML file
//! passed via `--config`. It supports forward-compatible YAML parsing (unknown
//! fields are ignored), sensible defaults for every field, and validation of
//! the timing relationships the abandonment protocol depends on.

mod model;
mod operations;


// Re-export public API
pub use model::Config;
pub use model::{
    DEFAULT_ABANDONMENT_WINDOW_MS, DEFAULT_HEARTBEAT_INTERVAL_MS, DEFAULT_LOCK_FILE_NAME,
    DEFAULT_POLL_INTERVAL_MS,
};
