//! Config loading, validation, and utility operations.

use super::model::Config;
use crate::error::{LockError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The abandonment window must absorb this many missed heartbeats.
const MIN_HEARTBEATS_PER_WINDOW: u64 = 6;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            LockError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| LockError::Config(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| LockError::Config(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `lock_file_name` must be a plain, non-empty file name
    /// - `heartbeat_interval_ms` must be positive
    /// - `abandonment_window_ms` must be at least 6x `heartbeat_interval_ms`
    /// - `poll_interval_ms` must be between 1 and 999 (sub-second ticks)
    /// - `exempt_paths` entries must be valid glob patterns
    pub fn validate(&self) -> Result<()> {
        let name = self.lock_file_name.as_str();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(LockError::Config(format!(
                "lock_file_name must be a plain file name (found '{}')",
                name
            )));
        }

        if self.heartbeat_interval_ms == 0 {
            return Err(LockError::Config(
                "heartbeat_interval_ms must be greater than 0".to_string(),
            ));
        }

        let min_window = self
            .heartbeat_interval_ms
            .saturating_mul(MIN_HEARTBEATS_PER_WINDOW);
        if self.abandonment_window_ms < min_window {
            return Err(LockError::Config(format!(
                "abandonment_window_ms must be at least {} (6x heartbeat_interval_ms), found {}",
                min_window, self.abandonment_window_ms
            )));
        }

        if self.poll_interval_ms == 0 || self.poll_interval_ms >= 1000 {
            return Err(LockError::Config(format!(
                "poll_interval_ms must be between 1 and 999, found {}",
                self.poll_interval_ms
            )));
        }

        self.exempt_globs()?;
        Ok(())
    }

    /// Heartbeat interval as a `Duration`.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// Abandonment window as a `Duration`.
    pub fn abandonment_window(&self) -> Duration {
        Duration::from_millis(self.abandonment_window_ms)
    }

    /// Poll tick as a `Duration`.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Path of the lock file guarding `dir`.
    pub fn lock_path_for(&self, dir: &Path) -> PathBuf {
        dir.join(&self.lock_file_name)
    }

    /// Compile `exempt_paths` into a matcher.
    pub fn exempt_globs(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exempt_paths {
            let glob = Glob::new(pattern).map_err(|e| {
                LockError::Config(format!("invalid exempt_paths pattern '{}': {}", pattern, e))
            })?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| LockError::Config(format!("failed to compile exempt_paths: {}", e)))
    }
}
