//! Lock inspection types.

use super::record::LockFileRecord;
use crate::identity::ProcessStatus;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Read-only snapshot of a lock file.
#[derive(Debug, Clone, Serialize)]
pub struct LockInfo {
    /// The lock file path.
    pub path: PathBuf,

    /// The decoded record, if the file holds a valid one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<LockFileRecord>,

    /// Why the record could not be decoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corruption: Option<String>,

    /// Current size in bytes; grows by one per heartbeat.
    pub size: u64,

    /// Last modification, i.e. the latest heartbeat.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,

    /// Liveness of the recorded owner as seen from this process.
    pub status: ProcessStatus,
}

impl LockInfo {
    /// Time since the last heartbeat (or creation).
    pub fn age(&self) -> Option<Duration> {
        self.modified_at
            .map(|modified| Utc::now().signed_duration_since(modified))
    }

    /// Format the age as a human-readable string.
    pub fn age_string(&self) -> String {
        let Some(age) = self.age() else {
            return "unknown".to_string();
        };
        let seconds = age.num_seconds().max(0);
        let minutes = age.num_minutes();
        let hours = age.num_hours();

        if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds % 60)
        } else {
            format!("{}s", seconds)
        }
    }
}

impl std::fmt::Display for LockInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Lock: {}", self.path.display())?;
        match (&self.record, &self.corruption) {
            (Some(record), _) => {
                writeln!(f, "Owner: {}", record.owner_guid)?;
                writeln!(f, "Machine: {}", record.owner.machine_name)?;
                writeln!(f, "User: {}", record.owner.user_id)?;
                writeln!(
                    f,
                    "Process: {} (session {})",
                    record.owner.process_id, record.owner.session_id
                )?;
            }
            (None, Some(reason)) => writeln!(f, "Record: CORRUPT ({})", reason)?,
            (None, None) => writeln!(f, "Record: unreadable")?,
        }
        writeln!(f, "Last heartbeat: {} ago", self.age_string())?;
        write!(f, "Status: {}", self.status)
    }
}
