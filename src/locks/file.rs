//! Lock file primitives: exclusive create, heartbeat append, best-effort delete.
//!
//! These are the only code paths that write to a lock file.

use super::record::LockFileRecord;
use crate::error::CorruptRecordError;
use log::{debug, warn};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Outcome of reading a lock file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordRead {
    /// No file exists at the path.
    Missing,
    /// The file exists but does not hold a valid record (possibly mid-write).
    Corrupt(CorruptRecordError),
    /// A decoded record.
    Valid(LockFileRecord),
}

impl RecordRead {
    /// The decoded record, if any.
    pub fn record(&self) -> Option<&LockFileRecord> {
        match self {
            RecordRead::Valid(record) => Some(record),
            _ => None,
        }
    }
}

/// Atomically create `path` and store `record` in it.
///
/// Returns `Ok(false)` if the file already exists. Any other failure is an
/// error; a partially written file is removed again.
pub fn try_create(path: &Path, record: &LockFileRecord) -> io::Result<bool> {
    let mut file = match exclusive_options().open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e),
    };

    if let Err(e) = write_record(&mut file, record) {
        drop(file);
        let _ = fs::remove_file(path);
        return Err(e);
    }

    Ok(true)
}

fn write_record(file: &mut File, record: &LockFileRecord) -> io::Result<()> {
    file.write_all(&record.encode())?;
    file.sync_all()
}

#[cfg(unix)]
fn exclusive_options() -> OpenOptions {
    use std::os::unix::fs::OpenOptionsExt;

    let mut options = OpenOptions::new();
    options.write(true).create_new(true).mode(0o644);
    options
}

#[cfg(windows)]
fn exclusive_options() -> OpenOptions {
    use std::os::windows::fs::OpenOptionsExt;

    const FILE_SHARE_READ: u32 = 0x1;
    const FILE_SHARE_WRITE: u32 = 0x2;
    const FILE_SHARE_DELETE: u32 = 0x4;

    let mut options = OpenOptions::new();
    options
        .write(true)
        .create_new(true)
        .share_mode(FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE);
    options
}

/// Delete `path`, ignoring every error.
pub fn remove(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!("removed lock file '{}'", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("failed to remove lock file '{}': {}", path.display(), e),
    }
}

/// Append one byte to the existing file at `path`, ignoring every error.
///
/// A missed heartbeat only means waiters will treat the lock as abandoned once
/// the abandonment window passes.
pub fn heartbeat(path: &Path) {
    let result = OpenOptions::new()
        .append(true)
        .open(path)
        .and_then(|mut file| file.write_all(b" "));

    if let Err(e) = result {
        warn!("failed to emit heartbeat to '{}': {}", path.display(), e);
    }
}

/// Current size of `path`, or `None` if it does not exist.
pub fn file_size(path: &Path) -> io::Result<Option<u64>> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta.len())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Read and decode the record stored at `path`.
pub fn read_record(path: &Path) -> io::Result<RecordRead> {
    match fs::read(path) {
        Ok(bytes) => Ok(match LockFileRecord::decode(&bytes) {
            Ok(record) => RecordRead::Valid(record),
            Err(e) => RecordRead::Corrupt(e),
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(RecordRead::Missing),
        Err(e) => Err(e),
    }
}
