//! Binary lock record codec.
//!
//! Layout (all integers little-endian, independent of the platform word size so
//! machines of any OS can share a network volume):
//!
//! | field        | encoding                              |
//! |--------------|---------------------------------------|
//! | magic        | the ASCII bytes `DirLockFile`         |
//! | version      | `i32`, currently 2                    |
//! | owner GUID   | `u32` length + 16 raw bytes           |
//! | machine name | `u32` length + UTF-8 bytes            |
//! | user id      | `u32` length + UTF-8 bytes            |
//! | session id   | `u64`                                 |
//! | process id   | `u64`                                 |
//!
//! Owners append one byte per heartbeat, so decoding ignores trailing bytes.

use crate::error::CorruptRecordError;
use crate::identity::ProcessIdentity;
use serde::Serialize;
use uuid::Uuid;

/// Header identifying a dirlock record.
pub const MAGIC: &[u8] = b"DirLockFile";

/// Current record format version.
pub const FORMAT_VERSION: i32 = 2;

/// Upper bound for a length-prefixed field; anything larger is corruption.
const MAX_FIELD_LEN: u32 = 64 * 1024;

/// Ownership record persisted in every lock file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockFileRecord {
    /// Minted per act of locking; never reused.
    pub owner_guid: Uuid,

    /// Process that created the lock.
    #[serde(flatten)]
    pub owner: ProcessIdentity,
}

impl LockFileRecord {
    /// Fresh record for a new lock created by `owner`.
    pub fn new(owner: ProcessIdentity) -> Self {
        Self {
            owner_guid: Uuid::new_v4(),
            owner,
        }
    }

    /// Serialize into the on-disk layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            MAGIC.len() + 4 + 3 * 4 + 16 + self.owner.machine_name.len() + self.owner.user_id.len() + 16,
        );
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        put_bytes(&mut out, self.owner_guid.as_bytes());
        put_bytes(&mut out, self.owner.machine_name.as_bytes());
        put_bytes(&mut out, self.owner.user_id.as_bytes());
        out.extend_from_slice(&self.owner.session_id.to_le_bytes());
        out.extend_from_slice(&self.owner.process_id.to_le_bytes());
        out
    }

    /// Parse a record, validating magic and version before trusting any field.
    pub fn decode(bytes: &[u8]) -> Result<Self, CorruptRecordError> {
        let mut reader = Reader { buf: bytes, pos: 0 };

        if reader.take(MAGIC.len())? != MAGIC {
            return Err(CorruptRecordError::BadMagic);
        }
        let version = reader.i32()?;
        if version != FORMAT_VERSION {
            return Err(CorruptRecordError::UnsupportedVersion(version));
        }

        let guid = reader.bytes()?;
        let owner_guid =
            Uuid::from_slice(guid).map_err(|_| CorruptRecordError::BadOwnerId(guid.len()))?;
        let machine_name = reader.string()?;
        let user_id = reader.string()?;
        let session_id = reader.u64()?;
        let process_id = reader.u64()?;

        Ok(Self {
            owner_guid,
            owner: ProcessIdentity {
                machine_name,
                user_id,
                session_id,
                process_id,
            },
        })
    }
}

fn put_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    // Fields are bounded well below u32::MAX by construction.
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], CorruptRecordError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or(CorruptRecordError::Truncated(self.buf.len()))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], CorruptRecordError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn i32(&mut self) -> Result<i32, CorruptRecordError> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64, CorruptRecordError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn bytes(&mut self) -> Result<&'a [u8], CorruptRecordError> {
        let len = u32::from_le_bytes(self.array()?);
        if len > MAX_FIELD_LEN {
            return Err(CorruptRecordError::FieldTooLong(len));
        }
        self.take(len as usize)
    }

    fn string(&mut self) -> Result<String, CorruptRecordError> {
        let bytes = self.bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CorruptRecordError::BadText)
    }
}
