//! Append-only log backing one embedded collection.
//!
//! # Record Format
//!
//! Each record has the following layout:
//! ```text
//! +----------+----------------------------------------------+
//! | 0-3      | payload_length (4 bytes, little endian)      |
//! | 4-7      | CRC32 of the payload (4 bytes, little endian)|
//! | 8-N      | payload (JSON-encoded `LogEntry`)            |
//! +----------+----------------------------------------------+
//! ```
//!
//! Replay stops at the first record that is truncated or fails its checksum.
//! Everything after that point is treated as a torn write and discarded.

use serde::{Deserialize, Serialize};

use crate::database::query::Document;

/// Record header size: `payload_length` (4) + checksum (4).
const RECORD_HEADER_SIZE: usize = 8;

/// Largest payload a single record may carry: 16MB.
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// A single change to a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum LogEntry {
    /// Insert or overwrite the document with this `_id`.
    Put { doc: Document },
    /// Remove the document with this `_id`.
    Delete { id: String },
}

/// Serialize an entry into a framed record.
pub fn encode(entry: &LogEntry) -> Result<Vec<u8>, LogError> {
    let payload = serde_json::to_vec(entry).map_err(LogError::Serialization)?;
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(LogError::RecordTooLarge {
            size: payload.len(),
        });
    }
    let length = u32::try_from(payload.len()).map_err(|_| LogError::RecordTooLarge {
        size: payload.len(),
    })?;

    let mut bytes = Vec::with_capacity(RECORD_HEADER_SIZE + payload.len());
    bytes.extend_from_slice(&length.to_le_bytes());
    bytes.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Deserialize the record at the start of `bytes`.
///
/// Returns the entry and the number of bytes consumed.
pub fn decode(bytes: &[u8]) -> Result<(LogEntry, usize), LogError> {
    let Some(header) = bytes.get(..RECORD_HEADER_SIZE) else {
        return Err(LogError::Truncated);
    };

    let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let stored_checksum = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

    if length > MAX_PAYLOAD_SIZE {
        return Err(LogError::RecordTooLarge { size: length });
    }

    let end = RECORD_HEADER_SIZE + length;
    let Some(payload) = bytes.get(RECORD_HEADER_SIZE..end) else {
        return Err(LogError::Truncated);
    };

    let computed_checksum = crc32fast::hash(payload);
    if stored_checksum != computed_checksum {
        return Err(LogError::ChecksumMismatch {
            expected: stored_checksum,
            actual: computed_checksum,
        });
    }

    let entry = serde_json::from_slice(payload).map_err(LogError::Serialization)?;
    Ok((entry, end))
}

/// Outcome of replaying a log.
#[derive(Debug, Default)]
pub struct ReplayResult {
    /// Entries decoded, in log order.
    pub entries: Vec<LogEntry>,
    /// Trailing bytes dropped because they did not form a valid record.
    pub discarded_bytes: usize,
    /// Why replay stopped early, if it did.
    pub stopped_by: Option<LogError>,
}

/// Decode every valid record in `bytes`, stopping at the first bad one.
#[must_use]
pub fn replay(bytes: &[u8]) -> ReplayResult {
    let mut result = ReplayResult::default();
    let mut offset = 0;

    while offset < bytes.len() {
        match decode(&bytes[offset..]) {
            Ok((entry, consumed)) => {
                result.entries.push(entry);
                offset += consumed;
            }
            Err(e) => {
                result.discarded_bytes = bytes.len() - offset;
                result.stopped_by = Some(e);
                break;
            }
        }
    }

    result
}

/// Errors reading or writing log records.
#[derive(Debug)]
pub enum LogError {
    /// The record ends before its declared length.
    Truncated,
    /// The stored checksum does not match the payload.
    ChecksumMismatch { expected: u32, actual: u32 },
    /// The payload exceeds [`MAX_PAYLOAD_SIZE`].
    RecordTooLarge { size: usize },
    /// The payload is not a valid entry.
    Serialization(serde_json::Error),
}

impl std::fmt::Display for LogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Truncated => write!(f, "truncated log record"),
            Self::ChecksumMismatch { expected, actual } => write!(
                f,
                "log checksum mismatch: expected 0x{expected:08x}, got 0x{actual:08x}"
            ),
            Self::RecordTooLarge { size } => write!(
                f,
                "log record too large: {size} bytes exceeds {MAX_PAYLOAD_SIZE} bytes"
            ),
            Self::Serialization(e) => write!(f, "invalid log payload: {e}"),
        }
    }
}

impl std::error::Error for LogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Serialization(e) => Some(e),
            _ => None,
        }
    }
}
