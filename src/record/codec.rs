//! Record codec
//!
//! Encoding and decoding functions for log records.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{CaskError, Result};

use super::{CRC_COVERAGE_START, HEADER_SIZE};

/// Decoded fixed-size header of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Stored CRC32 over bytes 4..end of the record
    pub checksum: u32,
    /// Creation time, whole seconds since the Unix epoch (informational only)
    pub timestamp: u32,
    pub key_len: u32,
    pub value_len: u32,
}

impl RecordHeader {
    /// Number of bytes following the header (key + value)
    pub fn payload_len(&self) -> u64 {
        self.key_len as u64 + self.value_len as u64
    }

    /// Total encoded length of the record, header included
    pub fn record_len(&self) -> u64 {
        HEADER_SIZE as u64 + self.payload_len()
    }
}

/// A record whose checksum has been verified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    pub timestamp: u32,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode a record stamped with the current time
pub fn encode(key: &[u8], value: &[u8]) -> Result<Bytes> {
    encode_with_timestamp(key, value, now_secs())
}

/// Encode a record with an explicit timestamp
///
/// Format: crc (4) + timestamp (4) + key_len (4) + value_len (4) + key + value
pub fn encode_with_timestamp(key: &[u8], value: &[u8], timestamp: u32) -> Result<Bytes> {
    let key_len = length_field("key", key.len())?;
    let value_len = length_field("value", value.len())?;

    let mut buf = BytesMut::with_capacity(HEADER_SIZE + key.len() + value.len());
    buf.put_u32(0); // CRC placeholder, filled once the rest is in place
    buf.put_u32(timestamp);
    buf.put_u32(key_len);
    buf.put_u32(value_len);
    buf.put_slice(key);
    buf.put_slice(value);

    let crc = crc32fast::hash(&buf[CRC_COVERAGE_START..]);
    buf[..CRC_COVERAGE_START].copy_from_slice(&crc.to_be_bytes());

    Ok(buf.freeze())
}

// =============================================================================
// Decoding
// =============================================================================

/// Split a 16-byte header into its fields without any validation
pub fn decode_header(header: &[u8; HEADER_SIZE]) -> RecordHeader {
    RecordHeader {
        checksum: be_u32(header, 0),
        timestamp: be_u32(header, 4),
        key_len: be_u32(header, 8),
        value_len: be_u32(header, 12),
    }
}

/// Recompute the checksum over header and payload and split out key and value
///
/// Fails with `DataCorruption` if the payload size disagrees with the header
/// or the checksum does not match.
pub fn decode_and_verify(header: &[u8; HEADER_SIZE], payload: &[u8]) -> Result<DecodedRecord> {
    let decoded = decode_header(header);

    if payload.len() as u64 != decoded.payload_len() {
        return Err(CaskError::DataCorruption(format!(
            "payload length {} does not match header (key_len={}, value_len={})",
            payload.len(),
            decoded.key_len,
            decoded.value_len
        )));
    }

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&header[CRC_COVERAGE_START..]);
    hasher.update(payload);
    let actual = hasher.finalize();

    if actual != decoded.checksum {
        return Err(CaskError::DataCorruption(format!(
            "checksum mismatch: stored {:#010x}, computed {:#010x}",
            decoded.checksum, actual
        )));
    }

    let (key, value) = payload.split_at(decoded.key_len as usize);

    Ok(DecodedRecord {
        timestamp: decoded.timestamp,
        key: key.to_vec(),
        value: value.to_vec(),
    })
}

// =============================================================================
// Helpers
// =============================================================================

fn be_u32(buf: &[u8; HEADER_SIZE], at: usize) -> u32 {
    u32::from_be_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn length_field(field: &'static str, len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| CaskError::RecordTooLarge { field, len })
}

/// Current Unix time in whole seconds, saturating into the u32 field
fn now_secs() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u32::try_from(d.as_secs()).unwrap_or(u32::MAX))
        .unwrap_or(0)
}
