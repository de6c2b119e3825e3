//! Record Module
//!
//! Binary layout of a single key-value record in the active log.
//!
//! ## Responsibilities
//! - Encode a key-value pair with a creation timestamp
//! - CRC32 (IEEE) checksum over everything but the checksum itself
//! - Decode the fixed header to learn the payload size
//! - Verify the checksum before handing key and value back
//!
//! ## Record Format (big-endian)
//! ```text
//! ┌──────────┬───────────┬───────────┬───────────┬───────┬─────────┐
//! │ CRC (4)  │ Tstamp(4) │ KeyLen(4) │ ValLen(4) │  Key  │  Value  │
//! └──────────┴───────────┴───────────┴───────────┴───────┴─────────┘
//!            └──────────────── covered by CRC ─────────────────────┘
//! ```
//!
//! The log is an unbroken concatenation of these records: no padding, no footer.

mod codec;

pub use codec::{
    decode_and_verify, decode_header, encode, encode_with_timestamp, DecodedRecord,
    RecordHeader,
};

/// Size of the fixed record header in bytes
pub const HEADER_SIZE: usize = 16;

/// Byte offset where the checksummed region starts
pub(crate) const CRC_COVERAGE_START: usize = 4;
