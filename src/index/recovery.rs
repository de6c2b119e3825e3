//! Index Recovery
//!
//! Rebuilds the key directory by replaying the active log from offset 0.
//!
//! ## Known limitation
//! A corrupted record is skipped by its *declared* length. If the length
//! fields themselves are damaged, every following record boundary can be
//! misread. A length that runs past the end of the file is reported as a
//! corrupted record, but the records behind it stay unindexed.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{CaskError, Result};
use crate::record::{self, HEADER_SIZE};

use super::KeyDir;

/// Replays a log file into a fresh index
pub struct Recovery;

/// Result of a recovery scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Records whose checksum verified (superseded ones included)
    pub records_recovered: u64,

    /// Records skipped because of a checksum mismatch, plus a record whose
    /// declared length runs past the end of the file
    pub records_corrupted: u64,

    /// Start offsets of the skipped records
    pub corrupted_offsets: Vec<u64>,

    /// Keys in the rebuilt index
    pub live_keys: usize,

    /// Offset just past the last complete record
    pub valid_len: u64,

    /// Length of the file when the scan started
    pub file_len: u64,

    /// Start of a header whose declared length runs past EOF, if the scan
    /// stopped on one
    pub overrun_offset: Option<u64>,
}

impl RecoveryResult {
    /// Bytes at the end of the log that do not form a complete record
    pub fn torn_tail_bytes(&self) -> u64 {
        self.file_len - self.valid_len
    }

    pub fn has_torn_tail(&self) -> bool {
        self.valid_len < self.file_len
    }
}

impl Recovery {
    /// Rebuild the index from the log at `path`
    ///
    /// This will:
    /// 1. Read records front to back
    /// 2. Point each verified key at its record's start offset (later wins)
    /// 3. Skip records with a bad checksum, by their declared length
    /// 4. Stop at a trailing partial header, or at a record running past EOF
    ///    (reported as corrupted)
    ///
    /// The file is never modified here.
    pub fn rebuild(path: &Path) -> Result<(KeyDir, RecoveryResult)> {
        let mut keydir = KeyDir::new();
        let result = Self::scan(path, |key, offset| {
            keydir.update(key, offset);
        })?;

        let result = RecoveryResult {
            live_keys: keydir.len(),
            ..result
        };

        info!(
            path = %path.display(),
            live_keys = result.live_keys,
            records = result.records_recovered,
            corrupted = result.records_corrupted,
            "index rebuilt from log"
        );

        Ok((keydir, result))
    }

    /// Verify integrity of a log file without building an engine
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        Self::rebuild(path).map(|(_, result)| result)
    }

    fn scan<F>(path: &Path, mut on_record: F) -> Result<RecoveryResult>
    where
        F: FnMut(Vec<u8>, u64),
    {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let mut result = RecoveryResult {
            file_len,
            ..RecoveryResult::default()
        };
        let mut offset = 0u64;

        loop {
            let remaining = file_len - offset;
            if remaining == 0 {
                break;
            }

            // Fewer than a header's worth of bytes: natural end of file
            if remaining < HEADER_SIZE as u64 {
                debug!(offset, remaining, "partial header at end of log");
                break;
            }

            let mut header = [0u8; HEADER_SIZE];
            reader.read_exact(&mut header)?;
            let decoded = record::decode_header(&header);

            if decoded.record_len() > remaining {
                warn!(
                    offset,
                    key_len = decoded.key_len,
                    value_len = decoded.value_len,
                    remaining,
                    "record runs past end of log, stopping scan"
                );
                result.records_corrupted += 1;
                result.corrupted_offsets.push(offset);
                result.overrun_offset = Some(offset);
                break;
            }

            let mut payload = vec![0u8; decoded.payload_len() as usize];
            reader.read_exact(&mut payload)?;

            match record::decode_and_verify(&header, &payload) {
                Ok(rec) => {
                    on_record(rec.key, offset);
                    result.records_recovered += 1;
                }
                Err(CaskError::DataCorruption(reason)) => {
                    warn!(
                        offset,
                        key_len = decoded.key_len,
                        value_len = decoded.value_len,
                        %reason,
                        "corrupted record during recovery, skipping"
                    );
                    result.records_corrupted += 1;
                    result.corrupted_offsets.push(offset);
                }
                Err(e) => return Err(e),
            }

            offset += decoded.record_len();
        }

        result.valid_len = offset;
        Ok(result)
    }
}
