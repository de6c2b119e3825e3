//! Merge implementation
//!
//! Runs with the engine's exclusive lock held; the caller passes in the
//! state it is allowed to replace.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{CaskError, Result};
use crate::index::KeyDir;
use crate::record::{self, HEADER_SIZE};
use crate::storage::ActiveLog;

/// Outcome of a completed merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    /// Records carried over into the new log
    pub live_keys: usize,
    /// Log size before the merge
    pub bytes_before: u64,
    /// Log size after the merge
    pub bytes_after: u64,
}

impl MergeStats {
    pub fn bytes_reclaimed(&self) -> u64 {
        self.bytes_before.saturating_sub(self.bytes_after)
    }
}

/// Rewrite the live records of `log` into `merge_path` and swap it in
///
/// Copy-phase failures leave `log` and `keydir` untouched. Once the swap has
/// started, a failed rename or reopen leaves the log closed.
pub(crate) fn merge(log: &mut ActiveLog, keydir: &mut KeyDir, merge_path: &Path) -> Result<MergeStats> {
    let bytes_before = log.size();
    info!(live_keys = keydir.len(), bytes_before, "starting merge");

    let (new_keydir, new_size) = match copy_live_records(log, keydir, merge_path) {
        Ok(copied) => copied,
        Err(e) => {
            warn!(error = %e, "merge copy phase failed, keeping current log");
            discard_merge_file(merge_path);
            return Err(e);
        }
    };

    swap_in(log, merge_path)?;

    if log.size() != new_size {
        warn!(expected = new_size, actual = log.size(), "merged log size differs from copied bytes");
    }

    *keydir = new_keydir;

    let stats = MergeStats {
        live_keys: keydir.len(),
        bytes_before,
        bytes_after: log.size(),
    };
    info!(
        live_keys = stats.live_keys,
        bytes_before = stats.bytes_before,
        bytes_after = stats.bytes_after,
        "merge complete"
    );

    Ok(stats)
}

/// Copy phase: stream each indexed record verbatim into the merge file
fn copy_live_records(log: &ActiveLog, keydir: &KeyDir, merge_path: &Path) -> Result<(KeyDir, u64)> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(merge_path)?;
    let mut writer = BufWriter::new(file);

    let mut new_keydir = KeyDir::with_capacity(keydir.len());
    let mut new_offset = 0u64;
    let log_size = log.size();

    for (key, offset) in keydir {
        let mut header = [0u8; HEADER_SIZE];
        log.read_at(&mut header, offset)?;
        let record_len = record::decode_header(&header).record_len();

        if offset + record_len > log_size {
            return Err(CaskError::DataCorruption(format!(
                "record at offset {} (length {}) extends past end of log ({})",
                offset, record_len, log_size
            )));
        }

        // Header and payload are copied unmodified: timestamp and CRC carry over
        let mut raw = vec![0u8; record_len as usize];
        log.read_at(&mut raw, offset)?;
        writer.write_all(&raw)?;

        new_keydir.update(key.to_vec(), new_offset);
        new_offset += record_len;
    }

    writer.flush()?;
    let file: File = writer
        .into_inner()
        .map_err(|e| CaskError::Io(e.into_error()))?;
    file.sync_all()?;

    debug!(records = new_keydir.len(), bytes = new_offset, "merge copy phase done");
    Ok((new_keydir, new_offset))
}

/// Swap phase: close, remove the old log, rename the merge file, reopen
fn swap_in(log: &mut ActiveLog, merge_path: &Path) -> Result<()> {
    if let Err(e) = log.close() {
        log.reopen()?;
        discard_merge_file(merge_path);
        return Err(e);
    }

    if let Err(e) = fs::remove_file(log.path()) {
        warn!(error = %e, "could not remove old log, aborting merge");
        // Old file is still in place; leave the engine as it was
        log.reopen()?;
        discard_merge_file(merge_path);
        return Err(e.into());
    }

    // No log file exists on disk until the rename lands
    fs::rename(merge_path, log.path())?;
    log.reopen()?;

    Ok(())
}

fn discard_merge_file(merge_path: &Path) {
    if let Err(e) = fs::remove_file(merge_path) {
        debug!(error = %e, path = %merge_path.display(), "could not remove merge file");
    }
}
