//! Engine Module
//!
//! The core storage engine that coordinates all components.
//!
//! ## Responsibilities
//! - Rebuild the index from the active log on open
//! - Append records and keep the index pointing at the newest one
//! - Serve point lookups with one positional read
//! - Run merges that replace the log and index together

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::compaction::{self, MergeStats};
use crate::config::{Config, SyncStrategy};
use crate::error::{CaskError, Result};
use crate::index::{KeyDir, Recovery, RecoveryResult};
use crate::record::{self, HEADER_SIZE};
use crate::storage::ActiveLog;

/// The main storage engine
///
/// ## Concurrency Model: one reader/writer lock over all state
///
/// - **Writes** (put/delete/merge/sync): exclusive lock
///   - The append and the index update land together; no reader sees one
///     without the other
///   - Merge holds the lock for its whole run, so everything else waits
///
/// - **Reads** (get and accessors): shared lock
///   - Concurrent gets proceed together using positional reads
///   - A get never observes a half-written record: the index only points at
///     a record after its append has completed
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Log handle, index and write bookkeeping
    state: RwLock<EngineState>,

    /// What the replay on open found
    recovery: RecoveryResult,
}

struct EngineState {
    log: ActiveLog,
    keydir: KeyDir,
    /// Puts since the last fsync (for `SyncStrategy::EveryNWrites`)
    unsynced_writes: usize,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Create the data directory
    /// 2. Open/create the active log
    /// 3. Replay the log to rebuild the index
    /// 4. Drop a trailing partial header if configured to
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        // Step 1: Create data directory if it doesn't exist
        fs::create_dir_all(&config.data_dir)?;

        // Step 2: Open the log (created if absent)
        let log_path = config.log_path();
        let mut log = ActiveLog::open(&log_path)?;

        // Step 3: Replay
        let (keydir, recovery) = Recovery::rebuild(&log_path)?;

        // Step 4: Later appends must start on a record boundary
        if recovery.has_torn_tail() {
            if let Some(at) = recovery.overrun_offset {
                warn!(
                    offset = at,
                    unreadable = recovery.torn_tail_bytes(),
                    "record length runs past end of log; leaving the bytes in place"
                );
            } else if config.truncate_torn_tail {
                warn!(
                    valid_len = recovery.valid_len,
                    discarded = recovery.torn_tail_bytes(),
                    "truncating partial header at end of active log"
                );
                log.truncate(recovery.valid_len)?;
            } else {
                warn!(
                    torn_bytes = recovery.torn_tail_bytes(),
                    "active log has a torn tail; leaving it in place"
                );
            }
        }

        info!(
            path = %log_path.display(),
            live_keys = keydir.len(),
            log_size = log.size(),
            "engine opened"
        );

        Ok(Self {
            config,
            state: RwLock::new(EngineState {
                log,
                keydir,
                unsynced_writes: 0,
            }),
            recovery,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Get the value stored for `key`
    ///
    /// One header read and one payload read at the indexed offset, both
    /// checked against the stored CRC.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        let state = self.state.read();

        let offset = state.keydir.lookup(key).ok_or(CaskError::KeyNotFound)?;

        let mut header = [0u8; HEADER_SIZE];
        state.log.read_at(&mut header, offset)?;
        let decoded = record::decode_header(&header);

        if offset + decoded.record_len() > state.log.size() {
            return Err(CaskError::DataCorruption(format!(
                "record at offset {} (length {}) extends past end of log ({})",
                offset,
                decoded.record_len(),
                state.log.size()
            )));
        }

        let mut payload = vec![0u8; decoded.payload_len() as usize];
        state.log.read_at(&mut payload, offset + HEADER_SIZE as u64)?;

        let rec = record::decode_and_verify(&header, &payload).map_err(|e| match e {
            CaskError::DataCorruption(reason) => {
                CaskError::DataCorruption(format!("record at offset {}: {}", offset, reason))
            }
            other => other,
        })?;

        Ok(rec.value)
    }

    /// Put a key-value pair
    ///
    /// Steps:
    /// 1. Encode the record (current timestamp)
    /// 2. Acquire write lock
    /// 3. Append to the active log
    /// 4. Sync per strategy
    /// 5. Point the index at the new record
    ///
    /// A sync error after a successful append leaves the index unchanged, but
    /// the record is in the file and a replay will pick it up.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let bytes = record::encode(key, value)?;

        let mut state = self.state.write();

        // Any failure before the index update leaves the bytes unreferenced
        let offset = state.log.append(&bytes)?;

        state.unsynced_writes += 1;
        let due = match self.config.sync_strategy {
            SyncStrategy::EveryWrite => true,
            SyncStrategy::EveryNWrites { count } => state.unsynced_writes >= count,
            SyncStrategy::OsManaged => false,
        };
        if due {
            state.log.sync()?;
            state.unsynced_writes = 0;
        }

        state.keydir.update(key.to_vec(), offset);

        debug!(offset, len = bytes.len(), "record appended");
        Ok(())
    }

    /// Delete a key
    ///
    /// Index-only: nothing is appended to the log, so a replay after reopen
    /// brings the key back with its last written value. Deleting an absent
    /// key is a no-op.
    pub fn delete(&self, key: &[u8]) {
        let mut state = self.state.write();
        if state.keydir.remove(key).is_some() {
            debug!(live_keys = state.keydir.len(), "key removed from index");
        }
    }

    /// Rewrite the log with only live records
    ///
    /// Holds the exclusive lock for the whole merge.
    pub fn merge(&self) -> Result<MergeStats> {
        let merge_path = self.config.merge_path();

        let mut guard = self.state.write();
        let state = &mut *guard;

        let stats = compaction::merge(&mut state.log, &mut state.keydir, &merge_path)?;
        state.unsynced_writes = 0;

        Ok(stats)
    }

    /// Force the active log to stable storage
    pub fn sync(&self) -> Result<()> {
        let mut state = self.state.write();
        state.log.sync()?;
        state.unsynced_writes = 0;
        Ok(())
    }

    /// Close the engine gracefully
    ///
    /// Syncs the log and releases the file handle
    pub fn close(self) -> Result<()> {
        let mut state = self.state.into_inner();
        state.log.close()?;
        info!(path = %self.config.log_path().display(), "engine closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Whether `key` is currently indexed
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.state.read().keydir.contains_key(key)
    }

    /// Number of live keys in the index
    pub fn key_count(&self) -> usize {
        self.state.read().keydir.len()
    }

    /// Current write offset of the active log (== file size)
    pub fn log_size(&self) -> u64 {
        self.state.read().log.size()
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Path of the active log
    pub fn log_path(&self) -> PathBuf {
        self.config.log_path()
    }

    /// What the replay on open found
    pub fn recovery(&self) -> &RecoveryResult {
        &self.recovery
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
