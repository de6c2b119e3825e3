//! Index Module
//!
//! In-memory key directory and the replay that rebuilds it.
//!
//! ## Responsibilities
//! - Map every live key to the offset of its latest record
//! - Rebuild the map from the log on startup (the log is the only source of truth)
//! - Report corrupted records and torn tails without failing the open
//!
//! ## Data Structure Choice
//! A plain `HashMap<Vec<u8>, u64>`:
//! - O(1) lookup, update and removal
//! - No ordering needed: the log order, not key order, decides which write is newest
//! - Never persisted; rebuilt by a full forward scan on every open

mod keydir;
mod recovery;

pub use keydir::{KeyDir, KeyDirIter};
pub use recovery::{Recovery, RecoveryResult};
