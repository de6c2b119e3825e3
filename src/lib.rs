//! # CaskDB
//!
//! A log-structured hash table key-value store (the Bitcask model):
//! - Every write appended to a single log file
//! - CRC32-checked records, verified on every read
//! - In-memory index rebuilt by replaying the log on open
//! - Merge compaction to reclaim space from overwritten and deleted keys
//! - Single reader/writer lock over all engine state
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Callers / MergeWorker                        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! │          (RwLock: shared get, exclusive put/del/merge)       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  ActiveLog  │◀─replay──│   KeyDir    │
//!   │  (Append)   │          │ key→offset  │
//!   └──────┬──────┘          └─────────────┘
//!          │
//!          ▼
//!   ┌─────────────┐
//!   │   Record    │
//!   │ (CRC codec) │
//!   └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod index;
pub mod storage;
pub mod compaction;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CaskError, Result};
pub use config::{Config, SyncStrategy};
pub use engine::Engine;
pub use compaction::{MergeStats, MergeWorker};
pub use index::{KeyDir, Recovery, RecoveryResult};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of CaskDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
