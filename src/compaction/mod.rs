//! Compaction Module
//!
//! Reclaims space held by overwritten and deleted records.
//!
//! ## Responsibilities
//! - Copy every live record, byte for byte, into a fresh file
//! - Build the matching index as records are copied
//! - Swap the fresh file in for the active log (remove, then rename)
//! - Run merges off the caller's thread on request
//!
//! ## Merge Flow
//! ```text
//!   active log            merge file
//! ┌────┬────┬────┐      ┌────┬────┐
//! │ a1 │ b1 │ a2 │ ───▶ │ b1 │ a2 │   (order follows index iteration)
//! └────┴────┴────┘      └────┴────┘
//!         │                   │
//!         └── remove ── rename ┘ ──▶ reopen as active log
//! ```

mod merge;
mod worker;

pub use merge::MergeStats;
pub use worker::MergeWorker;

pub(crate) use merge::merge;
