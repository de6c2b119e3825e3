//! Storage Module
//!
//! The single append-only file holding every record.
//!
//! ## Responsibilities
//! - Own the one open handle to the active log
//! - Append encoded records and report where they landed
//! - Positional reads so concurrent lookups do not share a cursor
//! - Sync, tail truncation, and the close/reopen used by merge
//!
//! ## File Layout
//! ```text
//! ┌──────────┬──────────┬──────────┬─────┬──────────┐
//! │ Record 0 │ Record 1 │ Record 2 │ ... │ Record N │  ← write offset = file length
//! └──────────┴──────────┴──────────┴─────┴──────────┘
//! ```

mod log;

pub use log::ActiveLog;
