//! Strand Log - the per-partition storage engine.
//!
//! This crate implements the durable, ordered, offset-addressed storage
//! that the rest of Strand is built on:
//!
//! - [`Segment`]: one pair of files (`.log` + `.index`) holding a
//!   contiguous range of offsets, with CRC-verified crash recovery
//! - [`Partition`]: an ordered collection of segments for one partition
//!   directory, rolling to a new segment when the active one fills up
//!
//! # On-Disk Format
//!
//! A segment's log file is a concatenation of framed records:
//!
//! ```text
//! +-----------+-----------+----------+------------------+
//! |  offset   |  length   |   crc    |     payload      |
//! | (8 bytes) | (4 bytes) | (4 bytes)|  (length bytes)  |
//! +-----------+-----------+----------+------------------+
//! ```
//!
//! Its index file is a concatenation of `(relative_offset: i32,
//! position: i32)` pairs, one per [`LogConfig::index_interval_bytes`] of
//! log data. All multi-byte fields are big-endian; the CRC is IEEE CRC-32
//! over the payload bytes.
//!
//! # Concurrency
//!
//! The engine is deliberately synchronous. Each segment and each
//! partition owns one reader-writer lock: appends are exclusive, reads
//! are shared, and reads perform positioned I/O so concurrent readers
//! never contend on a file cursor. Hosts that want an async surface wrap
//! these calls in a worker pool; async never reaches down here.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod config;
mod error;
mod partition;
mod segment;

pub use config::LogConfig;
pub use error::{LogError, LogResult};
pub use partition::{parse_base_offset, Partition};
pub use segment::{Segment, INDEX_ENTRY_SIZE, RECORD_HEADER_SIZE};
