//! Storage engine error types.
//!
//! All errors are explicit and typed, and they propagate: the engine
//! never logs-and-swallows a failure.

use strand_core::Offset;
use thiserror::Error;

/// Result type for storage engine operations.
pub type LogResult<T> = Result<T, LogError>;

/// Errors that can occur in segment and partition operations.
#[derive(Debug, Error)]
pub enum LogError {
    /// Requested offset lies outside the known range.
    #[error("offset {offset} out of range [{first}, {next})")]
    OffsetOutOfRange {
        /// Requested offset.
        offset: Offset,
        /// First offset of the range.
        first: Offset,
        /// One past the last assigned offset.
        next: Offset,
    },

    /// Offset is inside the known range but no record carries it.
    ///
    /// This cannot happen for a consistent segment; seeing it means the
    /// log and index disagree.
    #[error("offset {offset} not found")]
    OffsetNotFound {
        /// Requested offset.
        offset: Offset,
    },

    /// Payload exceeds what the frame's 32-bit length field can hold.
    #[error("payload too large: {size} bytes exceeds max {max} bytes")]
    PayloadTooLarge {
        /// Actual payload size.
        size: usize,
        /// Maximum allowed size.
        max: u64,
    },

    /// A byte position or relative offset no longer fits the index's
    /// 32-bit fields.
    #[error("index field overflow at log position {position}")]
    IndexOverflow {
        /// Byte position that overflowed.
        position: u64,
    },

    /// Segment filename does not encode a base offset.
    #[error("invalid segment filename: {name:?}")]
    InvalidFilename {
        /// The offending filename.
        name: String,
    },

    /// Configuration is invalid.
    #[error("invalid config: {reason}")]
    InvalidConfig {
        /// Why the configuration was rejected.
        reason: &'static str,
    },

    /// The segment has been closed.
    #[error("segment is closed")]
    Closed,

    /// I/O error from the filesystem.
    #[error("I/O error: {operation}: {message}")]
    Io {
        /// What operation was being performed.
        operation: &'static str,
        /// Error message.
        message: String,
    },
}

impl LogError {
    /// Creates an I/O error.
    pub fn io(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Io {
            operation,
            message: err.to_string(),
        }
    }

    /// Returns true if this error means the requested offset is at or past
    /// the current end of the log, so a tailing reader should wait and
    /// retry rather than give up.
    #[must_use]
    pub fn is_past_end(&self) -> bool {
        matches!(
            self,
            Self::OffsetOutOfRange { offset, next, .. } if *offset >= *next
        )
    }
}
