//! Broker error types.

use strand_log::LogError;
use thiserror::Error;

/// Result type for broker operations.
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Errors that can occur in registry, produce, and consume operations.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// A topic with this name is already registered.
    #[error("topic already exists: {topic}")]
    TopicAlreadyExists {
        /// The topic name.
        topic: String,
    },

    /// No topic with this name is registered.
    #[error("topic not found: {topic}")]
    TopicNotFound {
        /// The topic name.
        topic: String,
    },

    /// Partition id is outside `[0, partitions)` for the topic.
    #[error("partition {partition} out of range for topic {topic} ({partitions} partitions)")]
    PartitionOutOfRange {
        /// The topic name.
        topic: String,
        /// The requested partition id.
        partition: u32,
        /// How many partitions the topic has.
        partitions: u32,
    },

    /// Topic name cannot be used.
    #[error("invalid topic name {name:?}: {reason}")]
    InvalidTopicName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Partition count is outside the allowed range.
    #[error("invalid partition count {count}: {reason}")]
    InvalidPartitionCount {
        /// The rejected count.
        count: u32,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Error surfaced from the storage engine.
    #[error(transparent)]
    Log(#[from] LogError),
}

impl BrokerError {
    /// Returns true if this error means the requested offset is at or
    /// past the current partition tail, so a tailing reader should wait
    /// and retry.
    #[must_use]
    pub fn is_past_end(&self) -> bool {
        matches!(self, Self::Log(e) if e.is_past_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_core::Offset;

    #[test]
    fn test_log_error_passthrough() {
        let err = BrokerError::from(LogError::OffsetOutOfRange {
            offset: Offset::new(3),
            first: Offset::new(0),
            next: Offset::new(3),
        });
        assert!(err.is_past_end());
        assert_eq!(format!("{err}"), "offset 3 out of range [0, 3)");
    }

    #[test]
    fn test_topic_error_display() {
        let err = BrokerError::PartitionOutOfRange {
            topic: "orders".to_string(),
            partition: 9,
            partitions: 3,
        };
        assert_eq!(
            format!("{err}"),
            "partition 9 out of range for topic orders (3 partitions)"
        );
    }
}
