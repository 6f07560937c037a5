//! Server error types.

use strand_broker::BrokerError;
use strand_log::LogError;
use tonic::Status;

use crate::proto::ErrorCode;

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Error surfaced from the broker or storage engine.
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// Internal error (task failures and other server-side trouble).
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl ServerError {
    /// Converts the error to a protobuf error code.
    #[must_use]
    pub const fn to_error_code(&self) -> ErrorCode {
        match self {
            Self::Broker(e) => match e {
                BrokerError::TopicAlreadyExists { .. } => ErrorCode::TopicAlreadyExists,
                BrokerError::TopicNotFound { .. } => ErrorCode::TopicNotFound,
                BrokerError::PartitionOutOfRange { .. } => ErrorCode::PartitionOutOfRange,
                BrokerError::InvalidTopicName { .. }
                | BrokerError::InvalidPartitionCount { .. } => ErrorCode::InvalidArgument,
                BrokerError::Log(log) => match log {
                    LogError::OffsetOutOfRange { .. } => ErrorCode::OffsetOutOfRange,
                    LogError::OffsetNotFound { .. } => ErrorCode::OffsetNotFound,
                    LogError::PayloadTooLarge { .. }
                    | LogError::InvalidFilename { .. }
                    | LogError::InvalidConfig { .. } => ErrorCode::InvalidArgument,
                    LogError::IndexOverflow { .. } | LogError::Closed | LogError::Io { .. } => {
                        ErrorCode::Io
                    }
                },
            },
            Self::Internal { .. } => ErrorCode::Unknown,
        }
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Converts the error to a gRPC status for stream teardown.
    #[must_use]
    pub fn to_status(&self) -> Status {
        match self.to_error_code() {
            ErrorCode::TopicNotFound | ErrorCode::OffsetNotFound => {
                Status::not_found(self.message())
            }
            ErrorCode::PartitionOutOfRange | ErrorCode::OffsetOutOfRange => {
                Status::out_of_range(self.message())
            }
            ErrorCode::TopicAlreadyExists => Status::already_exists(self.message()),
            ErrorCode::InvalidArgument => Status::invalid_argument(self.message()),
            _ => Status::internal(self.message()),
        }
    }

    /// Returns true if the underlying error means the requested offset is
    /// at or past the partition tail.
    #[must_use]
    pub fn is_past_end(&self) -> bool {
        matches!(self, Self::Broker(e) if e.is_past_end())
    }
}

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use strand_core::Offset;

    #[test]
    fn test_error_code_mapping() {
        let err = ServerError::Broker(BrokerError::TopicNotFound {
            topic: "t".to_string(),
        });
        assert_eq!(err.to_error_code(), ErrorCode::TopicNotFound);

        let err = ServerError::Broker(BrokerError::Log(LogError::OffsetOutOfRange {
            offset: Offset::new(9),
            first: Offset::new(0),
            next: Offset::new(9),
        }));
        assert_eq!(err.to_error_code(), ErrorCode::OffsetOutOfRange);
        assert!(err.is_past_end());
        assert_eq!(err.to_status().code(), tonic::Code::OutOfRange);
    }
}
