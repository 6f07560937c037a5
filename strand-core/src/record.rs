//! The record type.
//!
//! A record is an opaque byte payload plus the offset its partition
//! assigned to it. Strand never interprets payload contents.

use bytes::Bytes;

use crate::types::Offset;

/// A single record in a partition log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Offset assigned by the partition at append time.
    pub offset: Offset,
    /// The opaque payload.
    pub payload: Bytes,
}

impl Record {
    /// Creates a record.
    #[must_use]
    pub const fn new(offset: Offset, payload: Bytes) -> Self {
        Self { offset, payload }
    }

    /// Returns the payload length in bytes.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accessors() {
        let record = Record::new(Offset::new(9), Bytes::from_static(b"hello"));
        assert_eq!(record.offset, Offset::new(9));
        assert_eq!(record.payload_len(), 5);
        assert_eq!(&record.payload[..], b"hello");
    }
}
