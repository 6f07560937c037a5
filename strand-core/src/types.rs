//! Strongly-typed identifiers for Strand entities.
//!
//! Explicit wrapper types keep offsets and partition ids from being mixed
//! up with each other or with raw integers.

use std::fmt;

/// Position of a record within its partition.
///
/// Offsets are assigned by the partition at append time, start at 0, and
/// increase by exactly one per record. An offset is only meaningful in
/// combination with the partition that assigned it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Offset(u64);

impl Offset {
    /// Creates an offset from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw offset value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the next offset.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Offset {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl From<Offset> for u64 {
    fn from(offset: Offset) -> Self {
        offset.get()
    }
}

/// Identifier of a partition within a topic.
///
/// Partition ids are dense: a topic with `n` partitions uses ids
/// `0..n`, fixed at topic creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct PartitionId(u32);

impl PartitionId {
    /// Creates a partition id from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw id value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PartitionId {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<PartitionId> for u32 {
    fn from(id: PartitionId) -> Self {
        id.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_next() {
        let offset = Offset::new(41);
        assert_eq!(offset.next().get(), 42);
        assert_eq!(Offset::default().get(), 0);
    }

    #[test]
    fn test_offset_ordering() {
        assert!(Offset::new(1) < Offset::new(2));
        assert_eq!(Offset::new(7), Offset::new(7));
    }

    #[test]
    fn test_offset_display() {
        assert_eq!(format!("{}", Offset::new(1234)), "1234");
    }

    #[test]
    fn test_partition_id_roundtrip() {
        let id = PartitionId::from(3u32);
        assert_eq!(u32::from(id), 3);
        assert_eq!(format!("{id}"), "3");
    }
}
