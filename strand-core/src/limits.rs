//! System-wide limits.
//!
//! Put limits on everything: every size that can grow has an explicit
//! maximum, and the on-disk format's 32-bit fields bound what a segment
//! may hold.

/// Default maximum size of a segment log file before the partition rolls
/// to a new segment (128 MiB).
pub const SEGMENT_MAX_BYTES_DEFAULT: u64 = 128 * 1024 * 1024;

/// Default spacing, in log-file bytes, between sparse index entries (4 KiB).
pub const INDEX_INTERVAL_BYTES_DEFAULT: u64 = 4096;

/// Hard ceiling on segment size. Index entries store byte positions as
/// `i32`, so a segment can never address past 2 GiB.
pub const SEGMENT_SIZE_BYTES_MAX: u64 = i32::MAX as u64;

/// Maximum payload length of a single record. The on-disk frame stores
/// the length as `i32`.
pub const PAYLOAD_SIZE_BYTES_MAX: u64 = i32::MAX as u64;

/// Maximum number of partitions a topic may be created with.
pub const PARTITIONS_PER_TOPIC_MAX: u32 = 1024;

/// Maximum length of a topic name in bytes. Topic names become directory
/// names, so they stay within common filesystem limits.
pub const TOPIC_NAME_BYTES_MAX: usize = 255;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_are_consistent() {
        assert!(INDEX_INTERVAL_BYTES_DEFAULT < SEGMENT_MAX_BYTES_DEFAULT);
        assert!(SEGMENT_MAX_BYTES_DEFAULT <= SEGMENT_SIZE_BYTES_MAX);
        assert!(PARTITIONS_PER_TOPIC_MAX >= 1);
        assert!(TOPIC_NAME_BYTES_MAX >= 1);
    }
}
