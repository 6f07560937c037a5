//! Partitions.
//!
//! A partition is an ordered, never-empty list of segments under one
//! directory, `<data_root>/<topic>/partition<id>`. The last segment is
//! the active one; it alone accepts appends. When the active segment
//! reaches the configured size threshold, the partition rolls: a new
//! segment is created whose base offset equals the active segment's next
//! offset, so segment ranges tile `[0, next_offset)` without gaps.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use strand_core::{Offset, PartitionId, Record};
use tracing::{debug, warn};

use crate::config::LogConfig;
use crate::error::{LogError, LogResult};
use crate::segment::Segment;

/// A single partition of a topic.
#[derive(Debug)]
pub struct Partition {
    /// Partition id within its topic.
    id: PartitionId,
    /// Directory holding this partition's segment files.
    dir: PathBuf,
    /// Configuration shared by all segments.
    config: LogConfig,
    /// Segments in ascending base-offset order; never empty.
    segments: RwLock<Vec<Arc<Segment>>>,
}

impl Partition {
    /// Opens the partition directory, loading every segment found there
    /// in base-offset order. A missing or empty directory yields a single
    /// empty segment at base offset 0.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or any segment
    /// fails to open.
    pub fn open(
        data_root: &Path,
        topic: &str,
        id: PartitionId,
        config: LogConfig,
    ) -> LogResult<Self> {
        config.validate()?;

        let dir = data_root.join(topic).join(format!("partition{id}"));
        let mut segments = load_segments(&dir, config)?;

        if segments.is_empty() {
            segments.push(Arc::new(Segment::open(&dir, Offset::new(0), config)?));
        }

        debug!(
            partition = %dir.display(),
            segments = segments.len(),
            "opened partition"
        );

        Ok(Self {
            id,
            dir,
            config,
            segments: RwLock::new(segments),
        })
    }

    /// Returns this partition's id.
    #[must_use]
    pub const fn id(&self) -> PartitionId {
        self.id
    }

    /// Returns the directory this partition stores its segments in.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the number of segments currently open.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.read().len()
    }

    /// Returns the offset the next successful append will assign.
    #[must_use]
    pub fn next_offset(&self) -> Offset {
        self.segments
            .read()
            .last()
            .map_or(Offset::new(0), |active| active.next_offset())
    }

    /// Appends one record and returns its assigned offset.
    ///
    /// If the active segment has reached the size threshold, the
    /// partition rolls first; the roll and the append happen under the
    /// same exclusive lock, so offset assignment stays monotonic.
    ///
    /// # Errors
    /// Surfaces any error from segment creation or the append itself.
    pub fn append(&self, payload: &[u8]) -> LogResult<Offset> {
        let mut segments = self.segments.write();

        if let Some(active) = segments.last() {
            if active.size() >= self.config.segment_max_bytes {
                let base = active.next_offset();
                let rolled = Arc::new(Segment::open(&self.dir, base, self.config)?);
                debug!(
                    partition = %self.dir.display(),
                    base_offset = %base,
                    "rolled to new segment"
                );
                segments.push(rolled);
            }
        }

        let Some(active) = segments.last() else {
            return Err(LogError::io("append", "partition has no segments"));
        };
        active.append(payload)
    }

    /// Returns the record with exactly the given offset.
    ///
    /// The segment list is scanned under the shared lock for the segment
    /// covering the offset; the lock is released before the segment does
    /// file I/O, so long reads from sealed segments do not block rolls.
    ///
    /// # Errors
    /// Fails with [`LogError::OffsetOutOfRange`] past the tail and
    /// surfaces segment errors otherwise.
    pub fn read(&self, offset: Offset) -> LogResult<Record> {
        let segment = {
            let segments = self.segments.read();
            let covering = segments.iter().find(|s| s.contains(offset));
            // Offsets at or past the tail fall through to the active
            // segment, which reports the range error with the live tail.
            match covering.or_else(|| segments.last()) {
                Some(segment) => Arc::clone(segment),
                None => return Err(LogError::OffsetNotFound { offset }),
            }
        };
        segment.read(offset)
    }

    /// Flushes and closes every segment. Idempotent.
    ///
    /// # Errors
    /// Returns the first close failure after attempting to close every
    /// segment.
    pub fn close(&self) -> LogResult<()> {
        let segments = self.segments.write();
        let mut result = Ok(());
        for segment in segments.iter() {
            if let Err(e) = segment.close() {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }
}

/// Parses a segment base offset back out of a `.log` file path.
///
/// # Errors
/// Returns [`LogError::InvalidFilename`] if the file stem is not a plain
/// decimal integer.
pub fn parse_base_offset(path: &Path) -> LogResult<Offset> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| invalid_filename(path))?;
    let base = stem
        .parse::<u64>()
        .map_err(|_| invalid_filename(path))?;
    Ok(Offset::new(base))
}

fn invalid_filename(path: &Path) -> LogError {
    LogError::InvalidFilename {
        name: path
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().into_owned()),
    }
}

/// Scans `dir` for `*.log` files and opens each as a segment, ascending
/// by base offset. Files whose names do not parse are skipped.
fn load_segments(dir: &Path, config: LogConfig) -> LogResult<Vec<Arc<Segment>>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|e| LogError::io("read_dir", e))?;
    let mut bases = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| LogError::io("read_dir", e))?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "log") {
            match parse_base_offset(&path) {
                Ok(base) => bases.push(base),
                Err(_) => {
                    warn!(file = %path.display(), "skipping unparseable segment filename");
                }
            }
        }
    }
    bases.sort_unstable();

    let mut segments: Vec<Arc<Segment>> = Vec::with_capacity(bases.len());
    for base in bases {
        match Segment::open(dir, base, config) {
            Ok(segment) => segments.push(Arc::new(segment)),
            Err(e) => {
                for opened in &segments {
                    let _ = opened.close();
                }
                return Err(e);
            }
        }
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> LogConfig {
        LogConfig::new()
            .with_segment_max_bytes(256)
            .with_index_interval_bytes(64)
    }

    fn open_partition(root: &Path, config: LogConfig) -> Partition {
        Partition::open(root, "events", PartitionId::new(0), config).unwrap()
    }

    #[test]
    fn test_new_partition_starts_at_zero() {
        let root = tempfile::tempdir().unwrap();
        let partition = open_partition(root.path(), LogConfig::new());
        assert_eq!(partition.next_offset(), Offset::new(0));
        assert_eq!(partition.segment_count(), 1);
        assert!(partition.dir().ends_with("events/partition0"));
    }

    #[test]
    fn test_append_read_roundtrip() {
        let root = tempfile::tempdir().unwrap();
        let partition = open_partition(root.path(), LogConfig::new());

        assert_eq!(partition.append(b"hello").unwrap(), Offset::new(0));
        assert_eq!(partition.append(b"world").unwrap(), Offset::new(1));

        assert_eq!(&partition.read(Offset::new(0)).unwrap().payload[..], b"hello");
        assert_eq!(&partition.read(Offset::new(1)).unwrap().payload[..], b"world");
    }

    #[test]
    fn test_read_past_tail_is_out_of_range() {
        let root = tempfile::tempdir().unwrap();
        let partition = open_partition(root.path(), LogConfig::new());
        partition.append(b"only").unwrap();

        let err = partition.read(Offset::new(1)).unwrap_err();
        assert!(err.is_past_end());
    }

    #[test]
    fn test_rolls_when_threshold_reached() {
        let root = tempfile::tempdir().unwrap();
        let partition = open_partition(root.path(), small_config());

        // 32-byte frames; the 256-byte threshold forces several rolls.
        for i in 0..40 {
            assert_eq!(partition.append(&[b'x'; 16]).unwrap(), Offset::new(i));
        }
        assert!(partition.segment_count() >= 2);

        // Every offset stays readable across all segments.
        for i in 0..40 {
            assert_eq!(partition.read(Offset::new(i)).unwrap().offset, Offset::new(i));
        }
    }

    #[test]
    fn test_segment_bases_tile_the_offset_space() {
        let root = tempfile::tempdir().unwrap();
        let partition = open_partition(root.path(), small_config());
        for _ in 0..40 {
            partition.append(&[b'y'; 16]).unwrap();
        }

        let segments = partition.segments.read();
        let mut expected_base = Offset::new(0);
        for segment in segments.iter() {
            assert_eq!(segment.base_offset(), expected_base);
            expected_base = segment.next_offset();
        }
        assert_eq!(expected_base, Offset::new(40));
    }

    #[test]
    fn test_reopen_recovers_all_segments() {
        let root = tempfile::tempdir().unwrap();
        {
            let partition = open_partition(root.path(), small_config());
            for _ in 0..40 {
                partition.append(&[b'z'; 16]).unwrap();
            }
            partition.close().unwrap();
        }

        let partition = open_partition(root.path(), small_config());
        assert!(partition.segment_count() >= 2);
        assert_eq!(partition.next_offset(), Offset::new(40));
        assert_eq!(partition.append(&[b'z'; 16]).unwrap(), Offset::new(40));
    }

    #[test]
    fn test_scan_skips_unparseable_filenames() {
        let root = tempfile::tempdir().unwrap();
        {
            let partition = open_partition(root.path(), LogConfig::new());
            partition.append(b"keep").unwrap();
            partition.close().unwrap();
        }

        let dir = root.path().join("events").join("partition0");
        fs::write(dir.join("notes.log"), b"not a segment").unwrap();

        let partition = open_partition(root.path(), LogConfig::new());
        assert_eq!(partition.segment_count(), 1);
        assert_eq!(partition.next_offset(), Offset::new(1));
    }

    #[test]
    fn test_parse_base_offset() {
        let ok = parse_base_offset(Path::new("/d/00000000000000001234.log")).unwrap();
        assert_eq!(ok, Offset::new(1234));

        let err = parse_base_offset(Path::new("/d/notes.log"));
        assert!(matches!(err, Err(LogError::InvalidFilename { .. })));
    }

    #[test]
    fn test_invalid_config_rejected_at_open() {
        let root = tempfile::tempdir().unwrap();
        let config = LogConfig::new().with_segment_max_bytes(0);
        let result = Partition::open(root.path(), "events", PartitionId::new(0), config);
        assert!(matches!(result, Err(LogError::InvalidConfig { .. })));
    }
}
