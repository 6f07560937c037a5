//! Log segments.
//!
//! A segment stores a contiguous range of offsets `[base_offset,
//! next_offset)` in two files under its partition directory:
//!
//! ```text
//! <20-digit base_offset>.log     framed records
//! <20-digit base_offset>.index   sparse (relative_offset, position) pairs
//! ```
//!
//! Appends are exclusive; reads take the shared lock and use positioned
//! I/O, so they never disturb the writer or each other. Opening a segment
//! runs recovery: the index file is replayed into memory and the log file
//! is scanned front to back, truncating the tail at the first record that
//! is torn, fails its CRC, or breaks offset continuity.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use parking_lot::RwLock;
use strand_core::limits::PAYLOAD_SIZE_BYTES_MAX;
use strand_core::{Offset, Record};
use tracing::{debug, warn};

use crate::config::LogConfig;
use crate::error::{LogError, LogResult};

/// Size of a record frame header: offset (8) + length (4) + crc (4).
pub const RECORD_HEADER_SIZE: usize = 16;

/// Size of one entry in the index file: relative offset (4) + position (4).
pub const INDEX_ENTRY_SIZE: usize = 8;

/// One sparse index entry: where in the log file the record with offset
/// `base_offset + relative_offset` begins.
#[derive(Debug, Clone, Copy)]
struct IndexEntry {
    relative_offset: i32,
    position: i32,
}

/// Mutable segment state guarded by the segment lock.
#[derive(Debug)]
struct SegmentState {
    /// Log file handle; `None` once the segment is closed.
    log_file: Option<File>,
    /// Index file handle; `None` once the segment is closed.
    index_file: Option<File>,
    /// Current byte size of the log file.
    size: u64,
    /// Offset the next append will assign.
    next_offset: Offset,
    /// In-memory sparse index, strictly increasing in relative offset.
    index: Vec<IndexEntry>,
}

/// A single log segment: one `.log` file plus one `.index` file.
#[derive(Debug)]
pub struct Segment {
    /// Smallest offset any record in this segment may carry. Immutable.
    base_offset: Offset,
    /// Path of the log file, kept for diagnostics.
    log_path: PathBuf,
    /// Configuration this segment was opened with.
    config: LogConfig,
    /// Lock-guarded mutable state.
    state: RwLock<SegmentState>,
}

impl Segment {
    /// Opens (creating if absent) the segment with the given base offset
    /// under `dir`, running recovery before the segment becomes visible.
    ///
    /// # Errors
    /// Returns an error if the directory or files cannot be created or if
    /// recovery hits an I/O failure.
    pub fn open(dir: &Path, base_offset: Offset, config: LogConfig) -> LogResult<Self> {
        fs::create_dir_all(dir).map_err(|e| LogError::io("create_dir", e))?;

        let log_path = dir.join(format!("{:020}.log", base_offset.get()));
        let index_path = dir.join(format!("{:020}.index", base_offset.get()));

        let log_file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&log_path)
            .map_err(|e| LogError::io("open_log", e))?;
        let index_file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&index_path)
            .map_err(|e| LogError::io("open_index", e))?;

        let (size, next_offset, index) = recover(&log_file, &index_file, base_offset, &log_path)?;

        debug!(
            segment = %log_path.display(),
            base_offset = %base_offset,
            next_offset = %next_offset,
            size,
            "opened segment"
        );

        Ok(Self {
            base_offset,
            log_path,
            config,
            state: RwLock::new(SegmentState {
                log_file: Some(log_file),
                index_file: Some(index_file),
                size,
                next_offset,
                index,
            }),
        })
    }

    /// Returns the base offset of this segment.
    #[must_use]
    pub const fn base_offset(&self) -> Offset {
        self.base_offset
    }

    /// Returns the offset the next append will assign.
    #[must_use]
    pub fn next_offset(&self) -> Offset {
        self.state.read().next_offset
    }

    /// Returns the current byte size of the log file.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.state.read().size
    }

    /// Returns true if `offset` falls inside `[base_offset, next_offset)`.
    #[must_use]
    pub fn contains(&self, offset: Offset) -> bool {
        offset >= self.base_offset && offset < self.state.read().next_offset
    }

    /// Appends one record and returns the offset it was assigned.
    ///
    /// The record is framed, written to the log file, and — when at least
    /// [`LogConfig::index_interval_bytes`] of log have accumulated since
    /// the last index entry — one index entry is written as well.
    /// `next_offset` is only advanced once every write has succeeded.
    ///
    /// # Errors
    /// Fails with [`LogError::Closed`] after [`Segment::close`],
    /// [`LogError::PayloadTooLarge`] if the payload cannot be framed, or
    /// [`LogError::Io`] on filesystem errors.
    pub fn append(&self, payload: &[u8]) -> LogResult<Offset> {
        let length = i32::try_from(payload.len()).map_err(|_| LogError::PayloadTooLarge {
            size: payload.len(),
            max: PAYLOAD_SIZE_BYTES_MAX,
        })?;

        let mut guard = self.state.write();
        let state = &mut *guard;

        let entry_offset = state.next_offset;
        let position = state.size;
        let crc = crc32fast::hash(payload);

        let mut frame = BytesMut::with_capacity(RECORD_HEADER_SIZE + payload.len());
        #[allow(clippy::cast_possible_wrap)] // Offsets stay far below i64::MAX.
        frame.put_i64(entry_offset.get() as i64);
        frame.put_i32(length);
        frame.put_u32(crc);
        frame.put_slice(payload);

        let mut log_file: &File = state.log_file.as_ref().ok_or(LogError::Closed)?;
        log_file.write_all(&frame).map_err(|e| LogError::io("append", e))?;

        if self.wants_index_entry(state, position) {
            let relative = i32::try_from(entry_offset.get() - self.base_offset.get())
                .map_err(|_| LogError::IndexOverflow { position })?;
            let position32 =
                i32::try_from(position).map_err(|_| LogError::IndexOverflow { position })?;

            let mut entry = [0u8; INDEX_ENTRY_SIZE];
            entry[..4].copy_from_slice(&relative.to_be_bytes());
            entry[4..].copy_from_slice(&position32.to_be_bytes());

            let mut index_file: &File = state.index_file.as_ref().ok_or(LogError::Closed)?;
            index_file
                .write_all(&entry)
                .map_err(|e| LogError::io("append_index", e))?;

            state.index.push(IndexEntry {
                relative_offset: relative,
                position: position32,
            });
        }

        state.size = position + frame.len() as u64;
        state.next_offset = entry_offset.next();
        Ok(entry_offset)
    }

    /// Returns the record with exactly the given offset.
    ///
    /// The in-memory index is binary-searched for the closest preceding
    /// entry, then records are scanned forward from that position. CRCs
    /// are not re-verified here; recovery established integrity at open.
    ///
    /// # Errors
    /// Fails with [`LogError::OffsetOutOfRange`] outside
    /// `[base_offset, next_offset)`, [`LogError::OffsetNotFound`] if the
    /// scan passes the target (log/index inconsistency), or
    /// [`LogError::Io`] on filesystem errors.
    pub fn read(&self, offset: Offset) -> LogResult<Record> {
        let state = self.state.read();
        let log_file = state.log_file.as_ref().ok_or(LogError::Closed)?;

        if offset < self.base_offset || offset >= state.next_offset {
            return Err(LogError::OffsetOutOfRange {
                offset,
                first: self.base_offset,
                next: state.next_offset,
            });
        }

        let mut position = find_position(&state.index, offset.get() - self.base_offset.get());

        while position + RECORD_HEADER_SIZE as u64 <= state.size {
            let mut header = [0u8; RECORD_HEADER_SIZE];
            log_file
                .read_exact_at(&mut header, position)
                .map_err(|e| LogError::io("read_header", e))?;

            let mut buf = &header[..];
            let entry_offset = buf.get_i64();
            let length = buf.get_i32();
            let _crc = buf.get_u32();

            if entry_offset < 0 || length < 0 {
                return Err(LogError::io("decode", "negative frame field"));
            }

            #[allow(clippy::cast_sign_loss)] // Both checked non-negative above.
            let (entry_offset, length) = (entry_offset as u64, length as u64);

            if entry_offset == offset.get() {
                #[allow(clippy::cast_possible_truncation)] // length <= i32::MAX.
                let mut payload = vec![0u8; length as usize];
                log_file
                    .read_exact_at(&mut payload, position + RECORD_HEADER_SIZE as u64)
                    .map_err(|e| LogError::io("read_payload", e))?;
                return Ok(Record::new(offset, Bytes::from(payload)));
            }

            if entry_offset > offset.get() {
                return Err(LogError::OffsetNotFound { offset });
            }

            position += RECORD_HEADER_SIZE as u64 + length;
        }

        Err(LogError::OffsetNotFound { offset })
    }

    /// Flushes and closes both files. Idempotent; subsequent appends and
    /// reads fail with [`LogError::Closed`].
    ///
    /// # Errors
    /// Returns the first sync failure; the file handles are released
    /// either way.
    pub fn close(&self) -> LogResult<()> {
        let (log_file, index_file) = {
            let mut state = self.state.write();
            (state.log_file.take(), state.index_file.take())
        };

        let mut result = Ok(());
        if let Some(file) = log_file {
            if let Err(e) = file.sync_all() {
                result = Err(LogError::io("sync_log", e));
            }
        }
        if let Some(file) = index_file {
            if let Err(e) = file.sync_all() {
                if result.is_ok() {
                    result = Err(LogError::io("sync_index", e));
                }
            }
        }
        result
    }

    /// Index policy: the first record of a segment is always indexed;
    /// after that, one entry per `index_interval_bytes` of log data.
    #[allow(clippy::cast_sign_loss)] // Index positions are non-negative by construction.
    fn wants_index_entry(&self, state: &SegmentState, position: u64) -> bool {
        state.index.last().map_or(true, |last| {
            position - last.position as u64 >= self.config.index_interval_bytes
        })
    }

    /// Returns the path of the log file.
    #[must_use]
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}

/// Binary-searches the sparse index for the scan start position of the
/// record with the given relative offset.
#[allow(clippy::cast_sign_loss)] // Index fields are non-negative by construction.
fn find_position(index: &[IndexEntry], relative: u64) -> u64 {
    let idx = index.partition_point(|e| e.relative_offset as u64 <= relative);
    if idx == 0 {
        0
    } else {
        index[idx - 1].position as u64
    }
}

/// Rebuilds in-memory state from the two files.
///
/// The index file is replayed first (a partial trailing pair is
/// tolerated). The log file is then scanned from byte 0; the scan stops
/// and truncates the file at the first record that is torn, fails its
/// CRC, or does not carry the expected next offset. Index entries
/// pointing at or past the truncation point are cut, in memory and on
/// disk, so the index stays ordered across later appends.
#[allow(clippy::cast_sign_loss)] // Fields are validated non-negative before casts.
fn recover(
    log_file: &File,
    index_file: &File,
    base_offset: Offset,
    log_path: &Path,
) -> LogResult<(u64, Offset, Vec<IndexEntry>)> {
    let mut index = load_index(index_file)?;

    let file_len = log_file
        .metadata()
        .map_err(|e| LogError::io("metadata", e))?
        .len();

    let mut position = 0u64;
    let mut next_offset = base_offset;

    while position + RECORD_HEADER_SIZE as u64 <= file_len {
        let mut header = [0u8; RECORD_HEADER_SIZE];
        log_file
            .read_exact_at(&mut header, position)
            .map_err(|e| LogError::io("read_header", e))?;

        let mut buf = &header[..];
        let entry_offset = buf.get_i64();
        let length = buf.get_i32();
        let crc = buf.get_u32();

        if entry_offset < 0 || length < 0 {
            break;
        }
        if entry_offset as u64 != next_offset.get() {
            break;
        }
        let length = length as u64;
        if position + RECORD_HEADER_SIZE as u64 + length > file_len {
            break;
        }

        #[allow(clippy::cast_possible_truncation)] // length <= i32::MAX.
        let mut payload = vec![0u8; length as usize];
        log_file
            .read_exact_at(&mut payload, position + RECORD_HEADER_SIZE as u64)
            .map_err(|e| LogError::io("read_payload", e))?;

        if crc32fast::hash(&payload) != crc {
            break;
        }

        next_offset = next_offset.next();
        position += RECORD_HEADER_SIZE as u64 + length;
    }

    if position < file_len {
        warn!(
            segment = %log_path.display(),
            truncated_at = position,
            dropped_bytes = file_len - position,
            "truncating log tail during recovery"
        );
        log_file
            .set_len(position)
            .map_err(|e| LogError::io("truncate", e))?;
    }

    // Cut the index at the first entry pointing past the surviving log,
    // and shorten the file to match. Without the file truncation, entries
    // appended after a recovery would land behind stale ones and the
    // index would stop being ordered.
    let keep = index
        .iter()
        .position(|e| e.relative_offset < 0 || e.position < 0 || (e.position as u64) >= position)
        .unwrap_or(index.len());
    if keep < index.len() {
        index.truncate(keep);
        index_file
            .set_len((keep * INDEX_ENTRY_SIZE) as u64)
            .map_err(|e| LogError::io("truncate_index", e))?;
    }

    Ok((position, next_offset, index))
}

/// Reads every complete `(relative_offset, position)` pair from the index
/// file. A partial trailing pair terminates the load.
fn load_index(index_file: &File) -> LogResult<Vec<IndexEntry>> {
    let len = index_file
        .metadata()
        .map_err(|e| LogError::io("metadata", e))?
        .len();
    let usable = len - len % INDEX_ENTRY_SIZE as u64;

    #[allow(clippy::cast_possible_truncation)] // Bounded by segment size limits.
    let mut buf = vec![0u8; usable as usize];
    index_file
        .read_exact_at(&mut buf, 0)
        .map_err(|e| LogError::io("read_index", e))?;

    Ok(buf
        .chunks_exact(INDEX_ENTRY_SIZE)
        .map(|chunk| IndexEntry {
            relative_offset: i32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
            position: i32::from_be_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]),
        })
        .collect())
}
