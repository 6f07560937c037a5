//! Crash and restart behavior of partitions on real directories.

use std::fs;
use std::path::{Path, PathBuf};

use strand_core::{Offset, PartitionId};
use strand_log::{LogConfig, LogError, Partition, INDEX_ENTRY_SIZE, RECORD_HEADER_SIZE};

fn open(root: &Path, config: LogConfig) -> Partition {
    Partition::open(root, "orders", PartitionId::new(0), config).unwrap()
}

fn partition_dir(root: &Path) -> PathBuf {
    root.join("orders").join("partition0")
}

fn log_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<_> = fs::read_dir(partition_dir(root))
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "log"))
        .collect();
    files.sort();
    files
}

#[test]
fn rolling_keeps_every_offset_readable() {
    let root = tempfile::tempdir().unwrap();
    let config = LogConfig::new().with_segment_max_bytes(1024);

    let partition = open(root.path(), config);
    for i in 0..200 {
        assert_eq!(partition.append(&[b'r'; 16]).unwrap(), Offset::new(i));
    }

    assert!(log_files(root.path()).len() >= 2);
    for i in 0..200 {
        let record = partition.read(Offset::new(i)).unwrap();
        assert_eq!(record.offset, Offset::new(i));
        assert_eq!(record.payload.len(), 16);
    }
}

#[test]
fn sparse_index_stays_bounded_and_correct() {
    let root = tempfile::tempdir().unwrap();
    let interval = 64u64;
    let config = LogConfig::new().with_index_interval_bytes(interval);

    let partition = open(root.path(), config);
    for i in 0..1000u64 {
        let payload = [u8::try_from(i % 251).unwrap(); 32];
        partition.append(&payload).unwrap();
    }

    // 48-byte frames against a 64-byte interval index every other record.
    let index_path = partition_dir(root.path()).join(format!("{:020}.index", 0));
    let entries = fs::metadata(index_path).unwrap().len() / INDEX_ENTRY_SIZE as u64;
    assert_eq!(entries, 500);

    let log_bytes = 1000 * (RECORD_HEADER_SIZE as u64 + 32);
    assert!(entries <= log_bytes.div_ceil(interval) + 1);

    // Random-access reads across the whole range.
    for step in 0..100u64 {
        let offset = Offset::new(step * 10 + 3);
        let record = partition.read(offset).unwrap();
        assert_eq!(record.offset, offset);
        assert_eq!(record.payload[0], u8::try_from((step * 10 + 3) % 251).unwrap());
    }
}

#[test]
fn reopen_preserves_offsets_and_records() {
    let root = tempfile::tempdir().unwrap();
    {
        let partition = open(root.path(), LogConfig::new());
        for payload in [&b"a"[..], b"b", b"c"] {
            partition.append(payload).unwrap();
        }
        partition.close().unwrap();
    }

    let partition = open(root.path(), LogConfig::new());
    assert_eq!(partition.next_offset(), Offset::new(3));
    assert_eq!(partition.append(b"d").unwrap(), Offset::new(3));
    assert_eq!(&partition.read(Offset::new(2)).unwrap().payload[..], b"c");
    assert_eq!(&partition.read(Offset::new(3)).unwrap().payload[..], b"d");
}

#[test]
fn corrupt_record_truncates_the_tail() {
    let root = tempfile::tempdir().unwrap();
    {
        let partition = open(root.path(), LogConfig::new());
        for i in 0..10 {
            partition.append(format!("payload{i}").as_bytes()).unwrap();
        }
        partition.close().unwrap();
    }

    // Flip one bit inside the payload of record 7.
    let log_path = &log_files(root.path())[0];
    let mut bytes = fs::read(log_path).unwrap();
    let frame = RECORD_HEADER_SIZE + "payload0".len();
    bytes[7 * frame + RECORD_HEADER_SIZE + 2] ^= 0x10;
    fs::write(log_path, &bytes).unwrap();

    let partition = open(root.path(), LogConfig::new());
    assert_eq!(partition.next_offset(), Offset::new(7));
    for i in 0..7 {
        assert_eq!(
            partition.read(Offset::new(i)).unwrap().payload,
            format!("payload{i}").as_bytes()
        );
    }
    let err = partition.read(Offset::new(7)).unwrap_err();
    assert!(matches!(err, LogError::OffsetOutOfRange { .. }));
}

#[test]
fn zero_filled_tail_is_discarded() {
    let root = tempfile::tempdir().unwrap();
    {
        let partition = open(root.path(), LogConfig::new());
        for i in 0..5 {
            partition.append(format!("entry-{i}").as_bytes()).unwrap();
        }
        partition.close().unwrap();
    }

    let log_path = &log_files(root.path())[0];
    let intact_len = fs::metadata(log_path).unwrap().len();
    let mut bytes = fs::read(log_path).unwrap();
    bytes.extend_from_slice(&[0u8; 37]);
    fs::write(log_path, &bytes).unwrap();

    let partition = open(root.path(), LogConfig::new());
    assert_eq!(partition.next_offset(), Offset::new(5));
    for i in 0..5 {
        assert_eq!(
            partition.read(Offset::new(i)).unwrap().payload,
            format!("entry-{i}").as_bytes()
        );
    }
    assert!(partition.read(Offset::new(5)).unwrap_err().is_past_end());
    assert_eq!(fs::metadata(log_path).unwrap().len(), intact_len);
}

#[test]
fn truncated_segment_accepts_new_appends() {
    let root = tempfile::tempdir().unwrap();
    let config = LogConfig::new().with_index_interval_bytes(32);
    {
        let partition = open(root.path(), config);
        for i in 0..8 {
            partition.append(format!("record-{i}").as_bytes()).unwrap();
        }
        partition.close().unwrap();
    }

    // Corrupt record 3, reopen, and write fresh records over the tail.
    let log_path = &log_files(root.path())[0];
    let mut bytes = fs::read(log_path).unwrap();
    let frame = RECORD_HEADER_SIZE + "record-0".len();
    bytes[3 * frame + RECORD_HEADER_SIZE] ^= 0xFF;
    fs::write(log_path, &bytes).unwrap();

    {
        let partition = open(root.path(), config);
        assert_eq!(partition.next_offset(), Offset::new(3));
        for i in 3..8 {
            assert_eq!(
                partition.append(format!("replay-{i}").as_bytes()).unwrap(),
                Offset::new(i)
            );
        }
        partition.close().unwrap();
    }

    // A second restart must see the replayed records, not the old tail.
    let partition = open(root.path(), config);
    assert_eq!(partition.next_offset(), Offset::new(8));
    assert_eq!(
        partition.read(Offset::new(2)).unwrap().payload,
        b"record-2".as_ref()
    );
    for i in 3..8 {
        assert_eq!(
            partition.read(Offset::new(i)).unwrap().payload,
            format!("replay-{i}").as_bytes()
        );
    }
}

#[test]
fn offset_density_holds_after_appends() {
    let root = tempfile::tempdir().unwrap();
    let partition = open(root.path(), LogConfig::new());

    for _ in 0..25 {
        partition.append(b"dense").unwrap();
    }
    for i in 0..25 {
        assert!(partition.read(Offset::new(i)).is_ok());
    }
    assert!(partition.read(Offset::new(25)).unwrap_err().is_past_end());
}
