//! WAL Tests
//!
//! Tests verify:
//! - Appending and reading entries in LSN order
//! - Batch entries survive as one unit
//! - CRC validation
//! - Recovery truncates torn tails

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use kvdb::config::WalSyncStrategy;
use kvdb::wal::{Operation, WalEntry, WalReader, WalRecovery, WalWriter, HEADER_SIZE};
use kvdb::KvdbError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn wal_path(dir: &TempDir) -> PathBuf {
    dir.path().join("wal.log")
}

fn put(key: &str, value: &str) -> Operation {
    Operation::Put {
        key: key.as_bytes().to_vec(),
        value: value.as_bytes().to_vec(),
    }
}

fn write_entries(path: &Path, ops: Vec<Operation>) -> u64 {
    let mut writer = WalWriter::open(path, WalSyncStrategy::EveryWrite, 1).unwrap();
    for op in ops {
        writer.append(op).unwrap();
    }
    writer.current_lsn()
}

fn read_all(path: &Path) -> Vec<WalEntry> {
    let mut reader = WalReader::open(path).unwrap();
    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry().unwrap() {
        entries.push(entry);
    }
    entries
}

// =============================================================================
// Writer / Reader Tests
// =============================================================================

#[test]
fn test_append_assigns_increasing_lsns() {
    let dir = TempDir::new().unwrap();
    let mut writer =
        WalWriter::open(&wal_path(&dir), WalSyncStrategy::EveryNEntries { count: 2 }, 1).unwrap();

    assert_eq!(writer.current_lsn(), 0);
    assert_eq!(writer.append(put("a", "1")).unwrap(), 1);
    assert_eq!(writer.append(put("b", "2")).unwrap(), 2);
    assert_eq!(writer.append(put("c", "3")).unwrap(), 3);
    assert_eq!(writer.current_lsn(), 3);
}

#[test]
fn test_read_back_in_order() {
    let dir = TempDir::new().unwrap();
    let path = wal_path(&dir);
    write_entries(&path, vec![put("a", "1"), put("b", "2"), put("a", "3")]);

    let entries = read_all(&path);
    let lsns: Vec<u64> = entries.iter().map(|e| e.lsn).collect();
    assert_eq!(lsns, vec![1, 2, 3]);
    assert_eq!(entries[2].operation, put("a", "3"));
}

#[test]
fn test_batch_entry_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = wal_path(&dir);
    let batch = Operation::Batch {
        pairs: vec![
            (b"k1".to_vec(), b"v1".to_vec()),
            (b"k2".to_vec(), Vec::new()),
        ],
    };
    write_entries(&path, vec![batch.clone()]);

    let entries = read_all(&path);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].operation, batch);
}

#[test]
fn test_reader_on_empty_file() {
    let dir = TempDir::new().unwrap();
    let path = wal_path(&dir);
    fs::write(&path, b"").unwrap();

    let mut reader = WalReader::open(&path).unwrap();
    assert!(reader.next_entry().unwrap().is_none());
    assert_eq!(reader.position(), 0);
}

#[test]
fn test_record_layout() {
    let entry = WalEntry::new(42, put("key", "value"));
    let record = entry.to_record().unwrap();

    assert_eq!(&record[0..8], &42u64.to_be_bytes());
    let len = u32::from_be_bytes([record[12], record[13], record[14], record[15]]) as usize;
    assert_eq!(record.len(), HEADER_SIZE + len);
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_crc_mismatch_detected() {
    let dir = TempDir::new().unwrap();
    let path = wal_path(&dir);
    write_entries(&path, vec![put("a", "1")]);

    let mut raw = fs::read(&path).unwrap();
    let last = raw.len() - 1;
    raw[last] ^= 0xFF;
    fs::write(&path, &raw).unwrap();

    let mut reader = WalReader::open(&path).unwrap();
    assert!(matches!(
        reader.next_entry(),
        Err(KvdbError::WalCorruption(_))
    ));
}

#[test]
fn test_partial_header_detected() {
    let dir = TempDir::new().unwrap();
    let path = wal_path(&dir);
    fs::write(&path, [0u8; HEADER_SIZE - 1]).unwrap();

    let mut reader = WalReader::open(&path).unwrap();
    assert!(matches!(
        reader.next_entry(),
        Err(KvdbError::WalCorruption(_))
    ));
}

#[test]
fn test_oversized_length_detected_before_reading() {
    let dir = TempDir::new().unwrap();
    let path = wal_path(&dir);
    write_entries(&path, vec![put("a", "1")]);
    let valid_len = fs::metadata(&path).unwrap().len();

    // Header whose length field runs far past the end of the file
    let mut header = [0u8; HEADER_SIZE];
    header[0..8].copy_from_slice(&2u64.to_be_bytes());
    header[12..16].copy_from_slice(&u32::MAX.to_be_bytes());
    OpenOptions::new()
        .append(true)
        .open(&path)
        .unwrap()
        .write_all(&header)
        .unwrap();

    let mut reader = WalReader::open(&path).unwrap();
    assert_eq!(reader.next_entry().unwrap().unwrap().lsn, 1);
    assert!(matches!(
        reader.next_entry(),
        Err(KvdbError::WalCorruption(_))
    ));
    assert_eq!(reader.position(), valid_len);

    let (entries, result) = WalRecovery::recover(&path).unwrap();
    assert_eq!(entries.len(), 1);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&path).unwrap().len(), valid_len);
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_recover_clean_log() {
    let dir = TempDir::new().unwrap();
    let path = wal_path(&dir);
    write_entries(&path, vec![put("a", "1"), put("b", "2")]);

    let (entries, result) = WalRecovery::recover(&path).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(result.entries_recovered, 2);
    assert_eq!(result.last_lsn, 2);
    assert_eq!(result.bytes_discarded, 0);
    assert!(!result.was_truncated);
}

#[test]
fn test_recover_truncates_torn_tail() {
    let dir = TempDir::new().unwrap();
    let path = wal_path(&dir);
    write_entries(&path, vec![put("a", "1"), put("b", "2")]);
    let valid_len = fs::metadata(&path).unwrap().len();

    // Half of a third record
    let torn = WalEntry::new(3, put("c", "3")).to_record().unwrap();
    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(&torn[..torn.len() / 2]).unwrap();
    drop(file);

    let verified = WalRecovery::verify(&path).unwrap();
    assert_eq!(verified.entries_recovered, 2);
    assert!(verified.bytes_discarded > 0);
    // verify leaves the file alone
    assert!(fs::metadata(&path).unwrap().len() > valid_len);

    let (entries, result) = WalRecovery::recover(&path).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(result.last_lsn, 2);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&path).unwrap().len(), valid_len);
}

#[test]
fn test_recover_then_continue_appending() {
    let dir = TempDir::new().unwrap();
    let path = wal_path(&dir);
    write_entries(&path, vec![put("a", "1")]);
    fs::OpenOptions::new()
        .append(true)
        .open(&path)
        .unwrap()
        .write_all(&[1, 2, 3])
        .unwrap();

    let (_, result) = WalRecovery::recover(&path).unwrap();
    let mut writer =
        WalWriter::open(&path, WalSyncStrategy::EveryWrite, result.last_lsn + 1).unwrap();
    writer.append(put("b", "2")).unwrap();
    drop(writer);

    let lsns: Vec<u64> = read_all(&path).iter().map(|e| e.lsn).collect();
    assert_eq!(lsns, vec![1, 2]);
}
