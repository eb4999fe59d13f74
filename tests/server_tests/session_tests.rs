//! Session Tests
//!
//! Tests verify:
//! - Autocommit writes reach the engine immediately
//! - Batched writes are visible only to their own session until commit
//! - Abort discards, commit applies atomically
//! - Out-of-state transitions fail without changing state

use bytes::Bytes;
use crossbeam::channel::unbounded;
use kvdb::config::WalSyncStrategy;
use kvdb::engine::{Engine, EngineOptions, StorageEngine};
use kvdb::protocol::{Message, Response};
use kvdb::server::{Session, TransactionMode};
use kvdb::KvdbError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_engine() -> (TempDir, Engine) {
    let dir = TempDir::new().unwrap();
    let engine = Engine::open(EngineOptions {
        dir: dir.path().join("db"),
        partitions: 2,
        wal_sync_strategy: WalSyncStrategy::EveryWrite,
    })
    .unwrap();
    (dir, engine)
}

fn session(key: &str) -> Session {
    let (tx, _rx) = unbounded();
    Session::new(key, tx)
}

fn b(s: &str) -> Bytes {
    Bytes::copy_from_slice(s.as_bytes())
}

fn pair(k: &str, v: &str) -> Vec<(Bytes, Bytes)> {
    vec![(b(k), b(v))]
}

// =============================================================================
// Autocommit Tests
// =============================================================================

#[test]
fn test_new_session_state() {
    let s = session("127.0.0.1:5000");

    assert_eq!(s.key(), "127.0.0.1:5000");
    assert_eq!(s.mode(), TransactionMode::AutoCommit);
    assert_eq!(s.database(), None);
    assert_eq!(s.pending_writes(), 0);
    assert!(!s.is_closed());
}

#[test]
fn test_autocommit_put_is_immediate() {
    let (_dir, engine) = setup_engine();
    let s = session("a");

    s.put(&engine, pair("k", "v")).unwrap();

    assert_eq!(engine.get(b"k").unwrap(), Some(b("v")));
    assert_eq!(s.pending_writes(), 0);
}

#[test]
fn test_autocommit_multi_pair_put() {
    let (_dir, engine) = setup_engine();
    let s = session("a");

    s.put(&engine, vec![(b("k1"), b("v1")), (b("k2"), b("v2"))])
        .unwrap();

    assert_eq!(engine.get(b"k1").unwrap(), Some(b("v1")));
    assert_eq!(engine.get(b"k2").unwrap(), Some(b("v2")));
}

// =============================================================================
// Batch Tests
// =============================================================================

#[test]
fn test_batch_read_your_writes() {
    let (_dir, engine) = setup_engine();
    engine.put(b"shared", b"old").unwrap();

    let writer = session("writer");
    let other = session("other");

    writer.batch_begin().unwrap();
    writer
        .put(&engine, vec![(b("shared"), b("new")), (b("fresh"), b("1"))])
        .unwrap();

    // The writer sees its own buffer
    assert_eq!(writer.get(&engine, b"shared").unwrap(), Some(b("new")));
    assert!(writer.exists(&engine, b"fresh").unwrap());
    assert_eq!(writer.pending_writes(), 2);

    // Nobody else does
    assert_eq!(other.get(&engine, b"shared").unwrap(), Some(b("old")));
    assert!(!other.exists(&engine, b"fresh").unwrap());
    assert_eq!(engine.get(b"fresh").unwrap(), None);
}

#[test]
fn test_batch_commit_applies_everything() {
    let (_dir, engine) = setup_engine();
    let s = session("a");

    s.batch_begin().unwrap();
    s.put(&engine, pair("k1", "v1")).unwrap();
    s.put(&engine, pair("k2", "v2")).unwrap();
    s.put(&engine, pair("k1", "v3")).unwrap();

    let applied = s.batch_commit(&engine).unwrap();

    assert_eq!(applied, 3);
    assert_eq!(s.mode(), TransactionMode::AutoCommit);
    assert_eq!(s.pending_writes(), 0);
    assert_eq!(engine.get(b"k1").unwrap(), Some(b("v3")));
    assert_eq!(engine.get(b"k2").unwrap(), Some(b("v2")));
}

#[test]
fn test_batch_abort_discards() {
    let (_dir, engine) = setup_engine();
    let s = session("a");

    s.batch_begin().unwrap();
    s.put(&engine, pair("k", "v")).unwrap();
    s.batch_abort().unwrap();

    assert_eq!(s.mode(), TransactionMode::AutoCommit);
    assert_eq!(s.get(&engine, b"k").unwrap(), None);
    assert_eq!(engine.get(b"k").unwrap(), None);
}

#[test]
fn test_empty_batch_commit() {
    let (_dir, engine) = setup_engine();
    let s = session("a");

    s.batch_begin().unwrap();
    assert_eq!(s.batch_commit(&engine).unwrap(), 0);
    assert_eq!(engine.entry_count(), 0);
}

#[test]
fn test_batch_commit_failure_returns_to_autocommit() {
    let (_dir, engine) = setup_engine();
    let s = session("a");

    s.batch_begin().unwrap();
    s.put(&engine, pair("k", "v")).unwrap();
    engine.close().unwrap();

    assert!(matches!(
        s.batch_commit(&engine),
        Err(KvdbError::Storage(_))
    ));
    assert_eq!(s.mode(), TransactionMode::AutoCommit);
    assert_eq!(s.pending_writes(), 0);
}

// =============================================================================
// Out-of-State Transition Tests
// =============================================================================

#[test]
fn test_begin_while_batching_keeps_buffer() {
    let (_dir, engine) = setup_engine();
    let s = session("a");

    s.batch_begin().unwrap();
    s.put(&engine, pair("k", "v")).unwrap();

    assert!(matches!(s.batch_begin(), Err(KvdbError::InvalidArgument(_))));
    assert_eq!(s.mode(), TransactionMode::Batching);
    assert_eq!(s.pending_writes(), 1);
}

#[test]
fn test_commit_and_abort_without_batch() {
    let (_dir, engine) = setup_engine();
    let s = session("a");

    assert!(matches!(
        s.batch_commit(&engine),
        Err(KvdbError::InvalidArgument(_))
    ));
    assert!(matches!(s.batch_abort(), Err(KvdbError::InvalidArgument(_))));
    assert_eq!(s.mode(), TransactionMode::AutoCommit);
}

#[test]
fn test_use_rejected_while_batching() {
    let s = session("a");
    s.set_database("first").unwrap();

    s.batch_begin().unwrap();
    assert!(s.set_database("second").is_err());
    assert_eq!(s.database().as_deref(), Some("first"));

    s.batch_abort().unwrap();
    s.set_database("second").unwrap();
    assert_eq!(s.database().as_deref(), Some("second"));
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_close_discards_uncommitted_writes() {
    let (_dir, engine) = setup_engine();
    let s = session("a");

    s.batch_begin().unwrap();
    s.put(&engine, pair("k", "v")).unwrap();
    s.close();

    assert!(s.is_closed());
    assert_eq!(s.mode(), TransactionMode::AutoCommit);
    assert_eq!(s.pending_writes(), 0);
    assert_eq!(engine.get(b"k").unwrap(), None);
}

#[test]
fn test_publish_reaches_receiver() {
    let (tx, rx) = unbounded();
    let s = Session::new("a", tx);

    s.publish(Message::response(5, Response::ok())).unwrap();

    assert_eq!(rx.recv().unwrap(), Message::response(5, Response::ok()));
}

#[test]
fn test_publish_after_receiver_dropped() {
    let (tx, rx) = unbounded();
    let s = Session::new("a", tx);
    drop(rx);

    assert!(matches!(
        s.publish(Message::response(1, Response::ok())),
        Err(KvdbError::Network(_))
    ));
}
