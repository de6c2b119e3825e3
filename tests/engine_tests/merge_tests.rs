//! Tests for Merge
//!
//! These tests verify:
//! - Merge shrinks a log full of overwritten records
//! - Live keys keep their latest values, before and after reopen
//! - Records are copied byte for byte (timestamp and CRC untouched)
//! - Empty merges, merges after deletes, failed merges
//! - The background MergeWorker
//!
//! No test depends on the physical order of records after a merge.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use caskdb::config::{Config, SyncStrategy};
use caskdb::engine::Engine;
use caskdb::{CaskError, MergeWorker};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn test_config(temp_dir: &TempDir) -> Config {
    Config::builder()
        .data_dir(temp_dir.path())
        .sync_strategy(SyncStrategy::EveryWrite)
        .build()
}

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(test_config(&temp_dir)).unwrap();
    (temp_dir, engine)
}

// =============================================================================
// Space Reclamation Tests
// =============================================================================

#[test]
fn test_merge_shrinks_overwritten_log() {
    let (_temp, engine) = setup_temp_engine();

    for round in 0..20 {
        for key in ["alpha", "beta", "gamma"] {
            engine
                .put(key.as_bytes(), format!("{}-{}", key, round).as_bytes())
                .unwrap();
        }
    }
    let size_before = fs::metadata(engine.log_path()).unwrap().len();

    let stats = engine.merge().unwrap();

    let size_after = fs::metadata(engine.log_path()).unwrap().len();
    assert!(size_after < size_before);
    assert_eq!(stats.bytes_before, size_before);
    assert_eq!(stats.bytes_after, size_after);
    assert_eq!(stats.live_keys, 3);
    assert_eq!(stats.bytes_reclaimed(), size_before - size_after);
    assert_eq!(engine.log_size(), size_after);

    for key in ["alpha", "beta", "gamma"] {
        assert_eq!(
            engine.get(key.as_bytes()).unwrap(),
            format!("{}-19", key).into_bytes()
        );
    }
}

#[test]
fn test_merge_result_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(test_config(&temp_dir)).unwrap();

    for i in 0..100 {
        engine
            .put(format!("key{}", i % 10).as_bytes(), format!("value{}", i).as_bytes())
            .unwrap();
    }
    engine.merge().unwrap();
    let merged_size = engine.log_size();
    engine.close().unwrap();

    let engine = Engine::open(test_config(&temp_dir)).unwrap();

    assert_eq!(engine.log_size(), merged_size);
    assert_eq!(engine.key_count(), 10);
    assert_eq!(engine.recovery().records_recovered, 10);
    for k in 0..10 {
        assert_eq!(
            engine.get(format!("key{}", k).as_bytes()).unwrap(),
            format!("value{}", 90 + k).into_bytes()
        );
    }
}

#[test]
fn test_merge_copies_records_verbatim() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"only", b"first").unwrap();
    let first_len = engine.log_size() as usize;
    engine.put(b"only", b"second").unwrap();

    let before = fs::read(engine.log_path()).unwrap();
    let latest_record = before[first_len..].to_vec();

    engine.merge().unwrap();

    let after = fs::read(engine.log_path()).unwrap();
    assert_eq!(after, latest_record);
}

#[test]
fn test_merge_with_no_keys_yields_empty_log() {
    let (_temp, engine) = setup_temp_engine();

    let stats = engine.merge().unwrap();

    assert_eq!(stats.live_keys, 0);
    assert_eq!(stats.bytes_after, 0);
    assert!(engine.log_path().exists());
    assert_eq!(fs::metadata(engine.log_path()).unwrap().len(), 0);
}

#[test]
fn test_merge_after_deleting_everything_yields_empty_log() {
    let (_temp, engine) = setup_temp_engine();
    engine.put(b"a", b"1").unwrap();
    engine.put(b"b", b"2").unwrap();
    engine.delete(b"a");
    engine.delete(b"b");

    engine.merge().unwrap();

    assert_eq!(engine.log_size(), 0);
    assert_eq!(engine.key_count(), 0);
}

#[test]
fn test_merge_drops_deleted_keys_for_good() {
    // Once merged away, a deleted key has no record left to replay
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(test_config(&temp_dir)).unwrap();
    engine.put(b"keep", b"1").unwrap();
    engine.put(b"drop", b"2").unwrap();
    engine.delete(b"drop");

    engine.merge().unwrap();
    engine.close().unwrap();

    let engine = Engine::open(test_config(&temp_dir)).unwrap();
    assert_eq!(engine.get(b"keep").unwrap(), b"1".to_vec());
    assert!(matches!(engine.get(b"drop"), Err(CaskError::KeyNotFound)));
}

#[test]
fn test_merge_leaves_no_merge_file() {
    let (temp, engine) = setup_temp_engine();
    engine.put(b"a", b"1").unwrap();
    engine.put(b"a", b"2").unwrap();

    engine.merge().unwrap();

    assert!(!engine.config().merge_path().exists());
    let files: Vec<_> = fs::read_dir(temp.path()).unwrap().collect();
    assert_eq!(files.len(), 1);
}

#[test]
fn test_writes_after_merge() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(test_config(&temp_dir)).unwrap();
    engine.put(b"a", b"1").unwrap();
    engine.put(b"a", b"2").unwrap();
    engine.merge().unwrap();

    engine.put(b"b", b"3").unwrap();
    engine.put(b"a", b"4").unwrap();
    assert_eq!(engine.get(b"a").unwrap(), b"4".to_vec());
    engine.close().unwrap();

    let engine = Engine::open(test_config(&temp_dir)).unwrap();
    assert_eq!(engine.get(b"a").unwrap(), b"4".to_vec());
    assert_eq!(engine.get(b"b").unwrap(), b"3".to_vec());
}

#[test]
fn test_repeated_merges_are_stable() {
    let (_temp, engine) = setup_temp_engine();
    for i in 0..10 {
        engine.put(format!("k{}", i).as_bytes(), b"v").unwrap();
    }

    let first = engine.merge().unwrap();
    let second = engine.merge().unwrap();

    assert_eq!(first.bytes_after, second.bytes_before);
    assert_eq!(second.bytes_before, second.bytes_after);
    assert_eq!(engine.key_count(), 10);
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_failed_merge_leaves_engine_untouched() {
    let (_temp, engine) = setup_temp_engine();
    engine.put(b"a", b"1").unwrap();
    engine.put(b"a", b"2").unwrap();
    engine.put(b"b", b"3").unwrap();
    let size = engine.log_size();

    // A directory where the merge file should go makes the copy phase fail
    fs::create_dir(engine.config().merge_path()).unwrap();

    let result = engine.merge();

    assert!(matches!(result, Err(CaskError::Io(_))));
    assert_eq!(engine.log_size(), size);
    assert_eq!(engine.key_count(), 2);
    assert_eq!(engine.get(b"a").unwrap(), b"2".to_vec());
    assert_eq!(engine.get(b"b").unwrap(), b"3".to_vec());

    // Still writable
    engine.put(b"c", b"4").unwrap();
    assert_eq!(engine.get(b"c").unwrap(), b"4".to_vec());
}

// =============================================================================
// MergeWorker Tests
// =============================================================================

#[test]
fn test_merge_worker_reports_stats() {
    let (_temp, engine) = setup_temp_engine();
    for i in 0..30 {
        engine.put(b"hot", format!("v{}", i).as_bytes()).unwrap();
    }
    let engine = Arc::new(engine);

    let worker = MergeWorker::spawn(Arc::clone(&engine)).unwrap();
    let outcome = worker.request().unwrap();
    let stats = outcome
        .recv_timeout(Duration::from_secs(10))
        .unwrap()
        .unwrap();

    assert_eq!(stats.live_keys, 1);
    assert!(stats.bytes_after < stats.bytes_before);
    assert_eq!(engine.get(b"hot").unwrap(), b"v29".to_vec());

    worker.shutdown().unwrap();
}

#[test]
fn test_merge_worker_fire_and_forget() {
    let (_temp, engine) = setup_temp_engine();
    for i in 0..30 {
        engine.put(b"hot", format!("v{}", i).as_bytes()).unwrap();
    }
    let size_before = engine.log_size();
    let engine = Arc::new(engine);

    let worker = MergeWorker::spawn(Arc::clone(&engine)).unwrap();
    drop(worker.request().unwrap());

    // Shutdown drains queued requests before joining
    worker.shutdown().unwrap();

    assert!(engine.log_size() < size_before);

    let engine = Arc::try_unwrap(engine).ok().unwrap();
    engine.close().unwrap();
}
