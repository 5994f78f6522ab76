// Ledger Store Tests
// Tests for duplicate suppression, ordering and persist-before-commit

use ledgermesh::ledger::{InsertOutcome, LedgerError, LedgerStore, SyncReport, Transaction};
use ledgermesh::storage::{LedgerSink, MemorySink, SledSink, StoreError};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn memory_store() -> (Arc<MemorySink>, LedgerStore) {
    let sink = Arc::new(MemorySink::new());
    let store = LedgerStore::open(sink.clone()).unwrap();
    (sink, store)
}

// ============================================================================
// INSERT
// ============================================================================

#[test]
fn test_insert_is_idempotent() {
    let (_, store) = memory_store();
    let tx = Transaction::new("0xa", "0xb", 5.0);

    assert_eq!(store.insert(tx.clone()).unwrap(), InsertOutcome::Inserted);
    assert_eq!(store.insert(tx.clone()).unwrap(), InsertOutcome::Duplicate);
    assert_eq!(store.insert(tx.clone()).unwrap(), InsertOutcome::Duplicate);

    assert_eq!(store.snapshot(), vec![tx]);
}

#[test]
fn test_insert_keeps_arrival_order() {
    let (_, store) = memory_store();
    let first = Transaction::new("0xa", "0xb", 1.0);
    let second = Transaction::new("0xa", "0xb", 2.0);
    let third = Transaction::new("0xb", "0xa", 1.0);

    store.insert(first.clone()).unwrap();
    store.insert(second.clone()).unwrap();
    store.insert(third.clone()).unwrap();

    assert_eq!(store.snapshot(), vec![first, second, third]);
}

#[test]
fn test_equal_fields_are_the_same_transaction() {
    let (_, store) = memory_store();

    store.insert(Transaction::new("0xa", "0xb", 5.0)).unwrap();
    let outcome = store.insert(Transaction::new("0xa", "0xb", 5.0)).unwrap();

    assert!(!outcome.is_inserted());
    assert_eq!(store.len(), 1);
}

#[test]
fn test_insert_persists_before_returning() {
    let (sink, store) = memory_store();
    let tx = Transaction::new("0xa", "0xb", 5.0);

    store.insert(tx.clone()).unwrap();

    assert_eq!(sink.load().unwrap(), Some(vec![tx]));
}

#[test]
fn test_failed_save_leaves_ledger_unchanged() {
    let (sink, store) = memory_store();
    let kept = Transaction::new("0xa", "0xb", 1.0);
    store.insert(kept.clone()).unwrap();

    sink.set_fail_writes(true);
    let result = store.insert(Transaction::new("0xa", "0xb", 2.0));

    assert!(matches!(
        result,
        Err(LedgerError::Persistence(StoreError::WriteRejected(_)))
    ));
    assert_eq!(store.snapshot(), vec![kept.clone()]);
    assert_eq!(sink.load().unwrap(), Some(vec![kept]));
}

#[test]
fn test_insert_after_failed_save_recovers() {
    let (sink, store) = memory_store();
    let tx = Transaction::new("0xa", "0xb", 1.0);

    sink.set_fail_writes(true);
    assert!(store.insert(tx.clone()).is_err());

    sink.set_fail_writes(false);
    assert_eq!(store.insert(tx).unwrap(), InsertOutcome::Inserted);
    assert_eq!(store.len(), 1);
}

#[test]
fn test_concurrent_inserts() {
    let (sink, store) = memory_store();
    let store = Arc::new(store);

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    // Every worker also races on a shared transaction
                    store.insert(Transaction::new("0xshared", "0xb", 1.0)).unwrap();
                    store
                        .insert(Transaction::new(format!("0x{worker}"), "0xb", i as f64))
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.len(), 8 * 25 + 1);
    assert_eq!(sink.load().unwrap().unwrap().len(), 8 * 25 + 1);
}

// ============================================================================
// MERGE
// ============================================================================

#[test]
fn test_merge_is_union() {
    let (_, store) = memory_store();
    let a = Transaction::new("0xa", "0xb", 1.0);
    let b = Transaction::new("0xa", "0xb", 2.0);
    let c = Transaction::new("0xa", "0xb", 3.0);
    store.insert(a.clone()).unwrap();
    store.insert(b.clone()).unwrap();

    let report = store.merge(vec![b.clone(), c.clone()]).unwrap();

    assert_eq!(report, SyncReport { received: 2, inserted: 1 });
    assert_eq!(store.snapshot(), vec![a, b, c]);
}

#[test]
fn test_merge_empty_batch_does_not_save() {
    let (sink, store) = memory_store();

    let report = store.merge(Vec::new()).unwrap();

    assert_eq!(report, SyncReport::default());
    assert_eq!(sink.save_count(), 0);
}

#[test]
fn test_merge_persists_once() {
    let (sink, store) = memory_store();

    store
        .merge((0..10).map(|i| Transaction::new("0xa", "0xb", i as f64)))
        .unwrap();

    assert_eq!(sink.save_count(), 1);
    assert_eq!(store.len(), 10);
}

#[test]
fn test_failed_merge_keeps_nothing() {
    let (sink, store) = memory_store();
    sink.set_fail_writes(true);

    let result = store.merge(vec![Transaction::new("0xa", "0xb", 1.0)]);

    assert!(result.is_err());
    assert!(store.is_empty());
}

// ============================================================================
// LOAD
// ============================================================================

#[test]
fn test_missing_record_loads_empty() {
    let sink = MemorySink::new();

    assert!(LedgerStore::load_from_disk(&sink).unwrap().is_empty());
}

#[test]
fn test_corrupt_record_fails_open() {
    let sink = Arc::new(MemorySink::with_record(vec![0xFF, 0xFF, 0xFF, 0xFF]));

    let result = LedgerStore::open(sink);

    assert!(matches!(
        result,
        Err(LedgerError::Persistence(StoreError::DeserializationFailed(_)))
    ));
}

#[test]
fn test_ledger_survives_restart_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("transactions_9000");
    let transactions = vec![
        Transaction::new("0xa", "0xb", 1.0),
        Transaction::new("0xb", "0xc", 2.0),
        Transaction::new("0xc", "0xa", 3.0),
    ];

    {
        let store = LedgerStore::open(Arc::new(SledSink::open(&path).unwrap())).unwrap();
        for tx in &transactions {
            store.insert(tx.clone()).unwrap();
        }
    }

    let store = LedgerStore::open(Arc::new(SledSink::open(&path).unwrap())).unwrap();
    assert_eq!(store.snapshot(), transactions);
}
