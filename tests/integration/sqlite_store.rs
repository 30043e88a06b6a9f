#![allow(missing_docs)]

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use pagekit::{
    KeyBound, NewRecord, RecordStore, SqliteStore, StoreError, StoreOp, StoreOptions,
};
use rusqlite::Connection;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn records(n: usize) -> Vec<NewRecord> {
    (0..n)
        .map(|i| NewRecord::new(format!("Given{i}"), format!("Family{i}")))
        .collect()
}

fn open_store(name: &str) -> (TempDir, PathBuf, SqliteStore) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join(format!("{name}.db"));
    let store = SqliteStore::open(&path, &StoreOptions::default()).expect("open store");
    (dir, path, store)
}

fn seeded_store(name: &str, n: usize) -> (TempDir, PathBuf, SqliteStore) {
    let (dir, path, store) = open_store(name);
    store
        .bulk_insert(&records(n), &CancellationToken::new())
        .expect("seed");
    (dir, path, store)
}

fn ids(rows: &[pagekit::Record]) -> Vec<i64> {
    rows.iter().map(|r| r.id).collect()
}

#[test]
fn newest_scan_returns_highest_ids_descending() {
    let (_dir, _path, store) = seeded_store("newest", 100);
    let rows = store
        .scan_descending(KeyBound::Newest, 5, &CancellationToken::new())
        .expect("scan");
    assert_eq!(ids(&rows), vec![100, 99, 98, 97, 96]);
    assert_eq!(rows[0].name, "Given99");
    assert_eq!(rows[0].surname, "Family99");
}

#[test]
fn bounded_scan_is_strictly_below_the_key() {
    let (_dir, _path, store) = seeded_store("bounded", 100);
    let cancel = CancellationToken::new();
    let rows = store
        .scan_descending(KeyBound::Before(10), 10, &cancel)
        .expect("scan");
    assert_eq!(ids(&rows), (1..=9).rev().collect::<Vec<_>>());

    let rows = store
        .scan_descending(KeyBound::Before(1), 10, &cancel)
        .expect("scan below first id");
    assert!(rows.is_empty());
}

#[test]
fn offset_scan_skips_rows_in_ascending_order() {
    let (_dir, _path, store) = seeded_store("offset", 45);
    let cancel = CancellationToken::new();
    let rows = store.scan_ascending(40, 10, &cancel).expect("scan tail");
    assert_eq!(ids(&rows), vec![41, 42, 43, 44, 45]);

    let rows = store.scan_ascending(45, 10, &cancel).expect("scan past end");
    assert!(rows.is_empty());
}

#[test]
fn bulk_insert_then_count_sees_every_row() {
    let (_dir, _path, store) = open_store("count");
    let cancel = CancellationToken::new();
    assert_eq!(store.count(&cancel).expect("empty count"), 0);
    assert_eq!(store.bulk_insert(&records(250), &cancel).expect("insert"), 250);
    assert_eq!(store.count(&cancel).expect("count"), 250);
    assert_eq!(store.bulk_insert(&records(5), &cancel).expect("insert"), 5);
    assert_eq!(store.count(&cancel).expect("count"), 255);
}

#[test]
fn failed_bulk_insert_rolls_back_the_whole_batch() {
    let (_dir, path, store) = seeded_store("rollback", 10);

    // A trigger that rejects one specific row makes the middle of the batch fail.
    let conn = Connection::open(&path).expect("side connection");
    conn.execute_batch(
        "CREATE TRIGGER reject_poison BEFORE INSERT ON users
         WHEN NEW.name = 'poison'
         BEGIN SELECT RAISE(ABORT, 'poisoned row'); END;",
    )
    .expect("create trigger");
    drop(conn);

    let mut batch = records(20);
    batch[13] = NewRecord::new("poison", "row");
    let cancel = CancellationToken::new();
    let err = store.bulk_insert(&batch, &cancel).expect_err("batch must fail");
    assert!(matches!(
        err,
        StoreError::Query {
            op: StoreOp::BulkInsert,
            ..
        }
    ));
    assert_eq!(store.count(&cancel).expect("count"), 10);
}

#[test]
fn ids_are_not_reused_after_deletes() {
    let (_dir, path, store) = seeded_store("autoinc", 5);
    let conn = Connection::open(&path).expect("side connection");
    conn.execute("DELETE FROM users WHERE id >= 4", [])
        .expect("delete tail");
    drop(conn);

    let cancel = CancellationToken::new();
    store.bulk_insert(&records(2), &cancel).expect("insert");
    let rows = store.scan_ascending(0, 10, &cancel).expect("scan");
    assert_eq!(ids(&rows), vec![1, 2, 3, 6, 7]);
}

#[test]
fn reopening_keeps_existing_rows() {
    let (dir, path, store) = seeded_store("reopen", 12);
    drop(store);
    let store = SqliteStore::open(&path, &StoreOptions::default()).expect("reopen");
    assert_eq!(store.count(&CancellationToken::new()).expect("count"), 12);
    assert_eq!(store.path(), Some(path.as_path()));
    drop(dir);
}

#[test]
fn missing_table_surfaces_as_query_error() {
    let (_dir, path, store) = seeded_store("dropped", 3);
    let conn = Connection::open(&path).expect("side connection");
    conn.execute_batch("DROP TABLE users;").expect("drop table");
    drop(conn);

    let cancel = CancellationToken::new();
    let err = store.count(&cancel).expect_err("table missing");
    assert!(matches!(err, StoreError::Query { op: StoreOp::Count, .. }));
    let err = store
        .scan_ascending(0, 5, &cancel)
        .expect_err("table missing");
    assert_eq!(err.op(), Some(StoreOp::ScanAscending));
}

#[test]
fn concurrent_readers_see_identical_pages() {
    let (_dir, _path, store) = seeded_store("parallel", 500);
    let store = Arc::new(store);
    let expected = store
        .scan_ascending(100, 50, &CancellationToken::new())
        .expect("baseline");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            thread::spawn(move || {
                let cancel = CancellationToken::new();
                (0..20)
                    .map(|_| store.scan_ascending(100, 50, &cancel).expect("scan"))
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    for handle in handles {
        for rows in handle.join().expect("reader thread") {
            assert_eq!(rows, expected);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancellation_interrupts_a_running_query() {
    let (_dir, _path, store) = seeded_store("interrupt", 2_000);
    let store = Arc::new(store);
    let cancel = CancellationToken::new();

    // Scan until the token fires. Whether it lands between statements or in the
    // middle of one, the call must fail as cancelled.
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let worker = store.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let started = std::time::Instant::now();
        loop {
            match worker.scan_ascending(0, 2_000, &cancel) {
                Ok(_) if started.elapsed().as_secs() < 10 => continue,
                other => return other,
            }
        }
    })
    .await
    .expect("join");

    let err = outcome.expect_err("scan must be cancelled");
    assert!(err.is_cancelled(), "unexpected error: {err}");
    assert_eq!(err.op(), Some(StoreOp::ScanAscending));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancelling_one_caller_never_interrupts_another() {
    let dir = TempDir::new().expect("tempdir");
    let options = StoreOptions {
        read_pool_size: 1,
        ..StoreOptions::default()
    };
    let store = SqliteStore::open(dir.path().join("shared.db"), &options).expect("open store");
    store
        .bulk_insert(&records(2_000), &CancellationToken::new())
        .expect("seed");
    let store = Arc::new(store);

    // Three callers keep cancelling their own counts on the only reader connection.
    let stop = CancellationToken::new();
    let cancellers: Vec<_> = (0..3)
        .map(|_| {
            let store = store.clone();
            let stop = stop.clone();
            tokio::spawn(async move {
                while !stop.is_cancelled() {
                    let cancel = CancellationToken::new();
                    let trigger = cancel.clone();
                    let store = store.clone();
                    let call = tokio::task::spawn_blocking(move || store.count(&cancel));
                    tokio::task::yield_now().await;
                    trigger.cancel();
                    let _ = call.await;
                }
            })
        })
        .collect();

    let worker = store.clone();
    let scans = tokio::task::spawn_blocking(move || {
        let cancel = CancellationToken::new();
        let started = std::time::Instant::now();
        let mut scans = 0u32;
        while started.elapsed() < std::time::Duration::from_millis(500) {
            worker.scan_ascending(0, 500, &cancel)?;
            scans += 1;
        }
        Ok::<_, StoreError>(scans)
    })
    .await
    .expect("join")
    .expect("uncancelled scans must never be interrupted");

    stop.cancel();
    for canceller in cancellers {
        canceller.await.expect("canceller task");
    }
    assert!(scans > 0);
}
