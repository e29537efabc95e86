//! Source reader tests: scan ordering and limits, pending queue semantics.

mod common;

use std::collections::BTreeSet;

use common::{create_posts_db, db_path, insert_posts};
use postmirror::engine::source::{open_reader, PendingReader, SourceReader};
use postmirror::engine::open_source_db;
use postmirror::types::SourceStrategy;
use tempfile::TempDir;

#[test]
fn scan_fetches_ascending_above_min_id() {
    let dir = TempDir::new().unwrap();
    let db = db_path(dir.path());
    insert_posts(&create_posts_db(&db), 1..=20);

    let mut reader = open_reader(SourceStrategy::Scan, &db).unwrap();
    let rows = reader.fetch_after(5, 10).unwrap();
    let ids: Vec<u64> = rows.iter().map(|r| r.post_id).collect();
    assert_eq!(ids, (6..=15).collect::<Vec<u64>>());
}

#[test]
fn scan_is_idempotent_for_the_same_min_id() {
    let dir = TempDir::new().unwrap();
    let db = db_path(dir.path());
    insert_posts(&create_posts_db(&db), 1..=10);

    let mut reader = open_reader(SourceStrategy::Scan, &db).unwrap();
    let first: Vec<u64> = reader
        .fetch_after(0, 5)
        .unwrap()
        .iter()
        .map(|r| r.post_id)
        .collect();
    let second: Vec<u64> = reader
        .fetch_after(0, 5)
        .unwrap()
        .iter()
        .map(|r| r.post_id)
        .collect();
    assert_eq!(first, second);
}

#[test]
fn scan_empty_when_caught_up() {
    let dir = TempDir::new().unwrap();
    let db = db_path(dir.path());
    insert_posts(&create_posts_db(&db), 1..=10);

    let mut reader = open_reader(SourceStrategy::Scan, &db).unwrap();
    assert!(reader.fetch_after(10, 100).unwrap().is_empty());
}

#[test]
fn scan_maps_row_fields() {
    let dir = TempDir::new().unwrap();
    let db = db_path(dir.path());
    insert_posts(&create_posts_db(&db), [42]);

    let mut reader = open_reader(SourceStrategy::Scan, &db).unwrap();
    let rows = reader.fetch_after(0, 10).unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.post_id, 42);
    assert_eq!(row.title, "Post 42");
    assert_eq!(row.category, "tech");
    assert!(!row.is_nsfw);
    assert_eq!(row.rshares, 1000);
}

#[test]
fn scan_ping_reports_liveness() {
    let dir = TempDir::new().unwrap();
    let db = db_path(dir.path());
    create_posts_db(&db);
    let reader = open_reader(SourceStrategy::Scan, &db).unwrap();
    assert!(reader.ping());
}

#[test]
fn pending_fetch_ignores_min_id_and_ack_drains_the_queue() {
    let dir = TempDir::new().unwrap();
    let db = db_path(dir.path());
    insert_posts(&create_posts_db(&db), 1..=20);

    let mut reader = PendingReader::new(open_source_db(&db).unwrap()).unwrap();
    for id in [5u64, 6, 7] {
        reader.enqueue(id).unwrap();
    }

    // min_id is well past the queued ids; a queue-backed reader must still
    // return them.
    let rows = reader.fetch_after(1000, 10).unwrap();
    let ids: BTreeSet<u64> = rows.iter().map(|r| r.post_id).collect();
    assert_eq!(ids, BTreeSet::from([5, 6, 7]));

    // Unacknowledged rows are redelivered.
    assert_eq!(reader.fetch_after(0, 10).unwrap().len(), 3);

    reader.acknowledge(&ids).unwrap();
    assert!(reader.fetch_after(0, 10).unwrap().is_empty());
}

#[test]
fn pending_respects_limit() {
    let dir = TempDir::new().unwrap();
    let db = db_path(dir.path());
    insert_posts(&create_posts_db(&db), 1..=20);

    let mut reader = PendingReader::new(open_source_db(&db).unwrap()).unwrap();
    for id in 1..=10u64 {
        reader.enqueue(id).unwrap();
    }
    assert_eq!(reader.fetch_after(0, 4).unwrap().len(), 4);
}
