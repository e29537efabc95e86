//! Shared fixtures: a seeded posts database, sample rows/documents, and a
//! ready-to-run indexer context with test-friendly timings.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;

use postmirror::engine::{open_reader, SourceReader};
use postmirror::pipeline::{doc_from_row, IndexerContext, Shutdown, ShutdownHandle};
use postmirror::types::{Opts, PostDoc, SourceRow, SourceStrategy};

pub const POSTS_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS posts (
    post_id INTEGER PRIMARY KEY,
    author TEXT NOT NULL,
    permlink TEXT NOT NULL,
    category TEXT NOT NULL,
    depth INTEGER NOT NULL,
    children INTEGER NOT NULL,
    author_rep REAL NOT NULL,
    flag_weight REAL NOT NULL,
    total_votes INTEGER NOT NULL,
    up_votes INTEGER NOT NULL,
    title TEXT NOT NULL,
    img_url TEXT NOT NULL,
    payout REAL NOT NULL,
    promoted REAL NOT NULL,
    created_at TEXT NOT NULL,
    payout_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    is_paidout INTEGER NOT NULL,
    is_nsfw INTEGER NOT NULL,
    is_declined INTEGER NOT NULL,
    is_full_power INTEGER NOT NULL,
    is_hidden INTEGER NOT NULL,
    is_grayed INTEGER NOT NULL,
    rshares INTEGER NOT NULL,
    sc_trend REAL NOT NULL,
    sc_hot REAL NOT NULL,
    body TEXT NOT NULL,
    votes TEXT NOT NULL,
    json TEXT NOT NULL
)";

const INSERT_POST_SQL: &str = "INSERT INTO posts (
    post_id, author, permlink, category, depth, children, author_rep, flag_weight,
    total_votes, up_votes, title, img_url, payout, promoted, created_at, payout_at,
    updated_at, is_paidout, is_nsfw, is_declined, is_full_power, is_hidden, is_grayed,
    rshares, sc_trend, sc_hot, body, votes, json
) VALUES (
    ?1, ?2, ?3, ?4, 0, 0, 65.5, 0.0, 12, 10, ?5, '', 1.25, 0.0, ?6, ?6, ?6,
    0, 0, 0, 0, 0, 0, 1000, 0.5, 0.5, ?7, '[]', ?8
)";

/// Create (or open) a posts database at `path`.
pub fn create_posts_db(path: &Path) -> Connection {
    let conn = Connection::open(path).unwrap();
    conn.execute(POSTS_SCHEMA, []).unwrap();
    conn
}

/// Insert rows with the given ids and generated payloads.
pub fn insert_posts(conn: &Connection, ids: impl IntoIterator<Item = u64>) {
    let mut stmt = conn.prepare(INSERT_POST_SQL).unwrap();
    for id in ids {
        stmt.execute((
            id as i64,
            format!("author{}", id % 7),
            format!("post-{id}"),
            "tech",
            format!("Post {id}"),
            "2018-05-01T12:00:00",
            format!("Hello **world** from post {id}"),
            r#"{"tags":["news","steemit"],"app":{"name":"esteem","version":"1.6"}}"#,
        ))
        .unwrap();
    }
}

/// A well-formed source row with the given id.
pub fn sample_row(id: u64) -> SourceRow {
    SourceRow {
        post_id: id,
        author: format!("author{}", id % 7),
        permlink: format!("post-{id}"),
        category: "tech".into(),
        depth: 0,
        children: 0,
        author_rep: 65.5,
        flag_weight: 0.0,
        total_votes: 12,
        up_votes: 10,
        title: format!("Post {id}"),
        img_url: String::new(),
        payout: 1.25,
        promoted: 0.0,
        created_at: "2018-05-01T12:00:00".into(),
        payout_at: "2018-05-01T12:00:00".into(),
        updated_at: "2018-05-01T12:00:00".into(),
        is_paidout: false,
        is_nsfw: false,
        is_declined: false,
        is_full_power: false,
        is_hidden: false,
        is_grayed: false,
        rshares: 1000,
        sc_trend: 0.5,
        sc_hot: 0.5,
        body: format!("Hello **world** from post {id}"),
        votes: "[]".into(),
        json: r#"{"tags":["news","steemit"],"app":{"name":"esteem","version":"1.6"}}"#.into(),
    }
}

/// The transformed document for [`sample_row`].
pub fn sample_doc(id: u64) -> PostDoc {
    doc_from_row(&sample_row(id)).unwrap()
}

/// Options pointing at a temp workspace, with zero delays so retry and idle
/// paths run without wall-clock waits.
pub fn test_opts(source_db: &Path, index_root: &Path) -> Opts {
    Opts {
        source_db: source_db.to_path_buf(),
        index_root: index_root.to_path_buf(),
        index_name: "posts".into(),
        bulk_size: 500,
        tail_bulk_size: 100,
        max_workers: 2,
        max_bulk_errors: 5,
        bulk_retry_delay: Duration::from_millis(0),
        tail_poll_interval: Duration::from_millis(0),
        source_strategy: SourceStrategy::Scan,
        state_path: index_root.join("postmirror.state"),
        verbose: false,
    }
}

/// Assemble a run context over the configured source.
pub fn context_for(opts: &Opts) -> (IndexerContext, ShutdownHandle) {
    let source: Box<dyn SourceReader> =
        open_reader(opts.source_strategy, &opts.source_db).unwrap();
    let (shutdown, handle) = Shutdown::new();
    let ctx = IndexerContext::new(opts.clone(), source, shutdown).unwrap();
    (ctx, handle)
}

/// Path of the source database inside a test dir.
pub fn db_path(dir: &Path) -> PathBuf {
    dir.join("posts.db")
}

/// Path of the index root inside a test dir.
pub fn index_root(dir: &Path) -> PathBuf {
    dir.join("index")
}
