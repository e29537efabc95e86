//! Pending-queue strategy: drain an explicit tracking table.
//!
//! For deployments where the posts table cannot be scanned by key alone
//! (rows get edited and re-queued), the upstream writer inserts changed ids
//! into `pending_posts`. Fetches join the queue to the posts table;
//! acknowledged ids are deleted from the queue once committed to the index.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use rusqlite::Connection;

use super::{connection, row_to_source, SourceReader, SELECT_COLUMNS};
use crate::types::SourceRow;

const PENDING_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS pending_posts (
    post_id INTEGER PRIMARY KEY
)";

pub struct PendingReader {
    conn: Connection,
}

impl PendingReader {
    /// The queue table is owned by this reader; create it when missing so an
    /// empty queue and a fresh deployment look the same.
    pub fn new(conn: Connection) -> Result<PendingReader> {
        conn.execute(PENDING_SCHEMA, [])
            .context("create pending_posts table")?;
        Ok(PendingReader { conn })
    }

    /// Queue a post id (used by tests and by upstream writers sharing the
    /// connection).
    pub fn enqueue(&self, post_id: u64) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO pending_posts (post_id) VALUES (?1)",
                [post_id as i64],
            )
            .context("enqueue pending post")?;
        Ok(())
    }
}

impl SourceReader for PendingReader {
    /// `min_id` is ignored: the queue is the work list.
    fn fetch_after(&mut self, _min_id: u64, limit: usize) -> Result<Vec<SourceRow>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM posts \
             WHERE post_id IN (SELECT post_id FROM pending_posts) \
             ORDER BY post_id ASC LIMIT ?1"
        );
        let mut stmt = self.conn.prepare_cached(&sql).context("prepare fetch")?;
        let rows = stmt
            .query_map([limit as i64], row_to_source)
            .context("fetch pending posts")?;
        let mut batch = Vec::with_capacity(limit);
        for row in rows {
            batch.push(row.context("read post row")?);
        }
        Ok(batch)
    }

    fn acknowledge(&mut self, ids: &BTreeSet<u64>) -> Result<()> {
        let tx = self.conn.transaction().context("begin acknowledge")?;
        {
            let mut stmt = tx
                .prepare_cached("DELETE FROM pending_posts WHERE post_id = ?1")
                .context("prepare acknowledge")?;
            for id in ids {
                stmt.execute([*id as i64]).context("acknowledge post")?;
            }
        }
        tx.commit().context("commit acknowledge")?;
        Ok(())
    }

    fn ping(&self) -> bool {
        connection::ping(&self.conn)
    }
}
