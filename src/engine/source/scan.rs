//! Scan strategy: walk the posts table by ascending `post_id`.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use rusqlite::Connection;

use super::{connection, row_to_source, SourceReader, SELECT_COLUMNS};
use crate::types::SourceRow;

pub struct ScanReader {
    conn: Connection,
}

impl ScanReader {
    pub fn new(conn: Connection) -> ScanReader {
        ScanReader { conn }
    }
}

impl SourceReader for ScanReader {
    fn fetch_after(&mut self, min_id: u64, limit: usize) -> Result<Vec<SourceRow>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM posts \
             WHERE post_id > ?1 ORDER BY post_id ASC LIMIT ?2"
        );
        let mut stmt = self.conn.prepare_cached(&sql).context("prepare fetch")?;
        let rows = stmt
            .query_map((min_id as i64, limit as i64), row_to_source)
            .context("fetch posts")?;
        let mut batch = Vec::with_capacity(limit);
        for row in rows {
            batch.push(row.context("read post row")?);
        }
        Ok(batch)
    }

    fn acknowledge(&mut self, _ids: &BTreeSet<u64>) -> Result<()> {
        Ok(())
    }

    fn ping(&self) -> bool {
        connection::ping(&self.conn)
    }
}
