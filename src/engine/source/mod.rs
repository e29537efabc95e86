//! Source readers: pull ordered batches of post rows from the database.
//!
//! Two interchangeable strategies behind one trait. The scan strategy walks
//! the posts table by ascending `post_id`; the pending strategy drains an
//! explicit queue table and acknowledges rows once they are committed to the
//! index. Which one fits is a deployment choice, not a design decision.

mod connection;
mod pending;
mod scan;

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;
use rusqlite::Row;

pub use connection::open_source_db;
pub use pending::PendingReader;
pub use scan::ScanReader;

use crate::types::{SourceRow, SourceStrategy};

/// Columns selected for every row fetch, in [`row_to_source`] order.
pub(crate) const SELECT_COLUMNS: &str = "post_id, author, permlink, category, depth, children, \
     author_rep, flag_weight, total_votes, up_votes, title, img_url, payout, promoted, \
     created_at, payout_at, updated_at, is_paidout, is_nsfw, is_declined, is_full_power, \
     is_hidden, is_grayed, rshares, sc_trend, sc_hot, body, votes, json";

/// A reader must be safe to call repeatedly with the same arguments: fetches
/// never mutate the source, and only [`SourceReader::acknowledge`] (a no-op
/// for the scan strategy) consumes anything.
pub trait SourceReader: Send {
    /// Next batch of rows to index, ascending by `post_id`, at most `limit`
    /// long. An empty batch means "caught up to the present", not "no more
    /// data will ever exist". Queue-backed readers ignore `min_id`.
    fn fetch_after(&mut self, min_id: u64, limit: usize) -> Result<Vec<SourceRow>>;

    /// Confirm rows as committed to the index. No-op for the scan strategy.
    fn acknowledge(&mut self, ids: &BTreeSet<u64>) -> Result<()>;

    /// Liveness check.
    fn ping(&self) -> bool;
}

/// Open the reader for the configured strategy.
pub fn open_reader(strategy: SourceStrategy, db_path: &Path) -> Result<Box<dyn SourceReader>> {
    let conn = open_source_db(db_path)?;
    Ok(match strategy {
        SourceStrategy::Scan => Box::new(ScanReader::new(conn)),
        SourceStrategy::Pending => Box::new(PendingReader::new(conn)?),
    })
}

/// Map one result row to a [`SourceRow`]. Column order must match
/// [`SELECT_COLUMNS`].
pub(crate) fn row_to_source(row: &Row<'_>) -> rusqlite::Result<SourceRow> {
    Ok(SourceRow {
        post_id: row.get::<_, i64>(0)?.max(0) as u64,
        author: row.get(1)?,
        permlink: row.get(2)?,
        category: row.get(3)?,
        depth: row.get(4)?,
        children: row.get(5)?,
        author_rep: row.get(6)?,
        flag_weight: row.get(7)?,
        total_votes: row.get(8)?,
        up_votes: row.get(9)?,
        title: row.get(10)?,
        img_url: row.get(11)?,
        payout: row.get(12)?,
        promoted: row.get(13)?,
        created_at: row.get(14)?,
        payout_at: row.get(15)?,
        updated_at: row.get(16)?,
        is_paidout: row.get(17)?,
        is_nsfw: row.get(18)?,
        is_declined: row.get(19)?,
        is_full_power: row.get(20)?,
        is_hidden: row.get(21)?,
        is_grayed: row.get(22)?,
        rshares: row.get(23)?,
        sc_trend: row.get(24)?,
        sc_hot: row.get(25)?,
        body: row.get(26)?,
        votes: row.get(27)?,
        json: row.get(28)?,
    })
}
