//! Open the source database connection.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// Open the source posts database. The posts table belongs to the upstream
/// writer; this process only reads it (and, for the pending strategy, owns
/// its own queue table).
pub fn open_source_db(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("open source database at {}", path.display()))?;
    conn.busy_timeout(Duration::from_secs(5))
        .context("set busy timeout")?;
    Ok(conn)
}

/// `SELECT 1` liveness probe.
pub(crate) fn ping(conn: &Connection) -> bool {
    conn.query_row("SELECT 1", [], |_| Ok(())).is_ok()
}
