//! Public and internal types for the postmirror API and pipeline.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One post row as extracted from the source database. Immutable snapshot:
/// produced by a source reader, consumed once by the transformer.
///
/// `post_id` is unique and strictly ascending in the source; everything else
/// is payload. `json` carries the raw structured blob (tags, app, ...).
#[derive(Clone, Debug)]
pub struct SourceRow {
    pub post_id: u64,
    pub author: String,
    pub permlink: String,
    pub category: String,
    pub depth: i64,
    pub children: i64,
    pub author_rep: f64,
    pub flag_weight: f64,
    pub total_votes: i64,
    pub up_votes: i64,
    pub title: String,
    pub img_url: String,
    pub payout: f64,
    pub promoted: f64,
    pub created_at: String,
    pub payout_at: String,
    pub updated_at: String,
    pub is_paidout: bool,
    pub is_nsfw: bool,
    pub is_declined: bool,
    pub is_full_power: bool,
    pub is_hidden: bool,
    pub is_grayed: bool,
    pub rshares: i64,
    pub sc_trend: f64,
    pub sc_hot: f64,
    pub body: String,
    pub votes: String,
    pub json: String,
}

/// Search-ready projection of a [`SourceRow`]. Plain data, no tantivy types:
/// the transformer stays pure and the bulk writer owns the index mapping.
///
/// `post_id` doubles as the document id, so redelivery overwrites instead of
/// duplicating (delete-term-then-add upsert).
#[derive(Clone, Debug, PartialEq)]
pub struct PostDoc {
    pub post_id: u64,
    pub author: String,
    pub permlink: String,
    pub category: String,
    pub depth: i64,
    pub children: i64,
    pub author_rep: f64,
    pub flag_weight: f64,
    pub total_votes: i64,
    pub up_votes: i64,
    pub title: String,
    pub img_url: String,
    pub payout: f64,
    pub promoted: f64,
    /// Timestamps as epoch seconds (UTC), parsed from the source columns.
    pub created_at_ts: i64,
    pub payout_at_ts: i64,
    pub updated_at_ts: i64,
    pub is_paidout: bool,
    pub is_nsfw: bool,
    pub is_declined: bool,
    pub is_full_power: bool,
    pub is_hidden: bool,
    pub is_grayed: bool,
    pub rshares: i64,
    pub sc_trend: f64,
    pub sc_hot: f64,
    pub body: String,
    pub body_sanitized: String,
    pub votes: String,
    pub tags: Vec<String>,
    pub app: String,
    /// `"{title} | {body_sanitized}"`, the single best field to query.
    pub searchable: String,
}

/// Durable resume point: the highest `post_id` confirmed committed into one
/// index generation. Persisted as a single small JSON record, replaced
/// atomically on every save.
///
/// Invariant: `last_post_id` equals the maximum document id actually
/// committed into `generation`, never ahead of committed writes. Resume
/// trusts a loaded watermark only after the destination confirms the same
/// maximum; any mismatch discards the generation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    pub generation: String,
    pub last_post_id: u64,
}

/// How the source reader discovers rows to index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SourceStrategy {
    /// Scan the posts table by ascending `post_id` (`WHERE post_id > ?`).
    #[default]
    Scan,
    /// Drain an explicit `pending_posts` queue table, acknowledging rows
    /// after they are committed to the index.
    Pending,
}

impl std::fmt::Display for SourceStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SourceStrategy::Scan => "scan",
            SourceStrategy::Pending => "pending",
        })
    }
}

/// Full resolved options. Built by merging CLI flags, environment, the
/// optional `postmirror.toml`, and the defaults in [`crate::utils::config`].
#[derive(Clone, Debug)]
pub struct Opts {
    /// Source database path.
    pub source_db: PathBuf,
    /// Directory holding every index generation plus the alias file.
    pub index_root: PathBuf,
    /// Externally visible index name; generation directories are named
    /// `{index_name}-{timestamp}`.
    pub index_name: String,
    /// Rows per batch during the catch-up build.
    pub bulk_size: usize,
    /// Rows per batch while tailing.
    pub tail_bulk_size: usize,
    /// Worker threads for the row -> document transform.
    pub max_workers: usize,
    /// Consecutive bulk failures tolerated before giving up.
    pub max_bulk_errors: u32,
    /// Delay before retrying a failed bulk write.
    pub bulk_retry_delay: Duration,
    /// Idle delay between tailing polls.
    pub tail_poll_interval: Duration,
    pub source_strategy: SourceStrategy,
    /// Watermark file path. Default: `{index_root}/postmirror.state`.
    pub state_path: PathBuf,
    /// Show progress bar and debug logging.
    pub verbose: bool,
}

/// Conditions that must halt the process. Each maps to a distinct exit code
/// so an external supervisor can tell them apart.
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    #[error("source database unreachable: {0}")]
    SourceUnreachable(String),
    #[error("search index destination unreachable: {0}")]
    DestinationUnreachable(String),
    #[error("consistency violation at bootstrap: {0}")]
    ConsistencyViolation(String),
    #[error("bulk indexing error budget exhausted: {0}")]
    ErrorBudgetExhausted(String),
}

impl FatalError {
    pub fn exit_code(&self) -> i32 {
        match self {
            FatalError::SourceUnreachable(_) => 10,
            FatalError::DestinationUnreachable(_) => 11,
            FatalError::ConsistencyViolation(_) => 12,
            FatalError::ErrorBudgetExhausted(_) => 13,
        }
    }
}
