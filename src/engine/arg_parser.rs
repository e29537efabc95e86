use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::types::SourceStrategy;

/// Continuous post indexer: mirrors an append-only posts database into a
/// Tantivy full-text index.
#[derive(Clone, Parser)]
#[command(name = "postmirror")]
#[command(about = "Mirror a posts database into a search index; build rebuilds from scratch, tail keeps it fresh.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Subcommand)]
pub enum Commands {
    /// Build a fresh index generation (resuming a crashed build when safe),
    /// cut over atomically, then keep tailing.
    Build {
        #[command(flatten)]
        common: CommonArgs,

        /// Exit after cutover instead of tailing.
        #[arg(long)]
        once: bool,
    },
    /// Keep the live index current without rebuilding. Waits for a live
    /// index to appear.
    Tail {
        #[command(flatten)]
        common: CommonArgs,
    },
}

/// Options shared by both subcommands. Every value can also come from the
/// environment (or `postmirror.toml`); flags win over both.
#[derive(Args, Clone, Default)]
pub struct CommonArgs {
    /// Source posts database path.
    #[arg(long, env = "DB_URL", value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Directory holding the index generations and alias file.
    #[arg(long, env = "INDEX_DIR", value_name = "DIR")]
    pub index_dir: Option<PathBuf>,

    /// Externally visible index name.
    #[arg(long, env = "INDEX_NAME")]
    pub index_name: Option<String>,

    /// Rows per batch during the catch-up build.
    #[arg(long, env = "BULK_SIZE")]
    pub bulk_size: Option<usize>,

    /// Rows per batch while tailing.
    #[arg(long, env = "TAIL_BULK_SIZE")]
    pub tail_bulk_size: Option<usize>,

    /// Worker threads for the row -> document transform.
    #[arg(long, env = "MAX_WORKERS")]
    pub max_workers: Option<usize>,

    /// Consecutive bulk failures tolerated before fatal abort.
    #[arg(long, env = "MAX_BULK_ERRORS")]
    pub max_bulk_errors: Option<u32>,

    /// Seconds between idle tailing polls.
    #[arg(long, env = "TAIL_POLL_INTERVAL", value_name = "SECS")]
    pub tail_poll_interval: Option<u64>,

    /// Row discovery strategy.
    #[arg(long, value_enum, default_value_t = SourceStrategy::Scan)]
    pub source_strategy: SourceStrategy,

    /// Watermark file path. Default: `INDEX_DIR/postmirror.state`.
    #[arg(long, value_name = "PATH")]
    pub state_file: Option<PathBuf>,

    /// Verbose output (debug logging and progress bar).
    #[arg(long, short = 'v')]
    pub verbose: bool,
}
