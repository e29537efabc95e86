//! Command handlers for the build and tail operations.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::arg_parser::{Cli, Commands, CommonArgs};
use crate::engine::source;
use crate::pipeline::context::{IndexerContext, Shutdown};
use crate::pipeline::orchestrator;
use crate::types::{FatalError, Opts};
use crate::utils::config::{IndexingDefaults, PackagePaths};
use crate::utils::config_file::load_config_file;
use crate::utils::setup_logging;

/// Dispatch a parsed command line.
pub fn handle_run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Build { common, once } => handle_build(common, *once),
        Commands::Tail { common } => handle_tail(common),
    }
}

/// Full lifecycle: bootstrap, catch-up build, cutover, then tail.
pub fn handle_build(common: &CommonArgs, once: bool) -> Result<()> {
    let opts = setup_operation(common)?;
    let mut ctx = build_context(opts)?;
    orchestrator::run_build(&mut ctx, once)
}

/// Tail-only mode: keep the live index current, no rebuild.
pub fn handle_tail(common: &CommonArgs) -> Result<()> {
    let opts = setup_operation(common)?;
    let mut ctx = build_context(opts)?;
    orchestrator::run_tail(&mut ctx)
}

/// Setup logging and resolve full options: flags/env, then the optional
/// config file, then defaults.
fn setup_operation(common: &CommonArgs) -> Result<Opts> {
    let file = load_config_file(Path::new(".")).unwrap_or_default();
    let s = file.settings;

    let verbose = common.verbose || s.verbose.unwrap_or(false);
    setup_logging(verbose);

    let source_db = common
        .db
        .clone()
        .or(s.db.map(PathBuf::from))
        .context("source database path required (--db, DB_URL, or the config file)")?;
    let index_root = common
        .index_dir
        .clone()
        .or(s.index_dir.map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(IndexingDefaults::INDEX_DIR));
    let state_path = common
        .state_file
        .clone()
        .or(s.state_file.map(PathBuf::from))
        .unwrap_or_else(|| index_root.join(PackagePaths::get().state_filename()));

    let opts = Opts {
        source_db,
        index_name: common
            .index_name
            .clone()
            .or(s.index_name)
            .unwrap_or_else(|| IndexingDefaults::INDEX_NAME.to_string()),
        bulk_size: common
            .bulk_size
            .or(s.bulk_size)
            .unwrap_or(IndexingDefaults::BULK_SIZE),
        tail_bulk_size: common
            .tail_bulk_size
            .or(s.tail_bulk_size)
            .unwrap_or(IndexingDefaults::TAIL_BULK_SIZE),
        max_workers: common
            .max_workers
            .or(s.max_workers)
            .unwrap_or(IndexingDefaults::MAX_WORKERS),
        max_bulk_errors: common
            .max_bulk_errors
            .or(s.max_bulk_errors)
            .unwrap_or(IndexingDefaults::MAX_BULK_ERRORS),
        bulk_retry_delay: Duration::from_secs(IndexingDefaults::BULK_RETRY_DELAY_SECS),
        tail_poll_interval: Duration::from_secs(
            common
                .tail_poll_interval
                .or(s.tail_poll_interval)
                .unwrap_or(IndexingDefaults::TAIL_POLL_INTERVAL_SECS),
        ),
        source_strategy: common.source_strategy,
        index_root,
        state_path,
        verbose,
    };
    log::debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );
    Ok(opts)
}

/// Open the source reader and wire Ctrl+C, then assemble the run context.
fn build_context(opts: Opts) -> Result<IndexerContext> {
    let source = source::open_reader(opts.source_strategy, &opts.source_db)
        .map_err(|e| FatalError::SourceUnreachable(format!("{e:#}")))?;
    let shutdown = Shutdown::install_ctrlc()?;
    IndexerContext::new(opts, source, shutdown)
}
