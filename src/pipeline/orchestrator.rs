//! Reindex orchestrator: bootstrap (resume or fresh start), the resumable
//! catch-up build, atomic cutover, and the steady-state tailing loop.
//!
//! One coordinating thread drives fetch -> transform -> write -> advance,
//! strictly sequential per batch; only the transform fans out onto the
//! worker pool. The watermark advances after, and only after, a batch's
//! write is confirmed, which is what makes any crash point recoverable.

use std::collections::BTreeSet;
use std::time::Instant;

use anyhow::{Context, Result};
use kdam::BarExt;
use log::{error, info, warn};

use crate::pipeline::context::{IndexerContext, Shutdown};
use crate::pipeline::retry::RetryCounter;
use crate::pipeline::transform::transform_batch;
use crate::search::{Aliases, BulkOutcome, BulkWriter, Generation, SearchError};
use crate::types::{FatalError, Opts, SourceRow, Watermark};
use crate::utils::config::PROGRESS_UNIT;

/// How the catch-up loop ended.
enum BuildEnd {
    /// The source returned an empty batch: everything is indexed.
    Exhausted,
    /// Shutdown was requested; progress is persisted for resume.
    Interrupted,
}

/// Outcome of one batch write after retries.
#[derive(Debug)]
pub enum BatchWrite {
    Committed { max_post_id: u64 },
    Interrupted,
}

/// Outcome of one tailing cycle.
#[derive(Debug, PartialEq, Eq)]
pub enum TailCycle {
    Indexed(usize),
    Idle,
    NoLiveIndex,
    Interrupted,
}

/// Full run: bootstrap, build to exhaustion, cut over, retire the old
/// generations, then keep tailing (unless `once`).
pub fn run_build(ctx: &mut IndexerContext, once: bool) -> Result<()> {
    startup_checks(ctx)?;
    let (generation, start_id) = bootstrap(ctx)?;
    let mut watermark = Watermark {
        generation: generation.name.clone(),
        last_post_id: start_id,
    };

    info!("Starting indexing");
    let mut writer = BulkWriter::open(&ctx.lifecycle, &generation).map_err(dest_fatal)?;
    match build_loop(ctx, &mut writer, &mut watermark)? {
        BuildEnd::Interrupted => {
            info!(
                "Shutdown requested; progress saved at {}",
                watermark.last_post_id
            );
            return Ok(());
        }
        BuildEnd::Exhausted => {}
    }
    drop(writer);

    ctx.lifecycle.cutover(&generation).map_err(dest_fatal)?;
    info!("Deleting old index(es)");
    ctx.lifecycle.retire_superseded().map_err(dest_fatal)?;
    // The generation is live now; its own max committed id is the reference
    // point from here on.
    ctx.watermarks.clear()?;
    info!("Done");

    if once {
        return Ok(());
    }
    run_tail(ctx)
}

/// Steady state: poll the live index's max id, index whatever arrived above
/// it, sleep, repeat. Runs until fatal error or shutdown.
pub fn run_tail(ctx: &mut IndexerContext) -> Result<()> {
    startup_checks(ctx)?;
    info!("Tailing {}", ctx.opts.index_name);
    let mut state = TailState::new(&ctx.opts);
    loop {
        if ctx.shutdown.requested() {
            return Ok(());
        }
        if tail_once(ctx, &mut state)? == TailCycle::Interrupted {
            return Ok(());
        }
        if ctx.shutdown.wait(ctx.opts.tail_poll_interval) {
            return Ok(());
        }
    }
}

/// Verify both collaborators are reachable before doing anything else, so a
/// dead dependency is a clean startup error instead of a mid-build surprise.
fn startup_checks(ctx: &IndexerContext) -> Result<()> {
    if !ctx.source.ping() {
        return Err(FatalError::SourceUnreachable(format!(
            "ping failed for {}",
            ctx.opts.source_db.display()
        ))
        .into());
    }
    std::fs::create_dir_all(ctx.lifecycle.root())
        .map_err(|e| FatalError::DestinationUnreachable(e.to_string()))?;
    Aliases::load(ctx.lifecycle.root()).map_err(dest_fatal)?;
    Ok(())
}

/// Decide resume vs. fresh start. A crashed build is resumed only when the
/// persisted watermark and the destination's observed state agree exactly;
/// anything else deletes the stale generation and starts a new one at 0.
fn bootstrap(ctx: &mut IndexerContext) -> Result<(Generation, u64)> {
    match ctx.lifecycle.find_in_progress() {
        Ok(Some(generation)) => {
            if let Some(start) = validate_resume(ctx, &generation)? {
                info!("Resuming on index {} from {}", generation.name, start);
                return Ok((generation, start));
            }
            ctx.lifecycle
                .delete_generation(&generation)
                .map_err(dest_fatal)?;
            ctx.watermarks.clear()?;
        }
        Ok(None) => {}
        Err(SearchError::Consistency(msg)) => {
            return Err(FatalError::ConsistencyViolation(msg).into());
        }
        Err(e) => return Err(dest_fatal(e)),
    }

    let generation = ctx.lifecycle.create_generation().map_err(dest_fatal)?;
    info!("Creating new index {}", generation.name);
    ctx.watermarks.save(&Watermark {
        generation: generation.name.clone(),
        last_post_id: 0,
    })?;
    Ok((generation, 0))
}

/// Confirm a persisted watermark against the generation's actual committed
/// maximum. Any ambiguity (no watermark, wrong generation, unreadable
/// index, differing ids) rejects the resume.
fn validate_resume(ctx: &IndexerContext, generation: &Generation) -> Result<Option<u64>> {
    let Some(watermark) = ctx.watermarks.load()? else {
        warn!(
            "In-progress index {} has no watermark; discarding",
            generation.name
        );
        return Ok(None);
    };
    if watermark.generation != generation.name {
        warn!(
            "Watermark belongs to {} but {} is in progress; discarding",
            watermark.generation, generation.name
        );
        return Ok(None);
    }
    let observed = match ctx.lifecycle.max_committed_id(generation) {
        Ok(max) => max,
        Err(e) => {
            warn!(
                "Cannot confirm committed state of {}: {}; discarding",
                generation.name, e
            );
            return Ok(None);
        }
    };
    if observed != watermark.last_post_id {
        warn!(
            "Watermark says {} but index {} reports {}; discarding",
            watermark.last_post_id, generation.name, observed
        );
        return Ok(None);
    }
    Ok(Some(observed))
}

/// Resumable catch-up: fetch above the watermark, transform on the pool,
/// write as one unit, persist the advanced watermark. Ends on an empty
/// fetch.
fn build_loop(
    ctx: &mut IndexerContext,
    writer: &mut BulkWriter,
    watermark: &mut Watermark,
) -> Result<BuildEnd> {
    let mut fetch_retries = RetryCounter::new(ctx.opts.max_bulk_errors);
    let mut bulk_retries = RetryCounter::new(ctx.opts.max_bulk_errors);
    let mut bar = ctx.opts.verbose.then(|| {
        kdam::tqdm!(
            total = 0,
            desc = "Indexing",
            animation = kdam::Animation::Classic,
            unit = PROGRESS_UNIT
        )
    });

    loop {
        if ctx.shutdown.requested() {
            return Ok(BuildEnd::Interrupted);
        }
        info!("Min id: {}", watermark.last_post_id);
        let started = Instant::now();

        let limit = ctx.opts.bulk_size;
        let rows = match fetch_batch(ctx, watermark.last_post_id, limit, &mut fetch_retries)? {
            Some(rows) => rows,
            None => return Ok(BuildEnd::Interrupted),
        };
        if rows.is_empty() {
            info!("Indexing completed");
            return Ok(BuildEnd::Exhausted);
        }

        let docs = transform_batch(&ctx.pool, &rows);
        if docs.len() < rows.len() {
            warn!(
                "{} of {} rows skipped by transform",
                rows.len() - docs.len(),
                rows.len()
            );
        }

        match write_with_retry(
            || writer.write_batch(&docs),
            &ctx.opts,
            &ctx.shutdown,
            &mut bulk_retries,
        )? {
            BatchWrite::Interrupted => return Ok(BuildEnd::Interrupted),
            BatchWrite::Committed { .. } => {}
        }

        // Advance past every fetched row, including any the transform
        // skipped: one bad row must not wedge the loop. Never decreases.
        let batch_max = rows.last().map_or(watermark.last_post_id, |r| r.post_id);
        watermark.last_post_id = watermark.last_post_id.max(batch_max);
        ctx.watermarks.save(watermark)?;

        let ids: BTreeSet<u64> = rows.iter().map(|r| r.post_id).collect();
        ctx.source
            .acknowledge(&ids)
            .context("acknowledge indexed rows")?;

        if let Some(bar) = bar.as_mut() {
            let _ = bar.update(rows.len());
        }
        info!("{} indexed in {:.2?}", docs.len(), started.elapsed());
    }
}

/// Carry-over between tailing cycles: the open writer (reopened only when
/// the live generation changes) and the retry budgets.
pub struct TailState {
    writer: Option<BulkWriter>,
    fetch_retries: RetryCounter,
    bulk_retries: RetryCounter,
}

impl TailState {
    pub fn new(opts: &Opts) -> TailState {
        TailState {
            writer: None,
            fetch_retries: RetryCounter::new(opts.max_bulk_errors),
            bulk_retries: RetryCounter::new(opts.max_bulk_errors),
        }
    }
}

/// One tailing cycle. The live index is its own source of truth: the start
/// key is recomputed from its max committed id every cycle, so a process
/// restart or an index swapped underneath picks up in the right place with
/// no persisted state.
pub fn tail_once(ctx: &mut IndexerContext, state: &mut TailState) -> Result<TailCycle> {
    let live = match ctx.lifecycle.live_generation() {
        Ok(Some(generation)) => generation,
        Ok(None) => {
            warn!("Index not found: {}", ctx.opts.index_name);
            return Ok(TailCycle::NoLiveIndex);
        }
        Err(e) => {
            error!("Cannot resolve live index: {}", e);
            return Ok(TailCycle::NoLiveIndex);
        }
    };

    if state.writer.as_ref().map(|w| w.generation().name.as_str()) != Some(live.name.as_str()) {
        // Drop the previous writer (and its lock) before opening the new one.
        state.writer = None;
        match BulkWriter::open(&ctx.lifecycle, &live) {
            Ok(writer) => {
                info!("Index: {}", live.name);
                state.writer = Some(writer);
            }
            Err(e) => {
                error!("Cannot open live index {}: {}", live.name, e);
                return Ok(TailCycle::NoLiveIndex);
            }
        }
    }

    let min_id = match ctx.lifecycle.max_committed_id(&live) {
        Ok(max) => max,
        Err(e) => {
            // Index removed or swapped mid-cycle; resolve again next time.
            error!("Cannot read max committed id of {}: {}", live.name, e);
            state.writer = None;
            return Ok(TailCycle::NoLiveIndex);
        }
    };

    let limit = ctx.opts.tail_bulk_size;
    let rows = match fetch_batch(ctx, min_id, limit, &mut state.fetch_retries)? {
        Some(rows) => rows,
        None => return Ok(TailCycle::Interrupted),
    };
    if rows.is_empty() {
        // Caught up to the present, not exhausted; the caller idles.
        return Ok(TailCycle::Idle);
    }

    let started = Instant::now();
    let docs = transform_batch(&ctx.pool, &rows);
    let Some(writer) = state.writer.as_mut() else {
        return Ok(TailCycle::NoLiveIndex);
    };
    match write_with_retry(
        || writer.write_batch(&docs),
        &ctx.opts,
        &ctx.shutdown,
        &mut state.bulk_retries,
    )? {
        BatchWrite::Interrupted => return Ok(TailCycle::Interrupted),
        BatchWrite::Committed { .. } => {}
    }

    let ids: BTreeSet<u64> = rows.iter().map(|r| r.post_id).collect();
    ctx.source
        .acknowledge(&ids)
        .context("acknowledge indexed rows")?;
    info!("{} indexed in {:.2?}", docs.len(), started.elapsed());
    Ok(TailCycle::Indexed(docs.len()))
}

/// Fetch with transient-error retries. `None` means shutdown arrived during
/// a backoff wait.
fn fetch_batch(
    ctx: &mut IndexerContext,
    min_id: u64,
    limit: usize,
    retries: &mut RetryCounter,
) -> Result<Option<Vec<SourceRow>>> {
    loop {
        match ctx.source.fetch_after(min_id, limit) {
            Ok(rows) => {
                retries.reset();
                return Ok(Some(rows));
            }
            Err(e) => {
                error!("Source fetch failed: {:#}", e);
                if retries.record_failure() {
                    return Err(FatalError::SourceUnreachable(format!(
                        "{} consecutive fetch failures: {e:#}",
                        retries.consecutive()
                    ))
                    .into());
                }
                if ctx.shutdown.wait(ctx.opts.bulk_retry_delay) {
                    return Ok(None);
                }
            }
        }
    }
}

/// Drive one batch to a committed write. Partial failures retry the whole
/// batch after a delay (redelivery is safe: document ids make the writes
/// idempotent) until the error budget runs out; an unreachable destination
/// is fatal immediately.
pub fn write_with_retry(
    mut attempt: impl FnMut() -> BulkOutcome,
    opts: &Opts,
    shutdown: &Shutdown,
    retries: &mut RetryCounter,
) -> Result<BatchWrite> {
    loop {
        match attempt() {
            BulkOutcome::AllSucceeded { max_post_id } => {
                retries.reset();
                return Ok(BatchWrite::Committed { max_post_id });
            }
            BulkOutcome::PartialFailure { failed_ids, cause } => {
                error!(
                    "Bulk indexing error: {} docs rejected ({})",
                    failed_ids.len(),
                    cause
                );
                if retries.record_failure() {
                    return Err(FatalError::ErrorBudgetExhausted(format!(
                        "{} consecutive bulk failures; last cause: {cause}",
                        retries.consecutive()
                    ))
                    .into());
                }
                if shutdown.wait(opts.bulk_retry_delay) {
                    return Ok(BatchWrite::Interrupted);
                }
            }
            BulkOutcome::Unreachable(cause) => {
                return Err(FatalError::DestinationUnreachable(cause).into());
            }
        }
    }
}

fn dest_fatal(e: SearchError) -> anyhow::Error {
    FatalError::DestinationUnreachable(e.to_string()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn test_opts() -> Opts {
        Opts {
            source_db: PathBuf::from(":memory:"),
            index_root: PathBuf::from("."),
            index_name: "posts".into(),
            bulk_size: 500,
            tail_bulk_size: 100,
            max_workers: 2,
            max_bulk_errors: 5,
            bulk_retry_delay: Duration::from_millis(0),
            tail_poll_interval: Duration::from_millis(0),
            source_strategy: crate::types::SourceStrategy::Scan,
            state_path: PathBuf::from("postmirror.state"),
            verbose: false,
        }
    }

    #[test]
    fn partial_failures_retry_then_commit() {
        let opts = test_opts();
        let (shutdown, _handle) = Shutdown::new();
        let mut retries = RetryCounter::new(opts.max_bulk_errors);

        let mut outcomes = vec![
            BulkOutcome::AllSucceeded { max_post_id: 1000 },
            BulkOutcome::PartialFailure {
                failed_ids: [7u64, 8, 9].into(),
                cause: "mapping conflict".into(),
            },
            BulkOutcome::PartialFailure {
                failed_ids: [7u64].into(),
                cause: "mapping conflict".into(),
            },
        ];
        let result = write_with_retry(
            || outcomes.pop().expect("attempts exhausted"),
            &opts,
            &shutdown,
            &mut retries,
        )
        .unwrap();

        match result {
            BatchWrite::Committed { max_post_id } => assert_eq!(max_post_id, 1000),
            BatchWrite::Interrupted => panic!("unexpected interrupt"),
        }
        // Success on the third attempt resets the counter.
        assert_eq!(retries.consecutive(), 0);
    }

    #[test]
    fn error_budget_exhaustion_is_fatal() {
        let mut opts = test_opts();
        opts.max_bulk_errors = 3;
        let (shutdown, _handle) = Shutdown::new();
        let mut retries = RetryCounter::new(opts.max_bulk_errors);

        let err = write_with_retry(
            || BulkOutcome::PartialFailure {
                failed_ids: [1u64].into(),
                cause: "rejected".into(),
            },
            &opts,
            &shutdown,
            &mut retries,
        )
        .unwrap_err();

        let fatal = err.downcast_ref::<FatalError>().expect("fatal error");
        assert_eq!(fatal.exit_code(), 13);
    }

    #[test]
    fn unreachable_destination_is_fatal_immediately() {
        let opts = test_opts();
        let (shutdown, _handle) = Shutdown::new();
        let mut retries = RetryCounter::new(opts.max_bulk_errors);

        let mut attempts = 0;
        let err = write_with_retry(
            || {
                attempts += 1;
                BulkOutcome::Unreachable("connection refused".into())
            },
            &opts,
            &shutdown,
            &mut retries,
        )
        .unwrap_err();

        assert_eq!(attempts, 1);
        let fatal = err.downcast_ref::<FatalError>().expect("fatal error");
        assert_eq!(fatal.exit_code(), 11);
    }

    #[test]
    fn shutdown_during_backoff_interrupts() {
        let mut opts = test_opts();
        opts.bulk_retry_delay = Duration::from_millis(50);
        let (shutdown, handle) = Shutdown::new();
        let mut retries = RetryCounter::new(opts.max_bulk_errors);
        handle.trigger();

        let result = write_with_retry(
            || BulkOutcome::PartialFailure {
                failed_ids: [1u64].into(),
                cause: "rejected".into(),
            },
            &opts,
            &shutdown,
            &mut retries,
        )
        .unwrap();
        assert!(matches!(result, BatchWrite::Interrupted));
    }
}
