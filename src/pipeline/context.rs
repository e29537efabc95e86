//! Orchestrator context and shutdown signalling.
//!
//! Everything a run needs travels in one context object passed into each
//! phase; no process-wide mutable state.

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::engine::source::SourceReader;
use crate::pipeline::watermark::WatermarkStore;
use crate::search::IndexLifecycle;
use crate::types::Opts;

/// Cooperative shutdown flag. Loops check it at batch boundaries and use
/// [`Shutdown::wait`] instead of sleeping, so an idle tailing loop wakes up
/// immediately when the signal arrives. The in-flight batch always completes
/// or fails normally; nothing is torn down mid-write.
pub struct Shutdown {
    requested: Arc<AtomicBool>,
    rx: Receiver<()>,
}

/// The triggering side of a [`Shutdown`] (signal handler or test).
#[derive(Clone)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,
    tx: Sender<()>,
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        self.requested.store(true, Ordering::Relaxed);
        let _ = self.tx.try_send(());
    }
}

impl Shutdown {
    pub fn new() -> (Shutdown, ShutdownHandle) {
        let (tx, rx) = bounded::<()>(1);
        let requested = Arc::new(AtomicBool::new(false));
        (
            Shutdown {
                requested: Arc::clone(&requested),
                rx,
            },
            ShutdownHandle { requested, tx },
        )
    }

    /// Wire the shutdown flag to Ctrl+C.
    pub fn install_ctrlc() -> Result<Shutdown> {
        let (shutdown, handle) = Shutdown::new();
        ctrlc::set_handler(move || handle.trigger()).context("set Ctrl+C handler")?;
        Ok(shutdown)
    }

    pub fn requested(&self) -> bool {
        self.requested.load(Ordering::Relaxed)
    }

    /// Sleep for up to `delay`, waking early on shutdown. Returns true when
    /// shutdown was requested (before or during the wait).
    pub fn wait(&self, delay: Duration) -> bool {
        if self.requested() {
            return true;
        }
        match self.rx.recv_timeout(delay) {
            Ok(()) => true,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => self.requested(),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                std::thread::sleep(delay);
                self.requested()
            }
        }
    }
}

/// Shared context for one indexer run: resolved options, the source reader,
/// the destination lifecycle manager, the watermark store, the long-lived
/// transform pool, and the shutdown flag.
pub struct IndexerContext {
    pub opts: Opts,
    pub source: Box<dyn SourceReader>,
    pub lifecycle: IndexLifecycle,
    pub watermarks: WatermarkStore,
    pub pool: rayon::ThreadPool,
    pub shutdown: Shutdown,
}

impl IndexerContext {
    /// Build a context from resolved options. The transform pool is created
    /// once here and reused for every batch of the run.
    pub fn new(
        opts: Opts,
        source: Box<dyn SourceReader>,
        shutdown: Shutdown,
    ) -> Result<IndexerContext> {
        let lifecycle = IndexLifecycle::new(&opts.index_root, &opts.index_name);
        let watermarks = WatermarkStore::new(&opts.state_path);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(opts.max_workers)
            .thread_name(|i| format!("transform-{i}"))
            .build()
            .context("build transform worker pool")?;
        Ok(IndexerContext {
            opts,
            source,
            lifecycle,
            watermarks,
            pool,
            shutdown,
        })
    }
}
