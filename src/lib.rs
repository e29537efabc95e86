//! Postmirror: continuous post indexer with crash-safe rebuilds and atomic cutover
//!
//! Mirrors an append-only posts database into a Tantivy full-text index.
//! A build constructs a brand-new index generation from scratch (resuming a
//! crashed build when the persisted watermark and the index agree), cuts
//! over atomically so readers never see a partial index, retires superseded
//! generations, then keeps the live index fresh by tailing newly arrived
//! rows.

pub mod engine;
pub mod pipeline;
pub mod search;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

use log::debug;

/// Result alias used by the public postmirror API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point for library callers: run a full build against an
/// injected source reader, cut over, and (unless `once`) keep tailing until
/// `shutdown` fires.
///
/// The CLI wires `shutdown` to Ctrl+C; embedders pass their own
/// [`pipeline::Shutdown`] handle pair.
pub fn mirror(
    opts: Opts,
    source: Box<dyn engine::SourceReader>,
    shutdown: pipeline::Shutdown,
    once: bool,
) -> Result<()> {
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );
    let mut ctx = pipeline::IndexerContext::new(opts, source, shutdown)?;
    pipeline::run_build(&mut ctx, once)
}
