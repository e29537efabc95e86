//! Pipeline components: run context, orchestrator state machine, transform,
//! watermark store, retry accounting.

pub mod context;
pub mod orchestrator;
pub mod retry;
pub mod transform;
pub mod watermark;

pub use context::{IndexerContext, Shutdown, ShutdownHandle};
pub use orchestrator::{run_build, run_tail, tail_once, BatchWrite, TailCycle, TailState};
pub use retry::RetryCounter;
pub use transform::{doc_from_row, transform_batch};
pub use watermark::WatermarkStore;
