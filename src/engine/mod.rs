//! Engine module: CLI surface and source readers.

pub mod arg_parser;
pub mod handlers;
pub mod source;

// Re-export commonly used items
pub use arg_parser::{Cli, Commands, CommonArgs};
pub use handlers::{handle_build, handle_run, handle_tail};
pub use source::{open_reader, open_source_db, PendingReader, ScanReader, SourceReader};
