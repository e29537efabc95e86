//! Typed errors for the destination index.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("index error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    #[error("index I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("alias file corrupt: {0}")]
    AliasFile(#[from] serde_json::Error),

    /// More than one generation claims to be in progress, or the alias map
    /// contradicts what is on disk. Never repaired by guessing.
    #[error("consistency violation: {0}")]
    Consistency(String),

    #[error("index schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("no such generation: {}", .0.display())]
    MissingGeneration(PathBuf),
}
