//! Durable watermark store: one small JSON record, replaced atomically.
//!
//! A partially written watermark must never be visible as valid, so every
//! save writes to a temp file in the same directory and renames over the
//! final path.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::Watermark;

pub struct WatermarkStore {
    path: PathBuf,
}

impl WatermarkStore {
    pub fn new(path: impl Into<PathBuf>) -> WatermarkStore {
        WatermarkStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted watermark. A missing file is `None` (fresh start).
    /// A file that exists but does not parse is also `None`: an unreadable
    /// watermark cannot be trusted, and bootstrap validation treats the
    /// generation it pointed at as unconfirmed anyway. Other I/O errors are
    /// real failures.
    pub fn load(&self) -> Result<Option<Watermark>> {
        let s = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("read watermark {}", self.path.display()));
            }
        };
        match serde_json::from_str(&s) {
            Ok(w) => Ok(Some(w)),
            Err(e) => {
                log::warn!("discarding unreadable watermark {}: {}", self.path.display(), e);
                Ok(None)
            }
        }
    }

    /// Persist the watermark atomically (write temp, rename).
    pub fn save(&self, watermark: &Watermark) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create watermark dir {}", parent.display()))?;
        }
        let temp = self.path.with_extension("tmp");
        fs::write(&temp, serde_json::to_vec(watermark).context("encode watermark")?)
            .with_context(|| format!("write watermark temp {}", temp.display()))?;
        fs::rename(&temp, &self.path).context("atomic rename watermark temp to final path")?;
        Ok(())
    }

    /// Remove the watermark. Idempotent: a missing file is fine.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("remove watermark {}", self.path.display()))
            }
        }
    }
}
