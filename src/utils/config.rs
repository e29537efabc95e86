//! Application configuration constants.
//! Tuning and defaults in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived filenames: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    state_filename: String,
    config_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache paths from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                state_filename: format!("{pkg}.state"),
                config_filename: format!("{pkg}.toml"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Watermark file name, placed in the index root by default.
    pub fn state_filename(&self) -> &str {
        &self.state_filename
    }

    /// Optional config file looked up in the working directory.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }
}

// ---- Indexing defaults ----

/// Defaults for every tunable the CLI / env / config file can override.
pub struct IndexingDefaults;

impl IndexingDefaults {
    /// Directory holding index generations and the alias file.
    pub const INDEX_DIR: &'static str = "./index";
    /// Externally visible index name.
    pub const INDEX_NAME: &'static str = "posts";
    /// Rows fetched and written per batch during the catch-up build.
    pub const BULK_SIZE: usize = 500;
    /// Rows per batch while tailing (small, for low write latency).
    pub const TAIL_BULK_SIZE: usize = 100;
    /// Transform worker threads.
    pub const MAX_WORKERS: usize = 2;
    /// Consecutive bulk failures tolerated before fatal abort.
    pub const MAX_BULK_ERRORS: u32 = 5;
    /// Seconds to wait before retrying a failed bulk write.
    pub const BULK_RETRY_DELAY_SECS: u64 = 1;
    /// Seconds to sleep when a tailing poll finds nothing new.
    pub const TAIL_POLL_INTERVAL_SECS: u64 = 5;
}

// ---- Destination index ----

/// Memory budget for the tantivy index writer (bytes). 50 MB.
pub const WRITER_MEMORY_BUDGET: usize = 50 * 1024 * 1024;

// ---- Progress ----

/// Progress bar unit label for the catch-up build.
pub const PROGRESS_UNIT: &str = " posts";
