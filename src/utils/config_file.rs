//! Load `postmirror.toml` from the working directory (CLI only). Lib callers
//! inject config through [`crate::Opts`] directly.

use serde::Deserialize;
use std::path::Path;

use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ConfigFile {
    #[serde(default)]
    pub(crate) settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SettingsSection {
    pub(crate) db: Option<String>,
    pub(crate) index_dir: Option<String>,
    pub(crate) index_name: Option<String>,
    pub(crate) bulk_size: Option<usize>,
    pub(crate) tail_bulk_size: Option<usize>,
    pub(crate) max_workers: Option<usize>,
    pub(crate) max_bulk_errors: Option<u32>,
    pub(crate) tail_poll_interval: Option<u64>,
    pub(crate) state_file: Option<String>,
    pub(crate) verbose: Option<bool>,
}

/// Load `postmirror.toml` from `dir` if present. Returns None if the file is
/// missing or unreadable; a malformed file is logged and ignored.
pub(crate) fn load_config_file(dir: &Path) -> Option<ConfigFile> {
    let path = dir.join(PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    toml::from_str(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}
