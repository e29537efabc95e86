//! Alias file: the single externally visible name -> generation mapping.
//!
//! One small JSON file in the index root, replaced atomically on every
//! mutation (write temp, rename). A reader resolves a name with one file
//! read, so it observes either the old map or the new map, never a mix.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::search::SearchError;

pub const ALIASES_FILENAME: &str = "aliases.json";

/// Alias marking a generation as still being built. A generation targeted by
/// any alias with this prefix is in progress; at most one may exist.
pub const BUILDING_ALIAS: &str = "indexing";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Aliases {
    aliases: BTreeMap<String, String>,
}

impl Aliases {
    /// Load the alias map from `root`. A missing file is an empty map.
    pub fn load(root: &Path) -> Result<Aliases, SearchError> {
        let path = alias_path(root);
        match fs::read_to_string(&path) {
            Ok(s) => Ok(serde_json::from_str(&s)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Aliases::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the alias file atomically: write to a temp file in the same
    /// directory, then rename over the final path.
    pub fn store(&self, root: &Path) -> Result<(), SearchError> {
        let path = alias_path(root);
        let temp = path.with_extension("json.tmp");
        fs::write(&temp, serde_json::to_vec_pretty(self)?)?;
        fs::rename(&temp, &path)?;
        Ok(())
    }

    /// Generation targeted by `name`, if any.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: &str, generation: &str) {
        self.aliases.insert(name.to_string(), generation.to_string());
    }

    pub fn remove(&mut self, name: &str) {
        self.aliases.remove(name);
    }

    /// Generations targeted by any `indexing*` alias, ascending by alias name.
    pub fn building_generations(&self) -> Vec<&str> {
        self.aliases
            .iter()
            .filter(|(name, _)| name.starts_with(BUILDING_ALIAS))
            .map(|(_, generation)| generation.as_str())
            .collect()
    }

    /// Every generation referenced by any alias.
    pub fn referenced_generations(&self) -> Vec<&str> {
        self.aliases.values().map(String::as_str).collect()
    }

    /// Alias names currently pointing at `generation`.
    pub fn aliases_of(&self, generation: &str) -> Vec<String> {
        self.aliases
            .iter()
            .filter(|(_, target)| target.as_str() == generation)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

pub(crate) fn alias_path(root: &Path) -> PathBuf {
    root.join(ALIASES_FILENAME)
}
