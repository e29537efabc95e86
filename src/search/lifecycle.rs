//! Index generation lifecycle: create, find in progress, cut over, retire.
//!
//! Every build attempt gets its own index directory (`{base}-{timestamp}`)
//! under the index root. Status is carried entirely by the alias file: the
//! `indexing` alias marks a generation as building, the base-name alias marks
//! it live, and a generation with neither alias is retiring and may be
//! deleted. Cutover is one atomic alias-file replace, so concurrent readers
//! see either the old generation or the new one.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::debug;
use tantivy::Index;

use crate::search::aliases::{Aliases, BUILDING_ALIAS};
use crate::search::schema::PostSchema;
use crate::search::SearchError;

/// One build attempt of the destination index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Generation {
    pub name: String,
    pub dir: PathBuf,
}

/// Manages index generations under one root for one base name.
pub struct IndexLifecycle {
    root: PathBuf,
    base_name: String,
}

impl IndexLifecycle {
    pub fn new(root: impl Into<PathBuf>, base_name: impl Into<String>) -> IndexLifecycle {
        IndexLifecycle {
            root: root.into(),
            base_name: base_name.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    fn generation(&self, name: &str) -> Generation {
        Generation {
            name: name.to_string(),
            dir: self.root.join(name),
        }
    }

    /// Allocate a fresh, empty generation and mark it building.
    pub fn create_generation(&self) -> Result<Generation, SearchError> {
        fs::create_dir_all(&self.root)?;
        let generation = self.generation(&self.new_generation_name());
        fs::create_dir(&generation.dir)?;
        Index::create_in_dir(&generation.dir, PostSchema::build().schema().clone())?;

        let mut aliases = Aliases::load(&self.root)?;
        aliases.set(BUILDING_ALIAS, &generation.name);
        aliases.store(&self.root)?;
        Ok(generation)
    }

    /// Timestamped generation name, bumped with a suffix on collision.
    fn new_generation_name(&self) -> String {
        let stamp = Utc::now().format("%Y-%m-%dt%H-%M-%S%.3f");
        let base = format!("{}-{}", self.base_name, stamp);
        let mut name = base.clone();
        let mut n = 1;
        while self.root.join(&name).exists() {
            n += 1;
            name = format!("{base}-{n}");
        }
        name
    }

    /// The generation currently marked building, if any. Finding more than
    /// one is a consistency violation: a previous run crashed mid-cutover or
    /// two builders raced, and guessing which to trust risks silent loss.
    pub fn find_in_progress(&self) -> Result<Option<Generation>, SearchError> {
        let aliases = Aliases::load(&self.root)?;
        let building = aliases.building_generations();
        match building.as_slice() {
            [] => Ok(None),
            [name] => Ok(Some(self.generation(name))),
            names => Err(SearchError::Consistency(format!(
                "{} generations in progress: {}",
                names.len(),
                names.join(", ")
            ))),
        }
    }

    /// The generation the base name currently resolves to, if any.
    pub fn live_generation(&self) -> Result<Option<Generation>, SearchError> {
        let aliases = Aliases::load(&self.root)?;
        Ok(aliases.resolve(&self.base_name).map(|n| self.generation(n)))
    }

    /// Atomically make `generation` the externally visible index: repoint the
    /// base name and drop the building marker in a single alias-file replace.
    /// The previously live generation keeps its directory (now retiring)
    /// until [`IndexLifecycle::retire_superseded`] runs.
    pub fn cutover(&self, generation: &Generation) -> Result<(), SearchError> {
        let mut aliases = Aliases::load(&self.root)?;
        aliases.set(&self.base_name, &generation.name);
        aliases.remove(BUILDING_ALIAS);
        aliases.store(&self.root)?;
        debug!("cutover: {} is now {}", self.base_name, generation.name);
        Ok(())
    }

    /// Delete every generation directory that is neither live nor building.
    /// Returns the number of directories removed.
    pub fn retire_superseded(&self) -> Result<usize, SearchError> {
        let aliases = Aliases::load(&self.root)?;
        let keep = aliases.referenced_generations();
        let prefix = format!("{}-", self.base_name);

        let mut removed = 0;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(&prefix) && !keep.contains(&name.as_str()) {
                debug!("retiring index {}", name);
                fs::remove_dir_all(entry.path())?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Drop a generation entirely: its aliases and its directory. Used when
    /// bootstrap validation rejects a crashed build.
    pub fn delete_generation(&self, generation: &Generation) -> Result<(), SearchError> {
        let mut aliases = Aliases::load(&self.root)?;
        for alias in aliases.aliases_of(&generation.name) {
            aliases.remove(&alias);
        }
        aliases.store(&self.root)?;
        if generation.dir.exists() {
            fs::remove_dir_all(&generation.dir)?;
        }
        Ok(())
    }

    /// Open a generation's tantivy index.
    pub fn open_index(&self, generation: &Generation) -> Result<Index, SearchError> {
        if !generation.dir.join("meta.json").exists() {
            return Err(SearchError::MissingGeneration(generation.dir.clone()));
        }
        Ok(Index::open_in_dir(&generation.dir)?)
    }

    /// Maximum `post_id` committed into a generation, 0 when empty. Scans the
    /// fast-field column of alive docs per segment, the destination-side
    /// source of truth that bootstrap validation and tailing resume use.
    pub fn max_committed_id(&self, generation: &Generation) -> Result<u64, SearchError> {
        let index = self.open_index(generation)?;
        // Validates the on-disk mapping before trusting the fast field.
        PostSchema::for_schema(index.schema())?;

        let searcher = index.reader()?.searcher();
        let mut max_id = 0u64;
        for segment_reader in searcher.segment_readers() {
            let column = segment_reader.fast_fields().u64("post_id")?;
            for doc_id in 0..segment_reader.max_doc() {
                if segment_reader.is_deleted(doc_id) {
                    continue;
                }
                if let Some(value) = column.first(doc_id) {
                    max_id = max_id.max(value);
                }
            }
        }
        Ok(max_id)
    }

    /// Number of alive documents in a generation.
    pub fn doc_count(&self, generation: &Generation) -> Result<u64, SearchError> {
        let index = self.open_index(generation)?;
        Ok(index.reader()?.searcher().num_docs())
    }
}
