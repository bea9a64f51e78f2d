//! Durable record of catalog ids that have already been handled.
//!
//! The file is a small JSON document. Every change computes the complete next
//! state, stages it in a temporary file next to the target, syncs it, and
//! renames it over the target. A reader therefore sees either the old or the
//! new document, never a partial one. Two processes writing the same registry
//! at once is not supported.

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    io::Write,
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Result, SleeveError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Added,
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryState {
    #[serde(default)]
    pub processed: BTreeSet<String>,
    #[serde(default)]
    pub added: BTreeSet<String>,
    #[serde(default)]
    pub skipped: BTreeSet<String>,
}

impl RegistryState {
    /// The state after recording `id`. An id that is already processed keeps
    /// its original outcome.
    pub fn with_outcome(&self, id: &str, outcome: Outcome) -> Self {
        let mut next = self.clone();
        if next.processed.insert(id.to_string()) {
            match outcome {
                Outcome::Added => next.added.insert(id.to_string()),
                Outcome::Skipped => next.skipped.insert(id.to_string()),
            };
        }
        next
    }

    fn check(&self) -> std::result::Result<(), String> {
        if let Some(id) = self.added.intersection(&self.skipped).next() {
            return Err(format!("id {id} is both added and skipped"));
        }
        if let Some(id) = self
            .added
            .union(&self.skipped)
            .find(|id| !self.processed.contains(*id))
        {
            return Err(format!("id {id} has an outcome but is not processed"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    pub processed: usize,
    pub added: usize,
    pub skipped: usize,
}

/// A fully written but not yet committed registry state.
///
/// Dropping it without calling [`StagedWrite::commit`] discards the temporary
/// file and leaves the target untouched.
pub struct StagedWrite {
    file: NamedTempFile,
    target: PathBuf,
}

impl StagedWrite {
    pub fn stage(target: &Path, state: &RegistryState) -> Result<Self> {
        let dir = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let mut file = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut file, state)?;
        file.write_all(b"\n")?;
        file.as_file().sync_all()?;
        Ok(Self {
            file,
            target: target.to_path_buf(),
        })
    }

    pub fn commit(self) -> Result<()> {
        self.file
            .persist(&self.target)
            .map_err(|e| SleeveError::Registry(format!("{}: {}", self.target.display(), e)))?;
        Ok(())
    }
}

pub struct ProcessingRegistry {
    path: PathBuf,
    state: RegistryState,
}

impl ProcessingRegistry {
    /// Loads the registry, creating an empty one if the file is absent.
    ///
    /// An existing file is only read. A file that does not parse, or whose
    /// sets contradict each other, is an error and is left as it is.
    pub fn init(path: impl AsRef<Path>) -> Result<(Self, RegistryStats)> {
        let path = path.as_ref().to_path_buf();

        let state = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            let state: RegistryState = serde_json::from_str(&text).map_err(|e| {
                SleeveError::Registry(format!("{} is corrupt: {e}", path.display()))
            })?;
            state.check().map_err(|reason| {
                SleeveError::Registry(format!("{} is inconsistent: {reason}", path.display()))
            })?;
            state
        } else {
            info!("Creating empty registry at {}", path.display());
            let state = RegistryState::default();
            StagedWrite::stage(&path, &state)?.commit()?;
            state
        };

        let registry = Self { path, state };
        let stats = registry.stats();
        info!(
            "Registry: {} processed ({} added, {} skipped)",
            stats.processed, stats.added, stats.skipped
        );
        Ok((registry, stats))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_processed(&self, id: &str) -> bool {
        self.state.processed.contains(id)
    }

    pub fn outcome(&self, id: &str) -> Option<Outcome> {
        if self.state.added.contains(id) {
            Some(Outcome::Added)
        } else if self.state.skipped.contains(id) {
            Some(Outcome::Skipped)
        } else {
            None
        }
    }

    /// Records `id` durably. Marking an id twice does not write anything.
    pub fn mark_processed(&mut self, id: &str, outcome: Outcome) -> Result<()> {
        if self.is_processed(id) {
            debug!("{} already recorded, leaving registry untouched", id);
            return Ok(());
        }
        let next = self.state.with_outcome(id, outcome);
        StagedWrite::stage(&self.path, &next)?.commit()?;
        self.state = next;
        debug!("Recorded {} as {:?}", id, outcome);
        Ok(())
    }

    /// Empties every set.
    pub fn reset(&mut self) -> Result<()> {
        let next = RegistryState::default();
        StagedWrite::stage(&self.path, &next)?.commit()?;
        self.state = next;
        info!("Registry reset at {}", self.path.display());
        Ok(())
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            processed: self.state.processed.len(),
            added: self.state.added.len(),
            skipped: self.state.skipped.len(),
        }
    }

    pub fn state(&self) -> &RegistryState {
        &self.state
    }
}
