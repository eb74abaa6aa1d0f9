//! JSON card store
//!
//! One JSON document holds the whole collection: cards, relationship
//! edges, and the scheduler parameters they were reviewed under. Saves
//! go through a temp file in the same directory plus a rename, so a
//! crash mid-write never leaves a torn store behind.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use synapdeck_core::{
    CardCollection, FsrsParameters, RelationEdge, RelationshipGraph, SchedulerEngine,
};

/// Store error taxonomy
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not determine a data directory for this platform")]
    NoDataDir,
    #[error("store I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("store at {path} is not valid JSON: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// On-disk document shape
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreDocument {
    version: u32,
    #[serde(default)]
    params: FsrsParameters,
    cards: CardCollection,
    #[serde(default)]
    edges: Vec<RelationEdge>,
}

const STORE_VERSION: u32 = 1;

/// File-backed card store
#[derive(Debug)]
pub struct CardStore {
    path: PathBuf,
}

impl CardStore {
    /// Open a store at an explicit path, or at the platform default
    /// (`~/.local/share/synapdeck/cards.json` on Linux)
    pub fn open(path: Option<PathBuf>) -> Result<Self, StoreError> {
        let path = match path {
            Some(p) => p,
            None => default_store_path()?,
        };
        Ok(Self { path })
    }

    /// The backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load an engine from the store. A missing file is an empty
    /// collection, not an error.
    pub fn load(&self) -> Result<SchedulerEngine, StoreError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no store file, starting empty");
            return Ok(SchedulerEngine::new(FsrsParameters::default()));
        }
        let raw = fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        let doc: StoreDocument =
            serde_json::from_str(&raw).map_err(|source| StoreError::Malformed {
                path: self.path.clone(),
                source,
            })?;
        debug!(
            path = %self.path.display(),
            cards = doc.cards.len(),
            edges = doc.edges.len(),
            "store loaded"
        );
        Ok(SchedulerEngine::with_state(
            doc.cards,
            RelationshipGraph::from_edges(doc.edges),
            doc.params,
        ))
    }

    /// Persist the engine state atomically
    pub fn save(&self, engine: SchedulerEngine) -> Result<(), StoreError> {
        let params = engine.params().clone();
        let (cards, edges) = engine.into_state();
        let doc = StoreDocument {
            version: STORE_VERSION,
            params,
            cards,
            edges,
        };
        let json = serde_json::to_string_pretty(&doc).map_err(|source| StoreError::Malformed {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        // Write-then-rename keeps the previous store intact on failure
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), "store saved");
        Ok(())
    }
}

fn default_store_path() -> Result<PathBuf, StoreError> {
    let dirs = ProjectDirs::from("org", "synapdeck", "synapdeck").ok_or(StoreError::NoDataDir)?;
    Ok(dirs.data_dir().join("cards.json"))
}

// ============================================================================
// TESTS
// ============================================================================
