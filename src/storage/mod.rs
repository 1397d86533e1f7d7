//! Storage layer for Talentsift
//!
//! Provides the candidate store and the on-disk layout for derived indices

pub mod blob;
pub mod database;

use crate::error::{Result, SiftError};
use std::path::PathBuf;

pub use blob::{commit_staged, content_hash, read_blob, stage_atomic, write_atomic, write_blob};
pub use database::{Candidate, Database, DbPool};

/// Storage manager that owns the data directory layout
///
/// ```text
/// <base>/store/db.sqlite             candidate records
/// <base>/store/lexical.snapshot      BM25 + TF-IDF cache entry
/// <base>/store/vectors/index.bin     dense embeddings
/// <base>/store/vectors/ids.json      id mapping (parallel to index.bin)
/// ```
pub struct StorageManager {
    pub database: Database,
    base_path: PathBuf,
}

impl StorageManager {
    /// Create a new storage manager
    pub fn new(base_path: PathBuf) -> Result<Self> {
        let store = base_path.join("store");

        std::fs::create_dir_all(store.join("vectors")).map_err(|e| SiftError::Io {
            source: e,
            context: format!("Failed to create store directory: {}", store.display()),
        })?;

        let database = Database::new(&store.join("db.sqlite"))?;

        Ok(Self {
            database,
            base_path,
        })
    }

    /// Directory holding all rebuildable machine data
    pub fn store_dir(&self) -> PathBuf {
        self.base_path.join("store")
    }

    /// Persisted lexical cache entry
    pub fn lexical_snapshot_path(&self) -> PathBuf {
        self.store_dir().join("lexical.snapshot")
    }

    /// Dense vector data file
    pub fn vector_index_path(&self) -> PathBuf {
        self.store_dir().join("vectors").join("index.bin")
    }

    /// Ordered candidate id list paired with the vector data file
    pub fn vector_ids_path(&self) -> PathBuf {
        self.store_dir().join("vectors").join("ids.json")
    }
}
