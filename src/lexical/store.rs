//! Cached lexical structures keyed by corpus size

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{Bm25Model, LexicalError, TfidfModel};
use crate::error::Result;
use crate::storage::{read_blob, write_blob};

/// One versioned cache entry: both models plus the corpus size they were
/// fitted on. Entries are never mutated; a stale entry is replaced wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexicalSnapshot {
    pub doc_count: usize,
    pub bm25: Bm25Model,
    pub tfidf: TfidfModel,
}

impl LexicalSnapshot {
    /// Fit both models over the corpus
    pub fn build(corpus: &[String]) -> Self {
        Self {
            doc_count: corpus.len(),
            bm25: Bm25Model::fit(corpus),
            tfidf: TfidfModel::fit(corpus),
        }
    }

    fn to_bytes(&self) -> std::result::Result<Vec<u8>, LexicalError> {
        serde_json::to_vec(self).map_err(|e| LexicalError::Serialization(e.to_string()))
    }

    fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, LexicalError> {
        serde_json::from_slice(bytes).map_err(|e| LexicalError::Corrupt(e.to_string()))
    }
}

/// Loads, validates, rebuilds and persists the lexical snapshot.
///
/// Staleness is judged only by document count: a corpus that was reordered
/// without changing size reuses the old entry.
pub struct LexicalIndexStore {
    path: PathBuf,
    cached: Option<Arc<LexicalSnapshot>>,
    builds: usize,
}

impl LexicalIndexStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            cached: None,
            builds: 0,
        }
    }

    /// Return structures valid for `corpus`, rebuilding when the stored
    /// document count differs from `corpus.len()`.
    pub fn get_or_build(&mut self, corpus: &[String]) -> Result<Arc<LexicalSnapshot>> {
        let doc_count = corpus.len();

        if let Some(cached) = &self.cached {
            if cached.doc_count == doc_count {
                debug!("Using in-memory lexical snapshot ({} docs)", doc_count);
                return Ok(Arc::clone(cached));
            }
        }

        if let Some(stored) = self.load() {
            if stored.doc_count == doc_count {
                info!("Loaded lexical snapshot from disk ({} docs)", doc_count);
                let stored = Arc::new(stored);
                self.cached = Some(Arc::clone(&stored));
                return Ok(stored);
            }
            info!(
                "Lexical snapshot is stale ({} docs stored, {} in corpus); rebuilding",
                stored.doc_count, doc_count
            );
        } else {
            info!("No usable lexical snapshot; building");
        }

        let snapshot = LexicalSnapshot::build(corpus);
        self.builds += 1;
        self.persist(&snapshot)?;

        let snapshot = Arc::new(snapshot);
        self.cached = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Number of times the models were fitted by this store
    pub fn build_count(&self) -> usize {
        self.builds
    }

    /// Document count of the persisted entry, if one can be read
    pub fn stored_doc_count(&self) -> Option<usize> {
        self.load().map(|s| s.doc_count)
    }

    fn load(&self) -> Option<LexicalSnapshot> {
        let bytes = match read_blob(&self.path) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read lexical snapshot, ignoring it: {}", e);
                return None;
            }
        };

        match LexicalSnapshot::from_bytes(&bytes) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("Discarding unreadable lexical snapshot: {}", e);
                None
            }
        }
    }

    fn persist(&self, snapshot: &LexicalSnapshot) -> Result<()> {
        let bytes = snapshot.to_bytes()?;
        let compressed = write_blob(&self.path, &bytes)?;
        debug!(
            "Saved lexical snapshot to {} ({} bytes, compressed: {})",
            self.path.display(),
            bytes.len(),
            compressed
        );
        Ok(())
    }
}
