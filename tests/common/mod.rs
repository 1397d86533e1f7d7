#![allow(dead_code)]

use std::sync::Arc;
use talentsift::embedding::{EmbeddingError, EmbeddingProvider, HashEmbedder, VectorIndex};
use talentsift::storage::{content_hash, Candidate, StorageManager};
use tempfile::TempDir;

/// Temp data dir with a store and a vector index over `provider`
pub struct Fixture {
    pub temp: TempDir,
    pub storage: StorageManager,
    pub vectors: VectorIndex,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_provider(Arc::new(HashEmbedder::new(64)))
    }

    pub fn with_provider(provider: Arc<dyn EmbeddingProvider>) -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let storage = StorageManager::new(temp.path().to_path_buf()).expect("Failed to create storage");
        let vectors = VectorIndex::open(
            provider,
            storage.vector_index_path(),
            storage.vector_ids_path(),
        )
        .expect("Failed to open vector index");

        Self {
            temp,
            storage,
            vectors,
        }
    }

    /// Store and index each text in order; returns the candidate ids
    pub fn add_all(&mut self, texts: &[&str]) -> Vec<String> {
        texts
            .iter()
            .map(|text| {
                let id = content_hash(text);
                self.vectors.add(&id, text).expect("Failed to index vector");
                self.storage
                    .database
                    .insert_candidate(&Candidate::new(id.clone(), "", *text))
                    .expect("Failed to insert candidate");
                id
            })
            .collect()
    }
}

/// Embeds texts by exact lookup; unknown texts are rejected
pub struct LookupEmbedder {
    pub table: Vec<(String, Vec<f32>)>,
    pub dimension: usize,
}

impl EmbeddingProvider for LookupEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.table
            .iter()
            .find(|(t, _)| t == text)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| EmbeddingError::InvalidInput(format!("no vector for '{}'", text)))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "lookup"
    }
}
