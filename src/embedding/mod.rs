//! Dense embeddings and the nearest-neighbor candidate index
//!
//! - [`EmbeddingProvider`] is the "text in, fixed-dimension vector out" capability
//! - [`FastEmbedProvider`] runs a local sentence model (all-MiniLM-L6-v2, 384-dim)
//! - [`HashEmbedder`] is the deterministic offline fallback
//! - [`VectorIndex`] is the persisted exact L2 index
mod hash;
mod provider;
mod vector_index;

pub use hash::HashEmbedder;
pub use provider::{EmbeddingError, EmbeddingProvider, FastEmbedProvider};
pub use vector_index::{VectorIndex, VectorIndexError};

use crate::config::EmbeddingConfig;
use crate::error::{Result, SiftError};
use std::sync::Arc;

/// Model name that selects [`HashEmbedder`]
pub const HASH_MODEL: &str = "hash";

/// Build the provider named by `config.model`
pub fn create_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    if config.model == HASH_MODEL {
        return Ok(Arc::new(HashEmbedder::new(config.dimension)));
    }

    let provider = FastEmbedProvider::new(&config.model)?;
    if provider.dimension() != config.dimension {
        return Err(SiftError::InvalidConfigValue {
            path: "embedding.dimension".to_string(),
            message: format!(
                "{} produces {}-dimensional vectors, config says {}",
                config.model,
                provider.dimension(),
                config.dimension
            ),
        });
    }
    Ok(Arc::new(provider))
}
