//! Re-ranking stage: LLM, local cross-encoder, or pass-through

use fastembed::{RerankInitOptions, RerankerModel, TextRerank};
use std::sync::Arc;
use tracing::debug;

use super::Corpus;
use crate::embedding::EmbeddingError;
use crate::error::{Result, SiftError};
use crate::llm::{ChatBackend, LlmOutcome, LlmReranker, PromptKind, PromptLibrary};

/// Reorders the gated candidate ids for a query.
///
/// Implementations never fail outright: on error they return
/// `LlmOutcome::Fallback` carrying the input order.
pub trait Reranker: Send + Sync {
    fn name(&self) -> &'static str;

    fn rerank(&self, query: &str, candidate_ids: &[String], corpus: &Corpus)
        -> LlmOutcome<Vec<String>>;
}

/// Keeps the vector-similarity order
pub struct PassthroughReranker;

impl Reranker for PassthroughReranker {
    fn name(&self) -> &'static str {
        "none"
    }

    fn rerank(&self, _query: &str, candidate_ids: &[String], _corpus: &Corpus) -> LlmOutcome<Vec<String>> {
        LlmOutcome::Parsed(candidate_ids.to_vec())
    }
}

/// Local cross-encoder scoring each (query, resume text) pair
pub struct CrossEncoderReranker {
    model: Arc<TextRerank>,
}

impl CrossEncoderReranker {
    /// BGE reranker base; downloaded on first use
    pub fn with_default_model() -> std::result::Result<Self, EmbeddingError> {
        tracing::info!("Loading cross-encoder reranker (BGE reranker base)");

        let init_options =
            RerankInitOptions::new(RerankerModel::BGERerankerBase).with_show_download_progress(true);
        let model = TextRerank::try_new(init_options)
            .map_err(|e| EmbeddingError::InitializationError(e.to_string()))?;

        Ok(Self {
            model: Arc::new(model),
        })
    }
}

impl Reranker for CrossEncoderReranker {
    fn name(&self) -> &'static str {
        "cross-encoder"
    }

    fn rerank(&self, query: &str, candidate_ids: &[String], corpus: &Corpus) -> LlmOutcome<Vec<String>> {
        if candidate_ids.len() < 2 {
            return LlmOutcome::Parsed(candidate_ids.to_vec());
        }

        let documents: Vec<&str> = candidate_ids
            .iter()
            .map(|id| corpus.text_of(id).unwrap_or(""))
            .collect();

        match self.model.rerank(query, documents, false, None) {
            Ok(mut results) => {
                results.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.index.cmp(&b.index)));
                debug!("Cross-encoder scored {} candidates", results.len());
                LlmOutcome::Parsed(
                    results
                        .into_iter()
                        .filter_map(|r| candidate_ids.get(r.index).cloned())
                        .collect(),
                )
            }
            Err(e) => LlmOutcome::fallback(candidate_ids.to_vec(), format!("cross-encoder failed: {}", e)),
        }
    }
}

/// Build the re-ranker named by `retrieval.reranker`
pub fn create_reranker(
    kind: &str,
    backend: Arc<dyn ChatBackend>,
    prompts: &PromptLibrary,
) -> Result<Box<dyn Reranker>> {
    match kind {
        "llm" => Ok(Box::new(LlmReranker::new(
            backend,
            prompts.get(PromptKind::RerankResults),
        ))),
        "cross-encoder" => Ok(Box::new(CrossEncoderReranker::with_default_model()?)),
        "none" => Ok(Box::new(PassthroughReranker)),
        other => Err(SiftError::InvalidConfigValue {
            path: "retrieval.reranker".to_string(),
            message: format!("unknown reranker '{}'", other),
        }),
    }
}
