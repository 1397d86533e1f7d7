//! Hybrid retrieval: lexical union gating dense vector search
//!
//! ```text
//! corpus ─► BM25 top %  ─┐
//!        └► TF-IDF top % ─┴─ union ─┐
//! query  ─► vector top N ──────────── ∩ (vector order) ─► re-rank ─► limit
//! ```
//!
//! The lexical filters only gate; ranking comes from the vector search and
//! then the re-ranker.

use ahash::{HashMap, HashMapExt, HashSet};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use super::{dedup_ids, sanitize_ranking, Reranker};
use crate::embedding::VectorIndex;
use crate::error::{Result, SiftError};
use crate::lexical::{filter, LexicalIndexStore};
use crate::llm::LlmOutcome;

/// Positional snapshot of every stored candidate
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    ids: Vec<String>,
    texts: Vec<String>,
    positions: HashMap<String, usize>,
}

impl Corpus {
    /// Build from `(id, text)` pairs in store order
    pub fn new(records: Vec<(String, String)>) -> Self {
        let mut ids = Vec::with_capacity(records.len());
        let mut texts = Vec::with_capacity(records.len());
        let mut positions = HashMap::with_capacity(records.len());

        for (position, (id, text)) in records.into_iter().enumerate() {
            positions.entry(id.clone()).or_insert(position);
            ids.push(id);
            texts.push(text);
        }

        Self {
            ids,
            texts,
            positions,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    pub fn text_of(&self, id: &str) -> Option<&str> {
        self.positions.get(id).map(|&p| self.texts[p].as_str())
    }
}

/// Parameters of one retrieval
#[derive(Debug, Clone)]
pub struct RetrievalRequest {
    /// Text used for lexical filtering and vector search
    pub search_text: String,
    /// Text handed to the re-ranker
    pub rerank_text: String,
    pub top_n_vector: usize,
    pub top_percentage: f64,
    pub result_limit: usize,
}

impl RetrievalRequest {
    /// Same text for searching and re-ranking
    pub fn new(query: impl Into<String>, top_n_vector: usize, top_percentage: f64, result_limit: usize) -> Self {
        let query = query.into();
        Self {
            search_text: query.clone(),
            rerank_text: query,
            top_n_vector,
            top_percentage,
            result_limit,
        }
    }
}

/// Every intermediate set of a retrieval, plus the final ids
#[derive(Debug, Clone, Default)]
pub struct RetrievalOutcome {
    pub sparse: BTreeSet<usize>,
    pub cosine: BTreeSet<usize>,
    pub lexical_union: BTreeSet<usize>,
    /// Vector search hits, nearest first
    pub vector_hits: Vec<String>,
    /// Vector hits that are in the lexical union, nearest first
    pub gated: Vec<String>,
    /// `None` when nothing reached the re-ranker
    pub reranked: Option<LlmOutcome<Vec<String>>>,
    /// Final ordered ids, at most `result_limit`
    pub results: Vec<String>,
}

pub struct HybridRetriever<'a> {
    lexical: &'a mut LexicalIndexStore,
    vectors: &'a VectorIndex,
    reranker: &'a dyn Reranker,
}

impl<'a> HybridRetriever<'a> {
    pub fn new(
        lexical: &'a mut LexicalIndexStore,
        vectors: &'a VectorIndex,
        reranker: &'a dyn Reranker,
    ) -> Self {
        Self {
            lexical,
            vectors,
            reranker,
        }
    }

    /// Run the full retrieval for `request` over `corpus`.
    ///
    /// An empty gated set is a normal outcome: `results` is empty and the
    /// re-ranker is not called.
    pub fn retrieve(&mut self, corpus: &Corpus, request: &RetrievalRequest) -> Result<RetrievalOutcome> {
        let mut outcome = RetrievalOutcome::default();
        if corpus.is_empty() {
            info!("Candidate store is empty; nothing to retrieve");
            return Ok(outcome);
        }

        let snapshot = self.lexical.get_or_build(corpus.texts())?;
        let total = corpus.len();

        outcome.sparse = filter(&request.search_text, &snapshot.bm25, total, request.top_percentage);
        outcome.cosine = filter(&request.search_text, &snapshot.tfidf, total, request.top_percentage);
        outcome.lexical_union = outcome.sparse.union(&outcome.cosine).copied().collect();
        debug!(
            "Lexical union: {} documents ({} bm25, {} tfidf)",
            outcome.lexical_union.len(),
            outcome.sparse.len(),
            outcome.cosine.len()
        );

        // A query the model cannot embed gates everything out instead of failing
        outcome.vector_hits = match self.vectors.search(&request.search_text, request.top_n_vector) {
            Ok(hits) => hits,
            Err(SiftError::Embedding(e)) => {
                warn!("Vector search skipped, query could not be embedded: {}", e);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let allowed: HashSet<&str> = outcome
            .lexical_union
            .iter()
            .filter_map(|&p| corpus.ids().get(p))
            .map(String::as_str)
            .collect();
        outcome.gated = dedup_ids(
            outcome
                .vector_hits
                .iter()
                .filter(|id| allowed.contains(id.as_str()))
                .cloned()
                .collect(),
        );
        info!(
            "{} of {} vector hits passed the lexical gate",
            outcome.gated.len(),
            outcome.vector_hits.len()
        );

        if outcome.gated.is_empty() {
            return Ok(outcome);
        }

        let reranked = self
            .reranker
            .rerank(&request.rerank_text, &outcome.gated, corpus);
        let mut results = sanitize_ranking(reranked.value().clone(), &outcome.gated);
        results.truncate(request.result_limit);

        debug!("{} re-ranked results: {:?}", self.reranker.name(), results);
        outcome.reranked = Some(reranked);
        outcome.results = results;
        Ok(outcome)
    }
}
