//! End-to-end query flow
//!
//! expand (LLM) → load corpus → hybrid retrieve + re-rank → fetch candidates
//! → summarize (bounded pool) → [`QueryReport`]
//!
//! Collaborator failures never abort a query: they degrade to the raw query,
//! the vector order, or the placeholder summary.

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{expand_path, Config, RetrievalConfig};
use crate::embedding::{create_provider, VectorIndex};
use crate::error::Result;
use crate::lexical::LexicalIndexStore;
use crate::llm::{
    create_backend, LlmQueryExpander, LlmSummarizer, PromptKind, PromptLibrary, QueryExpander,
};
use crate::report::{QueryReport, RankedCandidate};
use crate::retrieval::{
    create_reranker, Corpus, HybridRetriever, Reranker, RetrievalOutcome, RetrievalRequest,
    SummaryPool,
};
use crate::storage::StorageManager;

/// Per-query overrides of the configured retrieval parameters
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Result count; defaults to the expansion's desired count
    pub limit: Option<usize>,
    pub top_n_vector: Option<usize>,
    pub top_percentage: Option<f64>,
    pub summarize: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            limit: None,
            top_n_vector: None,
            top_percentage: None,
            summarize: true,
        }
    }
}

pub struct QueryPipeline {
    storage: StorageManager,
    lexical: LexicalIndexStore,
    vectors: VectorIndex,
    expander: Box<dyn QueryExpander>,
    reranker: Box<dyn Reranker>,
    summaries: Option<SummaryPool>,
    retrieval: RetrievalConfig,
    last_outcome: Option<RetrievalOutcome>,
}

impl QueryPipeline {
    pub fn new(
        storage: StorageManager,
        vectors: VectorIndex,
        expander: Box<dyn QueryExpander>,
        reranker: Box<dyn Reranker>,
        summaries: Option<SummaryPool>,
        retrieval: RetrievalConfig,
    ) -> Self {
        let lexical = LexicalIndexStore::new(storage.lexical_snapshot_path());
        Self {
            storage,
            lexical,
            vectors,
            expander,
            reranker,
            summaries,
            retrieval,
            last_outcome: None,
        }
    }

    /// Wire every stage from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let storage = StorageManager::new(config.data_dir()?)?;
        let provider = create_provider(&config.embedding)?;
        let vectors = VectorIndex::open(
            provider,
            storage.vector_index_path(),
            storage.vector_ids_path(),
        )?;

        let prompts_dir = config
            .llm
            .prompts_dir
            .as_deref()
            .map(expand_path)
            .transpose()?;
        let prompts = PromptLibrary::new(prompts_dir);
        let backend = create_backend(&config.llm)?;

        let expander = Box::new(LlmQueryExpander::new(
            backend.clone(),
            prompts.get(PromptKind::ExpandQuery),
        ));
        let reranker = create_reranker(&config.retrieval.reranker, backend.clone(), &prompts)?;
        let summaries = config.summary.enabled.then(|| {
            let summarizer = LlmSummarizer::new(
                backend,
                prompts.get(PromptKind::GenerateSummary),
                config.summary.placeholder.clone(),
            );
            SummaryPool::new(Arc::new(summarizer), config.summary.max_workers)
        });

        Ok(Self::new(
            storage,
            vectors,
            expander,
            reranker,
            summaries,
            config.retrieval.clone(),
        ))
    }

    /// Answer `query` with a ranked, summarized candidate list
    pub fn run(&mut self, query: &str, options: &QueryOptions) -> Result<QueryReport> {
        info!("Processing query: {}", query);

        let expansion = self.expander.expand(query);
        let expansion_fallback = expansion.is_fallback();
        let expansion = expansion.into_value();

        let result_limit = options.limit.unwrap_or(if expansion_fallback {
            self.retrieval.default_result_limit
        } else {
            expansion.desired_count
        });

        let corpus = Corpus::new(self.storage.database.get_all_candidates()?);
        let request = RetrievalRequest {
            search_text: expansion.expanded_query.clone(),
            rerank_text: query.to_string(),
            top_n_vector: options.top_n_vector.unwrap_or(self.retrieval.top_n_vector),
            top_percentage: options.top_percentage.unwrap_or(self.retrieval.top_percentage),
            result_limit,
        };

        let outcome = HybridRetriever::new(&mut self.lexical, &self.vectors, self.reranker.as_ref())
            .retrieve(&corpus, &request)?;

        let mut candidates = Vec::with_capacity(outcome.results.len());
        for id in &outcome.results {
            match self.storage.database.get_candidate(id)? {
                Some(candidate) => candidates.push(candidate),
                None => warn!("Ranked candidate {} is missing from the store, skipping", id),
            }
        }

        let summaries: Vec<String> = match (&self.summaries, options.summarize) {
            (Some(pool), true) if !candidates.is_empty() => pool
                .summarize_blocking(candidates.iter().map(|c| c.text.clone()).collect(), query)?
                .into_iter()
                .map(|s| s.into_value())
                .collect(),
            _ => vec![String::new(); candidates.len()],
        };

        let mut report = QueryReport::new(query, expansion.expanded_query);
        report.expansion_fallback = expansion_fallback;
        report.result_limit = result_limit;
        report.candidates = candidates
            .into_iter()
            .zip(summaries)
            .enumerate()
            .map(|(i, (candidate, summary))| RankedCandidate {
                rank: i + 1,
                id: candidate.id,
                name: candidate.name,
                resume_text: candidate.text,
                summary,
            })
            .collect();

        info!("Query returned {} candidates", report.candidates.len());
        self.last_outcome = Some(outcome);
        Ok(report)
    }

    /// Intermediate sets of the most recent [`run`](Self::run)
    pub fn last_outcome(&self) -> Option<&RetrievalOutcome> {
        self.last_outcome.as_ref()
    }
}
