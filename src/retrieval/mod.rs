//! Hybrid retrieval, re-ranking and summarization
//!
//! Lexical filters (BM25 and TF-IDF) gate the dense vector search; the gated
//! list is re-ranked and cut to the requested size, and the survivors are
//! summarized in a bounded worker pool.

mod deduplication;
mod hybrid;
mod reranker;
mod summary;

pub use deduplication::{dedup_ids, sanitize_ranking};
pub use hybrid::{Corpus, HybridRetriever, RetrievalOutcome, RetrievalRequest};
pub use reranker::{create_reranker, CrossEncoderReranker, PassthroughReranker, Reranker};
pub use summary::SummaryPool;
