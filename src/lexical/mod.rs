//! Lexical ranking: BM25 and TF-IDF cosine over the candidate corpus
//!
//! Both models are derived from a positional corpus snapshot and cached
//! together by [`LexicalIndexStore`]. [`filter`] turns either model's scores
//! into the set of top-percentage document positions.

mod bm25;
pub mod filter;
mod store;
mod tfidf;
pub mod tokenize;

pub use bm25::Bm25Model;
pub use filter::filter;
pub use store::{LexicalIndexStore, LexicalSnapshot};
pub use tfidf::{SparseVector, TfidfModel};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LexicalError {
    #[error("Lexical snapshot serialization failed: {0}")]
    Serialization(String),

    #[error("Lexical snapshot is corrupt: {0}")]
    Corrupt(String),
}

/// A lexical model that scores every document of its snapshot
pub trait LexicalScorer {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Number of documents the model was fitted on
    fn doc_count(&self) -> usize;

    /// One score per document, in corpus order (higher is more relevant)
    fn score(&self, query: &str) -> Vec<f64>;
}
