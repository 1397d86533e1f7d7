//! TF-IDF vector space model with cosine similarity
//!
//! Weights are raw term counts times a smoothed IDF,
//! `ln((1 + n) / (1 + df)) + 1`, and every vector is L2-normalized, so the
//! cosine between a query and a document reduces to a sparse dot product.

use ahash::{HashMap, HashMapExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::tokenize::word_tokens;
use super::LexicalScorer;

/// Sparse vector: (column, weight) pairs sorted by column
pub type SparseVector = Vec<(usize, f64)>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfModel {
    /// term -> column; columns follow lexical term order
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    doc_vectors: Vec<SparseVector>,
}

impl TfidfModel {
    /// Fit the vocabulary and IDF weights, and vectorize every document
    pub fn fit(documents: &[String]) -> Self {
        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| word_tokens(d)).collect();

        let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
        for tokens in &tokenized {
            let mut seen: Vec<&str> = tokens.iter().map(String::as_str).collect();
            seen.sort_unstable();
            seen.dedup();
            for term in seen {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let n = documents.len() as f64;
        let mut vocabulary = HashMap::with_capacity(document_frequency.len());
        let mut idf = Vec::with_capacity(document_frequency.len());
        for (column, (term, df)) in document_frequency.into_iter().enumerate() {
            vocabulary.insert(term.to_string(), column);
            idf.push(((1.0 + n) / (1.0 + df as f64)).ln() + 1.0);
        }

        let mut model = Self {
            vocabulary,
            idf,
            doc_vectors: Vec::new(),
        };
        let doc_vectors = tokenized
            .iter()
            .map(|tokens| model.vectorize(tokens))
            .collect();
        model.doc_vectors = doc_vectors;
        model
    }

    /// Project text into the fitted space. Out-of-vocabulary terms are ignored.
    pub fn transform(&self, text: &str) -> SparseVector {
        self.vectorize(&word_tokens(text))
    }

    /// Cosine similarity of `text` against every document, in corpus order
    pub fn cosine_scores(&self, text: &str) -> Vec<f64> {
        let query: HashMap<usize, f64> = self.transform(text).into_iter().collect();
        if query.is_empty() {
            return vec![0.0; self.doc_vectors.len()];
        }

        self.doc_vectors
            .iter()
            .map(|doc| {
                doc.iter()
                    .filter_map(|(column, weight)| query.get(column).map(|q| q * weight))
                    .sum()
            })
            .collect()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    fn vectorize(&self, tokens: &[String]) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for token in tokens {
            if let Some(&column) = self.vocabulary.get(token) {
                *counts.entry(column).or_insert(0.0) += 1.0;
            }
        }

        let mut vector: SparseVector = counts
            .into_iter()
            .map(|(column, tf)| (column, tf * self.idf[column]))
            .collect();

        let norm = vector.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in vector.iter_mut() {
                *w /= norm;
            }
        }
        vector
    }
}

impl LexicalScorer for TfidfModel {
    fn name(&self) -> &'static str {
        "tfidf"
    }

    fn doc_count(&self) -> usize {
        self.doc_vectors.len()
    }

    fn score(&self, query: &str) -> Vec<f64> {
        self.cosine_scores(query)
    }
}
