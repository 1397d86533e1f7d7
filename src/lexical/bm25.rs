//! Okapi BM25 over whitespace-tokenized documents

use ahash::{HashMap, HashMapExt};
use serde::{Deserialize, Serialize};

use super::tokenize::whitespace_tokens;
use super::LexicalScorer;

/// Term-frequency saturation
pub const DEFAULT_K1: f64 = 1.5;
/// Length normalization
pub const DEFAULT_B: f64 = 0.75;
/// Floor for negative IDFs, as a fraction of the average IDF
pub const DEFAULT_EPSILON: f64 = 0.25;

/// Sparse term-frequency model fitted to a corpus snapshot
///
/// Terms that occur in more than half the corpus get a negative raw IDF;
/// those are replaced by `epsilon * average_idf`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bm25Model {
    k1: f64,
    b: f64,
    avgdl: f64,
    doc_len: Vec<usize>,
    doc_freqs: Vec<HashMap<String, u32>>,
    idf: HashMap<String, f64>,
}

impl Bm25Model {
    /// Fit over raw document strings (tokenized on whitespace)
    pub fn fit(documents: &[String]) -> Self {
        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| whitespace_tokens(d)).collect();
        Self::fit_tokens(&tokenized, DEFAULT_K1, DEFAULT_B, DEFAULT_EPSILON)
    }

    /// Fit over pre-tokenized documents with explicit parameters
    pub fn fit_tokens(corpus: &[Vec<String>], k1: f64, b: f64, epsilon: f64) -> Self {
        let mut doc_len = Vec::with_capacity(corpus.len());
        let mut doc_freqs = Vec::with_capacity(corpus.len());
        let mut containing: HashMap<String, u32> = HashMap::new();
        let mut total_len = 0usize;

        for document in corpus {
            doc_len.push(document.len());
            total_len += document.len();

            let mut frequencies: HashMap<String, u32> = HashMap::new();
            for token in document {
                *frequencies.entry(token.clone()).or_insert(0) += 1;
            }
            for term in frequencies.keys() {
                *containing.entry(term.clone()).or_insert(0) += 1;
            }
            doc_freqs.push(frequencies);
        }

        let corpus_size = corpus.len() as f64;
        let avgdl = if corpus.is_empty() {
            0.0
        } else {
            total_len as f64 / corpus_size
        };

        let mut idf: HashMap<String, f64> = HashMap::with_capacity(containing.len());
        let mut idf_sum = 0.0;
        let mut negative = Vec::new();
        for (term, n) in containing {
            let n = n as f64;
            let value = (corpus_size - n + 0.5).ln() - (n + 0.5).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(term.clone());
            }
            idf.insert(term, value);
        }

        if !idf.is_empty() {
            let eps = epsilon * (idf_sum / idf.len() as f64);
            for term in negative {
                idf.insert(term, eps);
            }
        }

        Self {
            k1,
            b,
            avgdl,
            doc_len,
            doc_freqs,
            idf,
        }
    }

    /// Score every document against already-tokenized query terms
    pub fn scores_for_tokens(&self, query: &[String]) -> Vec<f64> {
        let mut scores = vec![0.0; self.doc_len.len()];

        for term in query {
            let idf = self.idf.get(term).copied().unwrap_or(0.0);
            if idf == 0.0 {
                continue;
            }

            for (i, frequencies) in self.doc_freqs.iter().enumerate() {
                let tf = frequencies.get(term).copied().unwrap_or(0) as f64;
                if tf == 0.0 {
                    continue;
                }
                let length_ratio = if self.avgdl > 0.0 {
                    self.doc_len[i] as f64 / self.avgdl
                } else {
                    0.0
                };
                let denom = tf + self.k1 * (1.0 - self.b + self.b * length_ratio);
                scores[i] += idf * (tf * (self.k1 + 1.0) / denom);
            }
        }

        scores
    }

    /// IDF of a term, 0.0 when unseen
    pub fn idf(&self, term: &str) -> f64 {
        self.idf.get(term).copied().unwrap_or(0.0)
    }
}

impl LexicalScorer for Bm25Model {
    fn name(&self) -> &'static str {
        "bm25"
    }

    fn doc_count(&self) -> usize {
        self.doc_len.len()
    }

    fn score(&self, query: &str) -> Vec<f64> {
        self.scores_for_tokens(&whitespace_tokens(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus(docs: &[&str]) -> Vec<String> {
        docs.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn test_rare_term_scores_only_matching_doc() {
        let model = Bm25Model::fit(&corpus(&[
            "rust systems engineer",
            "python data scientist",
            "java backend engineer",
            "go platform engineer",
        ]));

        let scores = model.score("rust");
        assert!(scores[0] > 0.0);
        assert_eq!(&scores[1..], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_idf_formula() {
        let model = Bm25Model::fit(&corpus(&["a b", "a c", "d e", "f g"]));
        // n=2 of N=4: ln(2.5) - ln(2.5) = 0
        assert_eq!(model.idf("a"), 0.0);
        // n=1 of N=4: ln(3.5) - ln(1.5)
        let expected = 3.5f64.ln() - 1.5f64.ln();
        assert!((model.idf("b") - expected).abs() < 1e-12);
    }

    #[test]
    fn test_negative_idf_clamped_to_epsilon() {
        let model = Bm25Model::fit(&corpus(&["common x", "common y", "common z"]));
        // "common" has raw idf ln(0.5) - ln(3.5) < 0 and is replaced by eps
        let idf_common = model.idf("common");
        let raw_rare = 2.5f64.ln() - 1.5f64.ln();
        let raw_common = 0.5f64.ln() - 3.5f64.ln();
        let average = (3.0 * raw_rare + raw_common) / 4.0;
        assert!((idf_common - DEFAULT_EPSILON * average).abs() < 1e-12);
        assert!(model.idf("x") > 0.0);
    }

    #[test]
    fn test_length_normalization_prefers_shorter_doc() {
        let model = Bm25Model::fit(&corpus(&[
            "kubernetes",
            "kubernetes plus many other unrelated words here",
            "nothing",
            "else",
            "misc",
        ]));
        let scores = model.score("kubernetes");
        assert!(scores[0] > scores[1]);
    }

    #[test]
    fn test_case_sensitive_tokens() {
        let model = Bm25Model::fit(&corpus(&["Java developer", "cobol", "fortran"]));
        assert!(model.score("Java")[0] > 0.0);
        assert_eq!(model.score("java")[0], 0.0);
    }

    #[test]
    fn test_empty_corpus() {
        let model = Bm25Model::fit(&[]);
        assert_eq!(model.doc_count(), 0);
        assert!(model.score("anything").is_empty());
    }
}
