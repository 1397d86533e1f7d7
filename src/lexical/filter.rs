//! Top-percentage lexical filtering
//!
//! Selection is `k = max(1, floor(total_docs * top_percentage))`, clamped to
//! the number of scored documents. Ranking is a stable sort on descending
//! score, so equal scores keep corpus order and the lower position wins at the
//! cut-off.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::{debug, warn};

use super::LexicalScorer;

/// Number of documents kept for a corpus of `total_docs`
pub fn top_k(total_docs: usize, top_percentage: f64) -> usize {
    if total_docs == 0 {
        return 0;
    }
    let k = (total_docs as f64 * top_percentage).floor() as usize;
    k.clamp(1, total_docs)
}

/// Positions of the `k` highest scores, best first
pub fn rank_top(scores: &[f64], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    // NaN never outranks a real score
    order.sort_by(|&a, &b| match (scores[a].is_nan(), scores[b].is_nan()) {
        (false, false) => scores[b].partial_cmp(&scores[a]).unwrap_or(Ordering::Equal),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => Ordering::Equal,
    });
    order.truncate(k);
    order
}

/// Score every document with `model` and keep the top percentage
pub fn filter(
    query: &str,
    model: &dyn LexicalScorer,
    total_docs: usize,
    top_percentage: f64,
) -> BTreeSet<usize> {
    if model.doc_count() != total_docs {
        warn!(
            "{} model was fitted on {} documents but the corpus has {}",
            model.name(),
            model.doc_count(),
            total_docs
        );
    }

    let scores = model.score(query);
    let k = top_k(total_docs, top_percentage).min(scores.len());
    let selected = rank_top(&scores, k);

    debug!(
        "{} filtering selected {} of {} documents: {:?}",
        model.name(),
        selected.len(),
        total_docs,
        selected
    );

    selected.into_iter().collect()
}
