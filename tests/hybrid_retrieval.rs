mod common;

use common::{Fixture, LookupEmbedder};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use talentsift::lexical::LexicalIndexStore;
use talentsift::llm::LlmOutcome;
use talentsift::retrieval::{
    Corpus, HybridRetriever, PassthroughReranker, Reranker, RetrievalRequest,
};

/// Counts calls and reverses the offered order
#[derive(Default)]
struct Reversing {
    calls: AtomicUsize,
}

impl Reranker for Reversing {
    fn name(&self) -> &'static str {
        "reversing"
    }

    fn rerank(&self, _query: &str, candidate_ids: &[String], _corpus: &Corpus) -> LlmOutcome<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        LlmOutcome::Parsed(candidate_ids.iter().rev().cloned().collect())
    }
}

/// Returns ids that were never offered, plus repeats
struct Hallucinating;

impl Reranker for Hallucinating {
    fn name(&self) -> &'static str {
        "hallucinating"
    }

    fn rerank(&self, _query: &str, candidate_ids: &[String], _corpus: &Corpus) -> LlmOutcome<Vec<String>> {
        let mut ranked = vec!["not-a-candidate".to_string()];
        ranked.extend(candidate_ids.iter().rev().cloned());
        ranked.push(candidate_ids[0].clone());
        LlmOutcome::Parsed(ranked)
    }
}

fn lookup(entries: &[(&str, [f32; 2])]) -> Arc<LookupEmbedder> {
    Arc::new(LookupEmbedder {
        table: entries
            .iter()
            .map(|(text, v)| (text.to_string(), v.to_vec()))
            .collect(),
        dimension: 2,
    })
}

fn corpus(fixture: &Fixture) -> Corpus {
    Corpus::new(fixture.storage.database.get_all_candidates().unwrap())
}

fn lexical(fixture: &Fixture) -> LexicalIndexStore {
    LexicalIndexStore::new(fixture.storage.lexical_snapshot_path())
}

#[test]
fn test_empty_intersection_returns_nothing() {
    let texts = [
        "java developer",
        "python analyst",
        "rust engineer",
        "golang backend",
        "ruby rails",
    ];
    // The only lexical match is the vector search's farthest entry
    let mut fixture = Fixture::with_provider(lookup(&[
        (texts[0], [1.0, 0.0]),
        (texts[1], [0.0, 1.0]),
        (texts[2], [0.0, 0.9]),
        (texts[3], [0.1, 1.0]),
        (texts[4], [0.0, 1.1]),
        ("java", [0.0, 1.0]),
    ]));
    fixture.add_all(&texts);

    let corpus = corpus(&fixture);
    let mut lexical = lexical(&fixture);
    let reranker = Reversing::default();
    let request = RetrievalRequest::new("java", 4, 0.2, 5);

    let outcome = HybridRetriever::new(&mut lexical, &fixture.vectors, &reranker)
        .retrieve(&corpus, &request)
        .unwrap();

    assert_eq!(outcome.lexical_union.len(), 1);
    assert!(outcome.lexical_union.contains(&0));
    assert_eq!(outcome.vector_hits.len(), 4);
    assert!(outcome.gated.is_empty());
    assert!(outcome.results.is_empty());
    assert!(outcome.reranked.is_none());
    assert_eq!(reranker.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_gated_results_follow_vector_order() {
    let texts = ["java backend", "java frontend", "java mobile"];
    let mut fixture = Fixture::with_provider(lookup(&[
        (texts[0], [0.5, 0.0]),
        (texts[1], [1.0, 0.0]),
        (texts[2], [0.0, 0.0]),
        ("java", [0.0, 0.0]),
    ]));
    let ids = fixture.add_all(&texts);

    let corpus = corpus(&fixture);
    let mut lexical = lexical(&fixture);
    let request = RetrievalRequest::new("java", 3, 1.0, 10);

    let outcome = HybridRetriever::new(&mut lexical, &fixture.vectors, &PassthroughReranker)
        .retrieve(&corpus, &request)
        .unwrap();

    let expected = vec![ids[2].clone(), ids[0].clone(), ids[1].clone()];
    assert_eq!(outcome.gated, expected);
    assert_eq!(outcome.results, expected);
}

#[test]
fn test_result_limit_keeps_rerank_order() {
    let texts = [
        "engineer alpha",
        "engineer bravo",
        "engineer charlie",
        "engineer delta",
        "engineer echo",
        "engineer foxtrot",
        "engineer golf",
    ];
    let mut entries: Vec<(&str, [f32; 2])> = texts
        .iter()
        .enumerate()
        .map(|(i, t)| (*t, [i as f32, 0.0]))
        .collect();
    entries.push(("engineer", [0.0, 0.0]));
    let mut fixture = Fixture::with_provider(lookup(&entries));
    let ids = fixture.add_all(&texts);

    let corpus = corpus(&fixture);
    let mut lexical = lexical(&fixture);
    let reranker = Reversing::default();
    let request = RetrievalRequest::new("engineer", 7, 1.0, 3);

    let outcome = HybridRetriever::new(&mut lexical, &fixture.vectors, &reranker)
        .retrieve(&corpus, &request)
        .unwrap();

    assert_eq!(outcome.gated.len(), 7);
    assert_eq!(outcome.results.len(), 3);
    assert_eq!(outcome.results, vec![ids[6].clone(), ids[5].clone(), ids[4].clone()]);
    assert_eq!(reranker.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_reranked_ids_are_sanitized() {
    let texts = ["java backend", "java frontend"];
    let mut fixture = Fixture::with_provider(lookup(&[
        (texts[0], [0.0, 0.0]),
        (texts[1], [1.0, 0.0]),
        ("java", [0.0, 0.0]),
    ]));
    let ids = fixture.add_all(&texts);

    let corpus = corpus(&fixture);
    let mut lexical = lexical(&fixture);
    let request = RetrievalRequest::new("java", 2, 1.0, 10);

    let outcome = HybridRetriever::new(&mut lexical, &fixture.vectors, &Hallucinating)
        .retrieve(&corpus, &request)
        .unwrap();

    assert_eq!(outcome.results, vec![ids[1].clone(), ids[0].clone()]);
}

#[test]
fn test_java_query_over_deduplicated_corpus() {
    let mut fixture = Fixture::new();
    let ids = fixture.add_all(&["java backend engineer 5 years", "python data scientist 3 years"]);

    let corpus = corpus(&fixture);
    let mut lexical = lexical(&fixture);
    let request = RetrievalRequest::new("java engineer", 10, 0.34, 5);

    let outcome = HybridRetriever::new(&mut lexical, &fixture.vectors, &PassthroughReranker)
        .retrieve(&corpus, &request)
        .unwrap();

    // floor(2 * 0.34) is 0, raised to one document
    assert_eq!(outcome.sparse.len(), 1);
    assert!(outcome.sparse.contains(&0));
    assert_eq!(outcome.vector_hits.len(), 2);
    assert_eq!(outcome.results, vec![ids[0].clone()]);
}

#[test]
fn test_lexical_union_covers_both_filters() {
    let mut fixture = Fixture::new();
    fixture.add_all(&[
        "senior java engineer spring microservices",
        "java java java",
        "data engineer spark scala",
        "frontend engineer react typescript",
        "engineering manager java teams",
        "devops engineer terraform aws",
    ]);

    let corpus = corpus(&fixture);
    let mut lexical = lexical(&fixture);
    let request = RetrievalRequest::new("java engineer", 6, 0.5, 6);

    let outcome = HybridRetriever::new(&mut lexical, &fixture.vectors, &PassthroughReranker)
        .retrieve(&corpus, &request)
        .unwrap();

    assert_eq!(outcome.sparse.len(), 3);
    assert_eq!(outcome.cosine.len(), 3);
    assert!(outcome.lexical_union.len() <= outcome.sparse.len() + outcome.cosine.len());
    assert!(outcome.lexical_union.len() >= outcome.sparse.len().max(outcome.cosine.len()));
    assert!(outcome.sparse.is_subset(&outcome.lexical_union));
    assert!(outcome.cosine.is_subset(&outcome.lexical_union));
    assert!(outcome.gated.iter().all(|id| outcome.vector_hits.contains(id)));
    assert!(outcome.results.iter().all(|id| outcome.gated.contains(id)));
}

#[test]
fn test_unembeddable_query_yields_no_results() {
    let mut fixture = Fixture::new();
    fixture.add_all(&["java engineer", "python engineer"]);

    let corpus = corpus(&fixture);
    let mut lexical = lexical(&fixture);
    let reranker = Reversing::default();
    // The hashing embedder has no tokens to work with here
    let request = RetrievalRequest::new("++", 10, 1.0, 5);

    let outcome = HybridRetriever::new(&mut lexical, &fixture.vectors, &reranker)
        .retrieve(&corpus, &request)
        .unwrap();

    assert!(outcome.vector_hits.is_empty());
    assert!(outcome.results.is_empty());
    assert_eq!(reranker.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_empty_corpus() {
    let fixture = Fixture::new();
    let mut lexical = lexical(&fixture);
    let request = RetrievalRequest::new("anything", 10, 0.1, 5);

    let outcome = HybridRetriever::new(&mut lexical, &fixture.vectors, &PassthroughReranker)
        .retrieve(&Corpus::default(), &request)
        .unwrap();

    assert!(outcome.results.is_empty());
    assert_eq!(lexical.build_count(), 0);
}

#[test]
fn test_lexical_snapshot_reused_across_queries() {
    let mut fixture = Fixture::new();
    fixture.add_all(&["java engineer", "python engineer", "go engineer"]);

    let corpus = corpus(&fixture);
    let mut lexical = lexical(&fixture);

    for query in ["java", "python", "go"] {
        let request = RetrievalRequest::new(query, 3, 0.5, 3);
        HybridRetriever::new(&mut lexical, &fixture.vectors, &PassthroughReranker)
            .retrieve(&corpus, &request)
            .unwrap();
    }

    assert_eq!(lexical.build_count(), 1);
    assert_eq!(lexical.stored_doc_count(), Some(3));
}
