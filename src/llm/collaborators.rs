//! Query expansion, re-ranking and summarization backed by a [`ChatBackend`]
//!
//! Each collaborator checks the returned JSON against a narrow schema and
//! falls back to a fixed value when the call fails or the shape is wrong.

use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::{ChatBackend, LlmOutcome};
use crate::retrieval::{sanitize_ranking, Corpus, Reranker};

/// Result count used when expansion does not yield one
pub const DEFAULT_DESIRED_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryExpansion {
    pub expanded_query: String,
    pub desired_count: usize,
}

impl QueryExpansion {
    /// Fallback expansion: the query itself and the default count
    pub fn unexpanded(query: &str) -> Self {
        Self {
            expanded_query: query.to_string(),
            desired_count: DEFAULT_DESIRED_COUNT,
        }
    }
}

pub trait QueryExpander: Send + Sync {
    fn expand(&self, query: &str) -> LlmOutcome<QueryExpansion>;
}

pub trait Summarizer: Send + Sync {
    fn summarize(&self, resume_text: &str, query: &str) -> LlmOutcome<String>;

    /// Text used when no summary can be produced
    fn placeholder(&self) -> &str;
}

pub struct LlmQueryExpander {
    backend: Arc<dyn ChatBackend>,
    prompt: String,
}

impl LlmQueryExpander {
    pub fn new(backend: Arc<dyn ChatBackend>, prompt: String) -> Self {
        Self { backend, prompt }
    }
}

/// `{"expanded_query": str, "total_resume": int}`; one key is enough
fn parse_expansion(value: &Value, query: &str) -> Option<QueryExpansion> {
    let expanded = value.get("expanded_query");
    let count = value.get("total_resume");
    if expanded.is_none() && count.is_none() {
        return None;
    }

    let expanded_query = expanded
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .unwrap_or(query)
        .to_string();

    let desired_count = count
        .and_then(|c| {
            c.as_u64()
                .or_else(|| c.as_str().and_then(|s| s.trim().parse().ok()))
        })
        .filter(|n| *n > 0)
        .map(|n| n as usize)
        .unwrap_or(DEFAULT_DESIRED_COUNT);

    Some(QueryExpansion {
        expanded_query,
        desired_count,
    })
}

impl QueryExpander for LlmQueryExpander {
    fn expand(&self, query: &str) -> LlmOutcome<QueryExpansion> {
        let value = match self.backend.complete_json(&self.prompt, query) {
            Ok(value) => value,
            Err(e) => {
                return LlmOutcome::fallback(
                    QueryExpansion::unexpanded(query),
                    format!("query expansion failed: {}", e),
                )
            }
        };

        match parse_expansion(&value, query) {
            Some(expansion) => {
                debug!(
                    "Expanded query to '{}' ({} results)",
                    expansion.expanded_query, expansion.desired_count
                );
                LlmOutcome::Parsed(expansion)
            }
            None => LlmOutcome::fallback(
                QueryExpansion::unexpanded(query),
                "query expansion response has neither expanded_query nor total_resume",
            ),
        }
    }
}

/// Asks the model to order the ids; the prompt names the query and ids
pub struct LlmReranker {
    backend: Arc<dyn ChatBackend>,
    template: String,
}

impl LlmReranker {
    pub fn new(backend: Arc<dyn ChatBackend>, template: String) -> Self {
        Self { backend, template }
    }
}

/// `{"ranked_ids": [..]}` or `{"content": [..]}` of strings
fn parse_ranking(value: &Value) -> Option<Vec<String>> {
    let list = value
        .get("ranked_ids")
        .or_else(|| value.get("content"))?
        .as_array()?;

    list.iter()
        .map(|item| item.as_str().map(|s| s.trim().to_string()))
        .collect()
}

impl Reranker for LlmReranker {
    fn name(&self) -> &'static str {
        "llm"
    }

    fn rerank(&self, query: &str, candidate_ids: &[String], _corpus: &Corpus) -> LlmOutcome<Vec<String>> {
        let prompt = self
            .template
            .replace("{query}", query)
            .replace("{resume_ids}", &candidate_ids.join(", "));

        let value = match self.backend.complete_json(&prompt, query) {
            Ok(value) => value,
            Err(e) => {
                return LlmOutcome::fallback(candidate_ids.to_vec(), format!("re-ranking failed: {}", e))
            }
        };

        let ranked = match parse_ranking(&value) {
            Some(ranked) => sanitize_ranking(ranked, candidate_ids),
            None => {
                return LlmOutcome::fallback(
                    candidate_ids.to_vec(),
                    "re-ranking response is not a list of ids",
                )
            }
        };

        if ranked.is_empty() && !candidate_ids.is_empty() {
            return LlmOutcome::fallback(
                candidate_ids.to_vec(),
                "re-ranking response named none of the candidates",
            );
        }

        LlmOutcome::Parsed(ranked)
    }
}

pub struct LlmSummarizer {
    backend: Arc<dyn ChatBackend>,
    prompt: String,
    placeholder: String,
}

impl LlmSummarizer {
    pub fn new(backend: Arc<dyn ChatBackend>, prompt: String, placeholder: impl Into<String>) -> Self {
        Self {
            backend,
            prompt,
            placeholder: placeholder.into(),
        }
    }
}

/// First of `ranked_candidates[0].summary`, `summary`, `content` that is a string
fn parse_summary(value: &Value) -> Option<String> {
    let ranked = value
        .get("ranked_candidates")
        .and_then(Value::as_array)
        .and_then(|list| list.first())
        .and_then(|first| first.get("summary"));

    [ranked, value.get("summary"), value.get("content")]
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl Summarizer for LlmSummarizer {
    fn summarize(&self, resume_text: &str, query: &str) -> LlmOutcome<String> {
        let content = format!("Resume:\n{}\n\nRecruiter Query:\n{}", resume_text, query);

        match self.backend.complete_json(&self.prompt, &content) {
            Ok(value) => match parse_summary(&value) {
                Some(summary) => LlmOutcome::Parsed(summary),
                None => LlmOutcome::fallback(
                    self.placeholder.clone(),
                    "summary response has no summary text",
                ),
            },
            Err(e) => LlmOutcome::fallback(self.placeholder.clone(), format!("summary failed: {}", e)),
        }
    }

    fn placeholder(&self) -> &str {
        &self.placeholder
    }
}
