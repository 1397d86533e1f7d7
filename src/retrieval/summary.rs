//! Bounded worker pool for per-candidate summaries
//!
//! Summaries are independent, so they run concurrently under a semaphore of
//! `max_workers` permits. Results come back in request order regardless of
//! completion order.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::{Result, SiftError};
use crate::llm::{LlmOutcome, Summarizer};

pub struct SummaryPool {
    summarizer: Arc<dyn Summarizer>,
    max_workers: usize,
}

impl SummaryPool {
    pub fn new(summarizer: Arc<dyn Summarizer>, max_workers: usize) -> Self {
        Self {
            summarizer,
            max_workers: max_workers.max(1),
        }
    }

    /// Summarize every resume text against `query`, in input order
    pub async fn summarize_all(&self, texts: Vec<String>, query: &str) -> Vec<LlmOutcome<String>> {
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut handles = Vec::with_capacity(texts.len());

        for text in texts {
            let semaphore = semaphore.clone();
            let summarizer = self.summarizer.clone();
            let query = query.to_string();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                tokio::task::spawn_blocking(move || summarizer.summarize(&text, &query)).await
            }));
        }

        let mut summaries = Vec::with_capacity(handles.len());
        for (position, handle) in handles.into_iter().enumerate() {
            let summary = match handle.await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) | Err(e) => {
                    warn!("Summary worker {} failed: {}", position, e);
                    LlmOutcome::Fallback {
                        value: self.summarizer.placeholder().to_string(),
                        reason: e.to_string(),
                    }
                }
            };
            summaries.push(summary);
        }

        debug!("Summarized {} candidates", summaries.len());
        summaries
    }

    /// Run [`summarize_all`](Self::summarize_all) on a private runtime
    pub fn summarize_blocking(&self, texts: Vec<String>, query: &str) -> Result<Vec<LlmOutcome<String>>> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| SiftError::Io {
                source: e,
                context: "Failed to start summary runtime".to_string(),
            })?;

        Ok(runtime.block_on(self.summarize_all(texts, query)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Echoes the resume text; sleeps longer for earlier items
    struct Slow {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Summarizer for Slow {
        fn summarize(&self, resume_text: &str, _query: &str) -> LlmOutcome<String> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let delay: u64 = resume_text.len() as u64;
            std::thread::sleep(Duration::from_millis(delay * 5));

            self.active.fetch_sub(1, Ordering::SeqCst);
            if resume_text.starts_with('!') {
                return LlmOutcome::fallback(self.placeholder().to_string(), "bad resume");
            }
            LlmOutcome::Parsed(format!("summary of {}", resume_text))
        }

        fn placeholder(&self) -> &str {
            "No summary available."
        }
    }

    fn slow() -> Arc<Slow> {
        Arc::new(Slow {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_results_in_request_order() {
        let summarizer = slow();
        let pool = SummaryPool::new(summarizer.clone(), 3);

        let texts = vec!["aaaaaaaa".to_string(), "bbbb".to_string(), "c".to_string()];
        let summaries = pool.summarize_all(texts, "q").await;

        let values: Vec<String> = summaries.into_iter().map(LlmOutcome::into_value).collect();
        assert_eq!(values, vec!["summary of aaaaaaaa", "summary of bbbb", "summary of c"]);
    }

    #[tokio::test]
    async fn test_worker_bound_respected() {
        let summarizer = slow();
        let pool = SummaryPool::new(summarizer.clone(), 2);

        let texts: Vec<String> = (0..8).map(|i| format!("resume{}", i)).collect();
        let summaries = pool.summarize_all(texts, "q").await;

        assert_eq!(summaries.len(), 8);
        assert!(summarizer.peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_blocking_wrapper_keeps_fallbacks() {
        let pool = SummaryPool::new(slow(), 5);
        let summaries = pool
            .summarize_blocking(vec!["ok".to_string(), "!broken".to_string()], "q")
            .unwrap();

        assert_eq!(summaries[0], LlmOutcome::Parsed("summary of ok".to_string()));
        assert!(summaries[1].is_fallback());
        assert_eq!(summaries[1].value(), "No summary available.");
    }
}
