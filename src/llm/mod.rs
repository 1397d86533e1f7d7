//! Language-model capability: "given a prompt and some text, return JSON"
//!
//! Every call site parses the returned JSON against its own schema and has a
//! fallback value. The two paths are kept apart by [`LlmOutcome`] so callers
//! and tests can tell a parsed answer from a fallback.

mod client;
mod collaborators;
mod prompts;

pub use client::OpenAiChatClient;
pub use collaborators::{
    LlmQueryExpander, LlmReranker, LlmSummarizer, QueryExpander, QueryExpansion, Summarizer,
    DEFAULT_DESIRED_COUNT,
};
pub use prompts::{PromptKind, PromptLibrary};

use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::config::LlmConfig;
use crate::error::Result;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM calls are disabled")]
    Disabled,

    #[error("API key environment variable {0} is not set")]
    MissingApiKey(String),

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("LLM request failed: {0}")]
    Request(String),

    #[error("LLM returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected LLM response: {0}")]
    Response(String),
}

/// Chat-completion backend returning a JSON object
pub trait ChatBackend: Send + Sync {
    fn complete_json(&self, prompt: &str, content: &str) -> std::result::Result<Value, LlmError>;
}

/// Backend used when `llm.enabled = false`; every call takes its fallback
pub struct DisabledBackend;

impl ChatBackend for DisabledBackend {
    fn complete_json(&self, _prompt: &str, _content: &str) -> std::result::Result<Value, LlmError> {
        Err(LlmError::Disabled)
    }
}

/// Result of a collaborator call
#[derive(Debug, Clone, PartialEq)]
pub enum LlmOutcome<T> {
    /// The response matched the expected schema
    Parsed(T),
    /// The call failed or the response was malformed; `value` is the fallback
    Fallback { value: T, reason: String },
}

impl<T> LlmOutcome<T> {
    /// Build a fallback and log why it was taken
    pub fn fallback(value: T, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!("Using fallback value: {}", reason);
        Self::Fallback { value, reason }
    }

    pub fn value(&self) -> &T {
        match self {
            Self::Parsed(value) | Self::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Parsed(value) | Self::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Backend selected by `config.enabled`
pub fn create_backend(config: &LlmConfig) -> Result<Arc<dyn ChatBackend>> {
    if !config.enabled {
        return Ok(Arc::new(DisabledBackend));
    }
    Ok(Arc::new(OpenAiChatClient::from_config(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        let parsed = LlmOutcome::Parsed(3);
        assert!(!parsed.is_fallback());
        assert_eq!(*parsed.value(), 3);

        let fallback = LlmOutcome::fallback(5, "bad json");
        assert!(fallback.is_fallback());
        assert_eq!(fallback.into_value(), 5);
    }

    #[test]
    fn test_disabled_backend() {
        let config = LlmConfig {
            enabled: false,
            ..crate::config::Config::default().llm
        };
        let backend = create_backend(&config).unwrap();
        assert!(matches!(
            backend.complete_json("p", "c"),
            Err(LlmError::Disabled)
        ));
    }
}
