//! OpenAI-compatible chat-completions client
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::{ChatBackend, LlmError};
use crate::config::LlmConfig;

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

/// Sends one user message per call and asks for a JSON object back.
///
/// A reply that is not valid JSON is wrapped as `{"content": <text>}` so the
/// caller's schema check decides what to do with it.
pub struct OpenAiChatClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_completion_tokens: u32,
}

impl OpenAiChatClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        max_completion_tokens: u32,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|e| LlmError::Client(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
            max_completion_tokens,
        })
    }

    /// Build from config, reading the key from `config.api_key_env`
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::MissingApiKey(config.api_key_env.clone()))?;

        Self::new(
            &config.base_url,
            api_key,
            &config.model,
            config.temperature,
            config.max_completion_tokens,
            config.timeout_secs,
        )
    }
}

impl ChatBackend for OpenAiChatClient {
    fn complete_json(&self, prompt: &str, content: &str) -> Result<Value, LlmError> {
        let body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": format!("{}\n\nHere is the data:\n{}", prompt, content),
            }],
            "response_format": { "type": "json_object" },
            "temperature": self.temperature,
            "max_completion_tokens": self.max_completion_tokens,
        });

        debug!("Sending chat completion request to {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| LlmError::Response(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::Response("no content in response".to_string()))?;

        match serde_json::from_str(&text) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!("LLM reply is not JSON ({}), wrapping it as content", e);
                Ok(json!({ "content": text }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client(server: &MockServer) -> OpenAiChatClient {
        OpenAiChatClient::new(&server.base_url(), "test-key", "gpt-4o", 0.0, 2048, 5).unwrap()
    }

    fn completion(content: &str) -> Value {
        json!({
            "id": "chatcmpl-1",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
        })
    }

    #[test]
    fn test_parses_json_reply() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .header("authorization", "Bearer test-key");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(completion(r#"{"expanded_query": "rust engineer", "total_resume": 3}"#));
        });

        let value = client(&server).complete_json("prompt", "rust dev").unwrap();

        mock.assert();
        assert_eq!(value["expanded_query"], "rust engineer");
        assert_eq!(value["total_resume"], 3);
    }

    #[test]
    fn test_plain_text_reply_is_wrapped() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(completion("Strong backend candidate."));
        });

        let value = client(&server).complete_json("prompt", "resume").unwrap();
        assert_eq!(value, json!({ "content": "Strong backend candidate." }));
    }

    #[test]
    fn test_http_error_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(429).body("rate limited");
        });

        let result = client(&server).complete_json("prompt", "resume");
        assert!(matches!(result, Err(LlmError::Status { status: 429, .. })));
    }

    #[test]
    fn test_empty_choices() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "choices": [] }));
        });

        let result = client(&server).complete_json("prompt", "resume");
        assert!(matches!(result, Err(LlmError::Response(_))));
    }

    #[test]
    fn test_missing_api_key() {
        let config = LlmConfig {
            enabled: true,
            api_key_env: "TALENTSIFT_TEST_KEY_THAT_IS_NOT_SET".to_string(),
            ..crate::config::Config::default().llm
        };
        assert!(matches!(
            OpenAiChatClient::from_config(&config),
            Err(LlmError::MissingApiKey(_))
        ));
    }
}
