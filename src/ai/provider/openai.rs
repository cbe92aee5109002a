//! OpenAI-compatible Chat Completions provider.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

use super::{LlmProvider, LlmResponse, TokenUsage, extract_json};
use crate::config::LlmConfig;
use crate::types::{Result, TypecraftError};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const API_KEY_ENV: &str = "OPENAI_API_KEY";
const MAX_TOKENS: usize = 1024;

/// OpenAI API provider; the key never appears in logs or debug output
pub struct OpenAiProvider {
    api_key: SecretString,
    api_base: Url,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base.as_str())
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                TypecraftError::Config(format!(
                    "OpenAI API key not found. Set {} or TYPECRAFT_LLM__API_KEY",
                    API_KEY_ENV
                ))
            })?;

        let api_base = parse_endpoint(config.endpoint.as_deref().unwrap_or(DEFAULT_API_BASE))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TypecraftError::Llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            api_base,
            model: config.model.clone(),
            temperature: config.temperature,
            client,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.as_str().trim_end_matches('/'))
    }

    fn build_request(&self, system: &str, prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
            temperature: self.temperature,
            max_tokens: MAX_TOKENS,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        }
    }
}

/// Only http(s) endpoints are accepted
fn parse_endpoint(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| TypecraftError::Config(format!("Invalid LLM endpoint '{}': {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(TypecraftError::Config(format!(
            "LLM endpoint must use http or https, got '{}'",
            other
        ))),
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete_json(&self, system: &str, prompt: &str) -> Result<LlmResponse> {
        let start = Instant::now();
        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.build_request(system, prompt))
            .send()
            .await
            .map_err(|e| TypecraftError::Llm(format!("OpenAI request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TypecraftError::Llm(format!(
                "OpenAI API error ({}): {}",
                status, body
            )));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| TypecraftError::Llm(format!("Failed to parse OpenAI response: {}", e)))?;

        let usage = body
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        let reply = body
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .ok_or_else(|| TypecraftError::Llm("No content in OpenAI response".to_string()))?;

        debug!(
            model = %self.model,
            tokens = usage.total(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "OpenAI reply received"
        );

        Ok(LlmResponse {
            content: extract_json(reply)?,
            usage,
            model: self.model.clone(),
        })
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: usize,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key() -> LlmConfig {
        LlmConfig {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_debug_redacts_key() {
        let provider = OpenAiProvider::new(&config_with_key()).unwrap();
        let debug = format!("{:?}", provider);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-test"));
    }

    #[test]
    fn test_custom_endpoint() {
        let config = LlmConfig {
            endpoint: Some("http://localhost:8080/v1/".to_string()),
            ..config_with_key()
        };
        let provider = OpenAiProvider::new(&config).unwrap();
        assert_eq!(provider.completions_url(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_endpoint_scheme_checked() {
        assert!(parse_endpoint("ftp://example.com").is_err());
        assert!(parse_endpoint("not a url").is_err());
        assert!(parse_endpoint(DEFAULT_API_BASE).is_ok());
    }

    #[test]
    fn test_request_asks_for_json_object() {
        let provider = OpenAiProvider::new(&config_with_key()).unwrap();
        let request = serde_json::to_value(provider.build_request("sys", "user")).unwrap();
        assert_eq!(request["response_format"]["type"], "json_object");
        assert_eq!(request["messages"][0]["role"], "system");
        assert_eq!(request["messages"][1]["content"], "user");
    }
}
