//! Reasoning gateway abstraction and the OpenAI-backed implementation.

use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestUserMessage, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum LLMError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("invalid response format: {0}")]
    InvalidResponse(String),

    #[error("rate limit exceeded")]
    RateLimitExceeded,

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("timeout after {0} seconds")]
    Timeout(u64),
}

#[derive(Debug, Clone)]
pub struct LLMRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: String,
    pub model: String,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Opaque prompt-in/text-out gateway. May fail or time out; never returns
/// partial output. Failures are absorbed by the caller's heuristic fallback.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn analyze(&self, request: LLMRequest) -> Result<LLMResponse, LLMError>;

    fn model_name(&self) -> &str;

    fn estimate_tokens(&self, text: &str) -> usize {
        text.len() / 4
    }
}

pub struct OpenAIProvider {
    client: Client<OpenAIConfig>,
    api_key: String,
    model: String,
    timeout_seconds: u64,
    max_retries: u32,
}

fn provider_config(api_key: &str, base_url: Option<&str>) -> OpenAIConfig {
    let mut config = OpenAIConfig::new().with_api_key(api_key);
    if let Some(base_url) = base_url {
        config = config.with_api_base(base_url);
    }
    config
}

impl OpenAIProvider {
    pub fn new(model: Option<String>) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;
        Ok(Self::with_api_key(
            api_key,
            model.unwrap_or_else(|| "gpt-4o".to_string()),
        ))
    }

    pub fn with_api_key(api_key: String, model: String) -> Self {
        Self {
            client: Client::with_config(provider_config(&api_key, None)),
            api_key,
            model,
            timeout_seconds: 60,
            max_retries: 3,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.client = Client::with_config(provider_config(&self.api_key, Some(&base_url)));
        self
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn analyze(&self, request: LLMRequest) -> Result<LLMResponse, LLMError> {
        debug!(model = %self.model, "sending review request");

        let system_message = ChatCompletionRequestSystemMessage {
            content: request.system_prompt.clone(),
            ..Default::default()
        };
        let user_message = ChatCompletionRequestUserMessage {
            content: async_openai::types::ChatCompletionRequestUserMessageContent::Text(
                request.user_prompt.clone(),
            ),
            ..Default::default()
        };

        let api_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_message),
                ChatCompletionRequestMessage::User(user_message),
            ])
            .temperature(request.temperature)
            .max_tokens(request.max_tokens as u16)
            .build()
            .map_err(|e| LLMError::ApiError(e.to_string()))?;

        let mut attempt = 0;
        let response = loop {
            attempt += 1;

            let chat = self.client.chat();
            let call = chat.create(api_request.clone());
            let outcome =
                tokio::time::timeout(Duration::from_secs(self.timeout_seconds), call).await;

            match outcome {
                Ok(Ok(response)) => break response,
                Ok(Err(e)) => {
                    warn!(attempt, error = %e, "gateway call failed");
                    if attempt >= self.max_retries {
                        return Err(LLMError::ApiError(e.to_string()));
                    }
                    let wait = if e.to_string().contains("rate") {
                        Duration::from_secs(2_u64.pow(attempt))
                    } else {
                        Duration::from_millis(100 * attempt as u64)
                    };
                    tokio::time::sleep(wait).await;
                }
                Err(_) => {
                    warn!(attempt, "gateway call timed out");
                    if attempt >= self.max_retries {
                        return Err(LLMError::Timeout(self.timeout_seconds));
                    }
                }
            }
        };

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| LLMError::InvalidResponse("no content in response".to_string()))?;

        let usage = response
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        debug!(total_tokens = usage.total_tokens, "received response");

        Ok(LLMResponse {
            content,
            model: response.model,
            usage,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::config::Config;

    #[test]
    fn test_base_url_override_keeps_api_key() {
        let config = provider_config("test_key", Some("http://localhost:8080/v1"));
        assert_eq!(config.api_base(), "http://localhost:8080/v1");

        let headers = config.headers();
        let auth = headers.get("authorization").unwrap().to_str().unwrap();
        assert_eq!(auth, "Bearer test_key");
    }

    #[test]
    fn test_provider_with_base_url_retains_key() {
        let provider = OpenAIProvider::with_api_key("test_key".to_string(), "gpt-4o".to_string())
            .with_base_url("http://localhost:8080/v1".to_string());
        assert_eq!(provider.api_key, "test_key");
        assert_eq!(provider.model_name(), "gpt-4o");
    }

    #[test]
    fn test_token_estimation() {
        let provider = OpenAIProvider::with_api_key("test_key".to_string(), "gpt-4o".to_string());
        let text = "This is a test string for token estimation.";
        let estimated = provider.estimate_tokens(text);
        assert!(estimated > 0);
        assert!(estimated < text.len());
    }
}
