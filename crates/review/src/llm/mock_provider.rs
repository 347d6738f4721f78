//! Scriptable gateway stand-in for tests: canned raw-text responses keyed by
//! prompt substring, a call counter, and a failure mode.

use crate::llm::provider::{LLMError, LLMProvider, LLMRequest, LLMResponse, TokenUsage};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub struct MockLLMProvider {
    /// Checked in insertion order; first matching pattern wins.
    responses: Vec<(String, String)>,
    default_response: String,
    call_count: AtomicUsize,
    received_prompts: Mutex<Vec<String>>,
    should_fail: bool,
}

impl Default for MockLLMProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLLMProvider {
    pub fn new() -> Self {
        Self {
            responses: Vec::new(),
            default_response: Self::default_review_json(),
            call_count: AtomicUsize::new(0),
            received_prompts: Mutex::new(Vec::new()),
            should_fail: false,
        }
    }

    /// Every call returns an ApiError.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new()
        }
    }

    pub fn with_response(mut self, pattern: &str, raw_content: &str) -> Self {
        self.responses.push((pattern.to_string(), raw_content.to_string()));
        self
    }

    pub fn with_default_response(mut self, raw_content: &str) -> Self {
        self.default_response = raw_content.to_string();
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// User prompts received so far, in call order.
    pub fn received_prompts(&self) -> Vec<String> {
        self.received_prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }

    fn default_review_json() -> String {
        serde_json::json!({
            "classification": "needs_review",
            "reviewer_confidence": 0.5,
            "reasoning": "Mock review.",
            "mitigating_patterns": [],
            "remediation_priority": "medium"
        })
        .to_string()
    }

    fn select_response(&self, request: &LLMRequest) -> String {
        let combined = format!("{} {}", request.system_prompt, request.user_prompt);
        for (pattern, content) in &self.responses {
            if combined.contains(pattern.as_str()) {
                return content.clone();
            }
        }
        self.default_response.clone()
    }
}

#[async_trait]
impl LLMProvider for MockLLMProvider {
    async fn analyze(&self, request: LLMRequest) -> Result<LLMResponse, LLMError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.received_prompts.lock() {
            prompts.push(request.user_prompt.clone());
        }

        if self.should_fail {
            return Err(LLMError::ApiError(
                "mock provider configured to fail".to_string(),
            ));
        }

        // Yield once so concurrent tasks actually interleave in tests.
        tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;

        Ok(LLMResponse {
            content: self.select_response(&request),
            model: "mock-model".to_string(),
            usage: TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 200,
                total_tokens: 300,
            },
        })
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}
