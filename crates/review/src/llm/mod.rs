//! Gateway-assisted review: provider abstraction, prompt construction,
//! response parsing, and the concurrent orchestrator.

pub mod config;
pub mod correlation;
pub mod mock_provider;
pub mod parser;
pub mod prompts;
pub mod provider;
pub mod reviewer;
pub mod source_context;

pub use config::{ProviderConfig, ReviewConfig};
pub use mock_provider::MockLLMProvider;
pub use provider::{LLMError, LLMProvider, LLMRequest, LLMResponse, OpenAIProvider, TokenUsage};
pub use reviewer::FindingReviewer;
