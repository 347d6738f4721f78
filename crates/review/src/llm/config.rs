//! Review pipeline configuration, loadable from YAML, JSON, or environment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::schemas::ReviewDepth;
use crate::llm::source_context::{CONTEXT_LINES, MAX_MODULE_LINES};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub depth: ReviewDepth,

    /// Sampling temperature for review calls. Low by default; triage should
    /// be repeatable.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Findings per batched review call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Ceiling on in-flight gateway calls.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Lines of surrounding source shown on each side of a finding.
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,

    /// Modules longer than this are not inlined whole into prompts.
    #[serde(default = "default_max_module_lines")]
    pub max_module_lines: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_model")]
    pub model: String,

    /// Falls back to the OPENAI_API_KEY environment variable when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_batch_size() -> usize {
    5
}

fn default_max_concurrent() -> usize {
    5
}

fn default_context_lines() -> usize {
    CONTEXT_LINES
}

fn default_max_module_lines() -> usize {
    MAX_MODULE_LINES
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            base_url: None,
        }
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            depth: ReviewDepth::default(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            batch_size: default_batch_size(),
            max_concurrent: default_max_concurrent(),
            context_lines: default_context_lines(),
            max_module_lines: default_max_module_lines(),
        }
    }
}

impl ReviewConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Defaults overridden by AIKIDO_REVIEW_* environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(model) = std::env::var("AIKIDO_REVIEW_MODEL") {
            config.provider.model = model;
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.provider.api_key = Some(key);
        }
        if let Ok(base_url) = std::env::var("AIKIDO_REVIEW_BASE_URL") {
            config.provider.base_url = Some(base_url);
        }
        if let Ok(depth) = std::env::var("AIKIDO_REVIEW_DEPTH") {
            config.depth = depth
                .parse()
                .with_context(|| format!("invalid AIKIDO_REVIEW_DEPTH: {depth}"))?;
        }
        if let Ok(batch) = std::env::var("AIKIDO_REVIEW_BATCH_SIZE") {
            config.batch_size = batch
                .parse()
                .with_context(|| format!("invalid AIKIDO_REVIEW_BATCH_SIZE: {batch}"))?;
        }
        if let Ok(concurrent) = std::env::var("AIKIDO_REVIEW_MAX_CONCURRENT") {
            config.max_concurrent = concurrent
                .parse()
                .with_context(|| format!("invalid AIKIDO_REVIEW_MAX_CONCURRENT: {concurrent}"))?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReviewConfig::default();
        assert_eq!(config.provider.model, "gpt-4o");
        assert_eq!(config.temperature, 0.1);
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.max_concurrent, 5);
        assert_eq!(config.context_lines, 8);
        assert_eq!(config.max_module_lines, 200);
        assert_eq!(config.depth, ReviewDepth::Standard);
    }

    #[test]
    fn test_yaml_partial_override() {
        let yaml = r#"
provider:
  model: gpt-4o-mini
depth: deep
batch_size: 3
"#;
        let config: ReviewConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.provider.model, "gpt-4o-mini");
        assert_eq!(config.depth, ReviewDepth::Deep);
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.max_concurrent, 5);
        assert_eq!(config.temperature, 0.1);
    }

    #[test]
    fn test_json_round_trip() {
        let config = ReviewConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ReviewConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.provider.model, config.provider.model);
        assert_eq!(parsed.batch_size, config.batch_size);
    }
}
