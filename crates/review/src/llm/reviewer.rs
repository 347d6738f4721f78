//! Review orchestration: partitions findings into individual and batched
//! gateway calls, runs them concurrently under a shared permit limit, and
//! degrades to the heuristic verdict whenever a call or its parse fails.
//!
//! The pipeline never loses a finding: N findings in, N reviews out, whatever
//! the gateway does.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::core::heuristics::heuristic_classify;
use crate::core::report::build_report;
use crate::core::schemas::{AikidoFinding, AikidoReport, FindingReview, ReviewDepth, ReviewReport};
use crate::core::truncate;
use crate::llm::config::ReviewConfig;
use crate::llm::correlation::correlation_pass;
use crate::llm::parser;
use crate::llm::prompts::{build_batch_prompt, build_finding_prompt, SYSTEM_PROMPT};
use crate::llm::provider::{LLMError, LLMProvider, LLMRequest, OpenAIProvider};
use crate::llm::source_context::{finding_snippet, full_module_source};

/// Why a review fell back to the heuristic verdict.
#[derive(Debug)]
pub(crate) enum FallbackCause {
    Gateway(String),
    Parse,
    MissingEntry,
}

impl FallbackCause {
    fn reasoning_prefix(&self) -> String {
        match self {
            Self::Gateway(error) => {
                format!("[gateway error: {}, heuristic fallback]", truncate(error, 120))
            }
            Self::Parse => "[response parse failed, heuristic fallback]".to_string(),
            Self::MissingEntry => "[batch entry missing, heuristic fallback]".to_string(),
        }
    }
}

pub(crate) fn fallback_review(
    finding: &AikidoFinding,
    index: usize,
    cause: FallbackCause,
) -> FindingReview {
    let mut review = heuristic_classify(finding, index);
    review.reasoning = format!("{} {}", cause.reasoning_prefix(), review.reasoning);
    review
}

pub struct FindingReviewer {
    provider: Arc<dyn LLMProvider>,
    config: ReviewConfig,
}

impl FindingReviewer {
    pub fn new(provider: Arc<dyn LLMProvider>, config: ReviewConfig) -> Self {
        Self { provider, config }
    }

    /// Build a reviewer backed by the configured OpenAI-compatible endpoint.
    pub fn from_config(config: ReviewConfig) -> Result<Self> {
        let provider = match &config.provider.api_key {
            Some(key) => {
                OpenAIProvider::with_api_key(key.clone(), config.provider.model.clone())
            }
            None => OpenAIProvider::new(Some(config.provider.model.clone()))?,
        };
        let provider = match &config.provider.base_url {
            Some(base_url) => provider.with_base_url(base_url.clone()),
            None => provider,
        };
        Ok(Self::new(Arc::new(provider), config))
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    /// Review every finding at the given depth. Always returns exactly one
    /// review per finding, sorted by finding index.
    pub async fn analyze(
        &self,
        findings: &[AikidoFinding],
        source_files: &HashMap<String, String>,
        depth: ReviewDepth,
    ) -> Vec<FindingReview> {
        if findings.is_empty() {
            return Vec::new();
        }

        if depth == ReviewDepth::Quick {
            debug!(total = findings.len(), "quick review, heuristics only");
            return findings
                .iter()
                .enumerate()
                .map(|(index, finding)| heuristic_classify(finding, index))
                .collect();
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent));
        let batch_size = self.config.batch_size.max(1);

        let mut tasks: Vec<BoxFuture<'_, Vec<FindingReview>>> = Vec::new();
        let mut batched_indices = Vec::new();

        for (index, finding) in findings.iter().enumerate() {
            if finding.severity.is_high_priority() {
                let semaphore = Arc::clone(&semaphore);
                tasks.push(
                    async move {
                        vec![
                            self.review_individual(findings, index, source_files, &semaphore)
                                .await,
                        ]
                    }
                    .boxed(),
                );
            } else {
                batched_indices.push(index);
            }
        }

        let individual_count = tasks.len();
        for chunk in batched_indices.chunks(batch_size) {
            let chunk = chunk.to_vec();
            let semaphore = Arc::clone(&semaphore);
            tasks.push(
                async move {
                    self.review_batch(findings, chunk, source_files, &semaphore)
                        .await
                }
                .boxed(),
            );
        }

        info!(
            total = findings.len(),
            individual = individual_count,
            batches = tasks.len() - individual_count,
            %depth,
            "dispatching review tasks"
        );

        let mut reviews: Vec<FindingReview> =
            join_all(tasks).await.into_iter().flatten().collect();

        // Tasks finish in individual-then-batch layout; restore finding order
        // so the correlation synopsis reads in index order.
        reviews.sort_by_key(|review| review.finding_index);

        if depth == ReviewDepth::Deep {
            reviews = correlation_pass(
                self.provider.as_ref(),
                &self.config,
                findings,
                reviews,
                source_files,
                &semaphore,
            )
            .await;
        }

        reviews
    }

    /// Review a full findings report and assemble the output report.
    pub async fn review_report(
        &self,
        report: &AikidoReport,
        source_files: &HashMap<String, String>,
    ) -> ReviewReport {
        let reviews = self
            .analyze(&report.findings, source_files, self.config.depth)
            .await;
        build_report(&report.project, reviews, self.config.depth)
    }

    async fn call_gateway(
        &self,
        semaphore: &Semaphore,
        user_prompt: String,
        max_tokens: u32,
    ) -> Result<String, LLMError> {
        let _permit = semaphore
            .acquire()
            .await
            .map_err(|_| LLMError::ApiError("concurrency limiter closed".to_string()))?;

        let response = self
            .provider
            .analyze(LLMRequest {
                system_prompt: SYSTEM_PROMPT.to_string(),
                user_prompt,
                temperature: self.config.temperature,
                max_tokens,
            })
            .await?;
        Ok(response.content)
    }

    async fn review_individual(
        &self,
        findings: &[AikidoFinding],
        index: usize,
        source_files: &HashMap<String, String>,
        semaphore: &Semaphore,
    ) -> FindingReview {
        let finding = &findings[index];
        let snippet = finding_snippet(finding, source_files, self.config.context_lines);
        let full_source = full_module_source(finding, source_files, self.config.max_module_lines);
        let siblings: Vec<&AikidoFinding> = findings
            .iter()
            .enumerate()
            .filter(|(i, other)| *i != index && other.module == finding.module)
            .map(|(_, other)| other)
            .collect();

        let prompt = build_finding_prompt(
            finding,
            index,
            snippet.as_deref(),
            full_source.as_deref(),
            &siblings,
        );

        match self
            .call_gateway(semaphore, prompt, self.config.max_tokens)
            .await
        {
            Ok(content) => match parser::parse_object(&content)
                .and_then(|value| parser::review_from_json(&value, finding, index))
            {
                Some(review) => review,
                None => {
                    warn!(index, detector = %finding.detector, "unparseable review response");
                    fallback_review(finding, index, FallbackCause::Parse)
                }
            },
            Err(error) => {
                warn!(index, detector = %finding.detector, %error, "gateway call failed");
                fallback_review(finding, index, FallbackCause::Gateway(error.to_string()))
            }
        }
    }

    async fn review_batch(
        &self,
        findings: &[AikidoFinding],
        indices: Vec<usize>,
        source_files: &HashMap<String, String>,
        semaphore: &Semaphore,
    ) -> Vec<FindingReview> {
        let items: Vec<(usize, &AikidoFinding, Option<String>)> = indices
            .iter()
            .map(|&index| {
                let finding = &findings[index];
                (
                    index,
                    finding,
                    finding_snippet(finding, source_files, self.config.context_lines),
                )
            })
            .collect();

        let prompt = build_batch_prompt(&items);

        let content = match self
            .call_gateway(semaphore, prompt, self.config.max_tokens)
            .await
        {
            Ok(content) => content,
            Err(error) => {
                warn!(batch = ?indices, %error, "batch gateway call failed");
                return indices
                    .iter()
                    .map(|&index| {
                        fallback_review(
                            &findings[index],
                            index,
                            FallbackCause::Gateway(error.to_string()),
                        )
                    })
                    .collect();
            }
        };

        let Some(values) = parser::parse_array(&content) else {
            warn!(batch = ?indices, "unparseable batch response");
            return indices
                .iter()
                .map(|&index| fallback_review(&findings[index], index, FallbackCause::Parse))
                .collect();
        };

        // The model is asked to answer in order; a short or partially broken
        // array degrades only the affected entries.
        indices
            .iter()
            .enumerate()
            .map(|(position, &index)| {
                let finding = &findings[index];
                match values.get(position) {
                    Some(value) => parser::review_from_json(value, finding, index)
                        .unwrap_or_else(|| {
                            warn!(index, "malformed batch entry");
                            fallback_review(finding, index, FallbackCause::Parse)
                        }),
                    None => {
                        warn!(index, "batch response missing entry");
                        fallback_review(finding, index, FallbackCause::MissingEntry)
                    }
                }
            })
            .collect()
    }
}
