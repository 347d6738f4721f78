//! Cross-finding correlation pass for deep reviews.
//!
//! Runs strictly after the first pass and only over reviews still classified
//! `needs_review`. The merge is all-or-nothing: a gateway error, an
//! unparseable response, or an array with fewer entries than requested
//! discards the whole pass rather than guessing which answer belongs to
//! which finding.

use std::collections::HashMap;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::core::schemas::{AikidoFinding, Classification, FindingReview};
use crate::llm::config::ReviewConfig;
use crate::llm::parser;
use crate::llm::prompts::{build_correlation_prompt, SYSTEM_PROMPT};
use crate::llm::provider::{LLMProvider, LLMRequest};
use crate::llm::source_context::finding_snippet;

pub(crate) async fn correlation_pass(
    provider: &dyn LLMProvider,
    config: &ReviewConfig,
    findings: &[AikidoFinding],
    mut reviews: Vec<FindingReview>,
    source_files: &HashMap<String, String>,
    semaphore: &Semaphore,
) -> Vec<FindingReview> {
    let targets: Vec<(usize, Option<String>)> = reviews
        .iter()
        .filter(|review| review.classification == Classification::NeedsReview)
        .map(|review| {
            let index = review.finding_index;
            (
                index,
                finding_snippet(&findings[index], source_files, config.context_lines),
            )
        })
        .collect();

    if targets.is_empty() {
        debug!("no ambiguous reviews, skipping correlation pass");
        return reviews;
    }

    info!(ambiguous = targets.len(), "running correlation pass");

    let prompt = build_correlation_prompt(&reviews, &targets);

    let permit = match semaphore.acquire().await {
        Ok(permit) => permit,
        Err(_) => {
            warn!("concurrency limiter closed, discarding correlation pass");
            return reviews;
        }
    };

    // The synopsis plus per-target reviews need more room than a single
    // review response.
    let outcome = provider
        .analyze(LLMRequest {
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_prompt: prompt,
            temperature: config.temperature,
            max_tokens: config.max_tokens * 2,
        })
        .await;
    drop(permit);

    let content = match outcome {
        Ok(response) => response.content,
        Err(error) => {
            warn!(%error, "correlation call failed, keeping first-pass reviews");
            return reviews;
        }
    };

    let Some(values) = parser::parse_array(&content) else {
        warn!("unparseable correlation response, keeping first-pass reviews");
        return reviews;
    };

    if values.len() < targets.len() {
        warn!(
            expected = targets.len(),
            got = values.len(),
            "correlation response too short, keeping first-pass reviews"
        );
        return reviews;
    }

    let mut updates = Vec::with_capacity(targets.len());
    for (position, (index, _)) in targets.iter().enumerate() {
        match parser::review_from_json(&values[position], &findings[*index], *index) {
            Some(update) => updates.push(update),
            None => {
                warn!(index = *index, "malformed correlation entry, keeping first-pass reviews");
                return reviews;
            }
        }
    }

    for update in updates {
        if let Some(review) = reviews
            .iter_mut()
            .find(|review| review.finding_index == update.finding_index)
        {
            *review = update;
        }
    }

    reviews.sort_by_key(|review| review.finding_index);
    reviews
}
