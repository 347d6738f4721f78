//! Deep-mode correlation: second pass over ambiguous reviews, applied
//! all-or-nothing.

use std::collections::HashMap;
use std::sync::Arc;

use aikido_review::{
    AikidoFinding, Classification, Confidence, FindingReviewer, MockLLMProvider, ReliabilityTier,
    ReviewConfig, ReviewDepth, Severity,
};

fn finding(detector: &str, severity: Severity, module: &str) -> AikidoFinding {
    AikidoFinding {
        detector: detector.to_string(),
        reliability_tier: ReliabilityTier::Stable,
        severity,
        confidence: Confidence::Likely,
        title: format!("{detector} in {module}"),
        description: "Potential issue flagged by static analysis.".to_string(),
        module: module.to_string(),
        cwc: None,
        location: None,
        suggestion: None,
        related_findings: vec![],
        evidence: None,
    }
}

fn review_entries(entries: &[(&str, f64)]) -> String {
    let values: Vec<serde_json::Value> = entries
        .iter()
        .map(|(classification, confidence)| {
            serde_json::json!({
                "classification": classification,
                "reviewer_confidence": confidence,
                "reasoning": "Correlated assessment.",
                "remediation_priority": "medium"
            })
        })
        .collect();
    serde_json::Value::Array(values).to_string()
}

#[tokio::test]
async fn test_deep_mode_merges_correlation_results() {
    let findings = vec![
        finding("value-not-preserved", Severity::Critical, "validators/a"),
        finding("datum-not-checked", Severity::Medium, "validators/b"),
        finding("datum-not-checked", Severity::Medium, "validators/c"),
    ];

    let confirmed = serde_json::json!({
        "classification": "confirmed_tp",
        "reviewer_confidence": 0.95,
        "reasoning": "Exploitable.",
        "remediation_priority": "critical"
    })
    .to_string();

    // First-pass batch leaves both medium findings ambiguous; the correlation
    // pass settles them.
    let provider = Arc::new(
        MockLLMProvider::new()
            .with_response(
                "Correlation Task",
                &review_entries(&[("likely_fp", 0.8), ("likely_tp", 0.7)]),
            )
            .with_response("## Finding #0", &confirmed)
            .with_response(
                "Respond with a JSON array",
                &review_entries(&[("needs_review", 0.5), ("needs_review", 0.5)]),
            ),
    );
    let reviewer = FindingReviewer::new(provider.clone(), ReviewConfig::default());

    let reviews = reviewer
        .analyze(&findings, &HashMap::new(), ReviewDepth::Deep)
        .await;

    // 1 individual + 1 batch + 1 correlation call.
    assert_eq!(provider.call_count(), 3);
    assert_eq!(reviews.len(), 3);

    // The settled review from the first pass is untouched.
    assert_eq!(reviews[0].classification, Classification::ConfirmedTp);
    assert_eq!(reviews[0].reviewer_confidence, 0.95);

    assert_eq!(reviews[1].classification, Classification::LikelyFp);
    assert_eq!(reviews[1].reviewer_confidence, 0.8);
    assert_eq!(reviews[2].classification, Classification::LikelyTp);
    assert_eq!(reviews[2].reviewer_confidence, 0.7);
}

#[tokio::test]
async fn test_deep_mode_without_ambiguity_skips_second_pass() {
    let findings = vec![finding("style-note", Severity::Low, "lib/util")];

    let provider = Arc::new(MockLLMProvider::new().with_response(
        "Respond with a JSON array",
        &review_entries(&[("confirmed_fp", 0.9)]),
    ));
    let reviewer = FindingReviewer::new(provider.clone(), ReviewConfig::default());

    let reviews = reviewer
        .analyze(&findings, &HashMap::new(), ReviewDepth::Deep)
        .await;

    assert_eq!(provider.call_count(), 1);
    assert_eq!(reviews[0].classification, Classification::ConfirmedFp);
}

#[tokio::test]
async fn test_correlation_prompt_orders_targets_by_finding_index() {
    // Finding 0 is batched and finding 1 gets an individual call, so the
    // tasks complete in the opposite layout; the correlation prompt must
    // still list findings in index order for the positional merge to hold.
    let findings = vec![
        finding("datum-not-checked", Severity::Medium, "validators/a"),
        finding("missing-signer-check", Severity::High, "validators/b"),
    ];

    let provider = Arc::new(
        MockLLMProvider::new()
            .with_response(
                "Correlation Task",
                &review_entries(&[("likely_fp", 0.8), ("likely_tp", 0.7)]),
            )
            .with_response(
                "Respond with a JSON array",
                &review_entries(&[("needs_review", 0.5)]),
            ),
    );
    let reviewer = FindingReviewer::new(provider.clone(), ReviewConfig::default());

    let reviews = reviewer
        .analyze(&findings, &HashMap::new(), ReviewDepth::Deep)
        .await;

    assert_eq!(provider.call_count(), 3);

    let prompts = provider.received_prompts();
    let correlation = prompts.last().unwrap();
    let synopsis_0 = correlation.find("#0 [datum-not-checked]").unwrap();
    let synopsis_1 = correlation.find("#1 [missing-signer-check]").unwrap();
    assert!(synopsis_0 < synopsis_1);
    let target_0 = correlation.find("### Finding #0").unwrap();
    let target_1 = correlation.find("### Finding #1").unwrap();
    assert!(target_0 < target_1);

    // Positional merge lines up with the index-ordered targets.
    assert_eq!(reviews[0].classification, Classification::LikelyFp);
    assert_eq!(reviews[1].classification, Classification::LikelyTp);
}

#[tokio::test]
async fn test_short_correlation_array_discards_pass() {
    let findings = vec![
        finding("datum-not-checked", Severity::Medium, "validators/a"),
        finding("datum-not-checked", Severity::Medium, "validators/b"),
    ];

    let provider = Arc::new(
        MockLLMProvider::new()
            .with_response("Correlation Task", &review_entries(&[("likely_fp", 0.8)]))
            .with_response(
                "Respond with a JSON array",
                &review_entries(&[("needs_review", 0.5), ("needs_review", 0.5)]),
            ),
    );
    let reviewer = FindingReviewer::new(provider.clone(), ReviewConfig::default());

    let reviews = reviewer
        .analyze(&findings, &HashMap::new(), ReviewDepth::Deep)
        .await;

    assert_eq!(provider.call_count(), 2);
    // One answer for two questions is not attributable; both stay ambiguous.
    assert!(reviews
        .iter()
        .all(|r| r.classification == Classification::NeedsReview));
}

#[tokio::test]
async fn test_failing_gateway_keeps_heuristic_first_pass() {
    let findings = vec![finding("datum-not-checked", Severity::Medium, "validators/a")];

    let provider = Arc::new(MockLLMProvider::failing());
    let reviewer = FindingReviewer::new(provider.clone(), ReviewConfig::default());

    let reviews = reviewer
        .analyze(&findings, &HashMap::new(), ReviewDepth::Deep)
        .await;

    // One failed batch call, then one failed correlation call over the
    // still-ambiguous fallback review.
    assert_eq!(provider.call_count(), 2);
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].classification, Classification::NeedsReview);
    assert!(reviews[0].reasoning.starts_with("[gateway error:"));
}
