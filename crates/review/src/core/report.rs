//! Aggregates a finished review list into the `aikido.review.v1` report:
//! classification tallies, the severity-weighted risk score, an executive
//! summary, and prioritized recommendations.

use crate::core::schemas::{
    ClassificationSummary, FindingReview, ReviewDepth, ReviewReport, RiskLevel, REVIEW_SCHEMA,
};
use crate::core::truncate;

pub fn classification_summary(reviews: &[FindingReview]) -> ClassificationSummary {
    let mut summary = ClassificationSummary::default();
    for review in reviews {
        summary.record(review.classification);
    }
    summary
}

/// Severity-weighted risk score in [0, 10].
///
/// Numerator: weight(severity) x classification contribution per review.
/// Denominator: sum of weights. Strengthening any one verdict at fixed
/// severity can only raise the score (contributions are monotonic).
pub fn compute_risk_score(reviews: &[FindingReview]) -> f64 {
    let max_possible: f64 = reviews.iter().map(|r| r.original_severity.weight()).sum();
    if max_possible == 0.0 {
        return 0.0;
    }

    let actual: f64 = reviews
        .iter()
        .map(|r| r.original_severity.weight() * r.classification.risk_contribution())
        .sum();

    let score = (actual / max_possible) * 10.0;
    (score.min(10.0) * 10.0).round() / 10.0
}

pub fn executive_summary(
    summary: &ClassificationSummary,
    risk_score: f64,
    total: usize,
) -> String {
    let mut parts = vec![format!("Reviewed {total} findings from Aikido static analysis.")];

    let tp_count = summary.confirmed_tp + summary.likely_tp;
    let fp_count = summary.confirmed_fp + summary.likely_fp;

    if tp_count > 0 {
        parts.push(format!(
            "{tp_count} finding(s) classified as true or likely true positives requiring attention."
        ));
    }
    if summary.needs_review > 0 {
        parts.push(format!(
            "{} finding(s) require manual review.",
            summary.needs_review
        ));
    }
    if fp_count > 0 {
        parts.push(format!(
            "{fp_count} finding(s) classified as false or likely false positives."
        ));
    }

    parts.push(format!(
        "Overall risk level: {} (score: {risk_score:.1}/10.0).",
        RiskLevel::from_score(risk_score)
    ));

    parts.join(" ")
}

/// One actionable line per confirmed/likely true positive, most urgent first.
pub fn recommendations(reviews: &[FindingReview]) -> Vec<String> {
    let mut actionable: Vec<&FindingReview> = reviews
        .iter()
        .filter(|r| r.classification.is_true_positive_leaning())
        .collect();
    actionable.sort_by_key(|r| r.remediation_priority.rank());

    let mut recs: Vec<String> = actionable
        .iter()
        .map(|review| {
            format!(
                "[{}] Address {} in {}: {}",
                review.remediation_priority.to_string().to_uppercase(),
                review.detector,
                review.title,
                truncate(&review.reasoning, 150)
            )
        })
        .collect();

    if recs.is_empty() {
        recs.push(
            "No critical issues found. Continue monitoring with regular Aikido scans."
                .to_string(),
        );
    }

    recs
}

/// Assemble the full report. Built once; never mutated afterwards.
pub fn build_report(project: &str, reviews: Vec<FindingReview>, depth: ReviewDepth) -> ReviewReport {
    let summary = classification_summary(&reviews);
    let score = compute_risk_score(&reviews);
    let executive = executive_summary(&summary, score, reviews.len());
    let recommendations = recommendations(&reviews);

    ReviewReport {
        schema_version: REVIEW_SCHEMA.to_string(),
        project: project.to_string(),
        review_depth: depth,
        total_findings: reviews.len(),
        classification_summary: summary,
        risk_score: score,
        risk_level: RiskLevel::from_score(score),
        executive_summary: executive,
        finding_reviews: reviews,
        recommendations,
    }
}
