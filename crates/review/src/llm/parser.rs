//! Extraction of structured reviews from raw gateway text.
//!
//! Models emit JSON wrapped in code fences, prose, or both. The parsers here
//! strip fences, try a direct parse, then fall back to the outermost bracket
//! pair of the expected kind. They return `None` instead of erroring; callers
//! treat `None` exactly like a gateway failure.

use serde_json::Value;
use tracing::warn;

use crate::core::schemas::{AikidoFinding, Classification, FindingReview, RemediationPriority};

fn strip_code_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn extract(text: &str, open: char, close: char) -> Option<Value> {
    let cleaned = strip_code_fences(text);
    let cleaned = cleaned.trim();

    if let Ok(value) = serde_json::from_str::<Value>(cleaned) {
        return Some(value);
    }

    let start = cleaned.find(open)?;
    let end = cleaned.rfind(close)?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&cleaned[start..=end]).ok()
}

/// Parse a single-review response into a JSON object.
pub fn parse_object(text: &str) -> Option<Value> {
    match extract(text, '{', '}') {
        Some(Value::Object(map)) => Some(Value::Object(map)),
        _ => None,
    }
}

/// Parse a batch or correlation response into a JSON array.
pub fn parse_array(text: &str) -> Option<Vec<Value>> {
    match extract(text, '[', ']') {
        Some(Value::Array(items)) => Some(items),
        _ => None,
    }
}

/// Convert one parsed review object into a `FindingReview`, applying the
/// schema's defaults and clamps. Returns `None` for non-object values so
/// batch callers can fall back per entry.
pub fn review_from_json(
    value: &Value,
    finding: &AikidoFinding,
    index: usize,
) -> Option<FindingReview> {
    let obj = value.as_object()?;

    let classification = obj
        .get("classification")
        .and_then(|v| serde_json::from_value::<Classification>(v.clone()).ok())
        .unwrap_or_else(|| {
            warn!(detector = %finding.detector, "unknown classification in response");
            Classification::NeedsReview
        });

    let remediation_priority = obj
        .get("remediation_priority")
        .and_then(|v| serde_json::from_value::<RemediationPriority>(v.clone()).ok())
        .unwrap_or_else(|| finding.severity.into());

    let reviewer_confidence = obj
        .get("reviewer_confidence")
        .and_then(Value::as_f64)
        .unwrap_or(0.5)
        .clamp(0.0, 1.0);

    let reasoning = obj
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or("No reasoning provided.")
        .to_string();

    let mitigating_patterns = obj
        .get("mitigating_patterns")
        .and_then(|v| serde_json::from_value::<Vec<String>>(v.clone()).ok())
        .unwrap_or_default();

    Some(FindingReview {
        finding_index: index,
        detector: finding.detector.clone(),
        title: finding.title.clone(),
        original_severity: finding.severity,
        original_confidence: finding.confidence,
        classification,
        reviewer_confidence,
        reasoning,
        mitigating_patterns,
        exploitation_scenario: obj
            .get("exploitation_scenario")
            .and_then(Value::as_str)
            .map(str::to_string),
        remediation_priority,
        evidence_assessment: obj
            .get("evidence_assessment")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}
