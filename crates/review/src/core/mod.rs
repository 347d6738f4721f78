//! Core triage logic: data models, the heuristic rule cascade, and report
//! aggregation. Nothing in this module performs I/O; the gateway-facing side
//! lives under `llm`.

pub mod error;
pub mod heuristics;
pub mod report;
pub mod schemas;
pub mod severity;

pub use error::ReviewError;
pub use heuristics::heuristic_classify;
pub use report::{build_report, compute_risk_score};
pub use schemas::{
    AikidoFinding, AikidoReport, Classification, ClassificationSummary, CwcInfo, EvidenceInfo,
    EvidenceLevel, FindingLocation, FindingReview, RemediationPriority, ReviewDepth, ReviewReport,
    RiskLevel,
};
pub use severity::{Confidence, ReliabilityTier, Severity};

/// Char-safe truncation used for reasoning excerpts and error snippets.
pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}
