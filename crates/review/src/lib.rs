//! Triage pipeline for Aikido static-analysis findings on Aiken smart
//! contracts.
//!
//! Takes an `aikido.findings.v1` report, classifies every finding on the
//! true/false-positive spectrum, and emits an `aikido.review.v1` report with
//! a severity-weighted risk score and prioritized recommendations.
//!
//! Three review depths:
//! - `quick`: deterministic heuristics only, no gateway calls.
//! - `standard`: individual gateway reviews for critical/high findings,
//!   batched reviews for the rest, heuristic fallback on any failure.
//! - `deep`: standard plus a correlation pass over still-ambiguous findings.
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use aikido_review::{
//!     build_report, AikidoReport, FindingReviewer, MockLLMProvider, ReviewConfig, ReviewDepth,
//! };
//!
//! # async fn run(report_json: &str) -> anyhow::Result<()> {
//! let report = AikidoReport::from_json(report_json)?;
//! let sources: HashMap<String, String> = HashMap::new();
//!
//! let reviewer = FindingReviewer::new(Arc::new(MockLLMProvider::new()), ReviewConfig::default());
//! let reviews = reviewer
//!     .analyze(&report.findings, &sources, ReviewDepth::Standard)
//!     .await;
//! let review_report = build_report(&report.project, reviews, ReviewDepth::Standard);
//! println!("{}", review_report.executive_summary);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod llm;

pub use crate::core::{
    build_report, compute_risk_score, heuristic_classify, AikidoFinding, AikidoReport,
    Classification, ClassificationSummary, Confidence, CwcInfo, EvidenceInfo, EvidenceLevel,
    FindingLocation, FindingReview, ReliabilityTier, RemediationPriority, ReviewDepth,
    ReviewError, ReviewReport, RiskLevel, Severity,
};
pub use crate::llm::{
    FindingReviewer, LLMError, LLMProvider, LLMRequest, LLMResponse, MockLLMProvider,
    OpenAIProvider, ProviderConfig, ReviewConfig, TokenUsage,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
