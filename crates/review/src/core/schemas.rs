//! Input (`aikido.findings.v1`) and output (`aikido.review.v1`) data models.
//!
//! Everything here is a plain value type. Findings are identified by their
//! positional index in the report, and that index must survive the whole
//! pipeline unchanged; reviews carry it as a back-reference.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::error::ReviewError;
use crate::core::severity::{Confidence, ReliabilityTier, Severity};

pub const FINDINGS_SCHEMA: &str = "aikido.findings.v1";
pub const REVIEW_SCHEMA: &str = "aikido.review.v1";

/// Evidence strength ladder, weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EvidenceLevel {
    PatternMatch,
    PathVerified,
    SmtProven,
    SimulationConfirmed,
    Corroborated,
}

impl fmt::Display for EvidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PatternMatch => "PatternMatch",
            Self::PathVerified => "PathVerified",
            Self::SmtProven => "SmtProven",
            Self::SimulationConfirmed => "SimulationConfirmed",
            Self::Corroborated => "Corroborated",
        };
        write!(f, "{s}")
    }
}

/// Proof artifact attached to a finding by one of the analysis lanes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceInfo {
    pub level: EvidenceLevel,
    pub method: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// Free-form witness data from the lane. A `rejection_error` key means the
    /// simulation lane tried the exploit and the validator rejected it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness: Option<serde_json::Map<String, serde_json::Value>>,

    #[serde(default)]
    pub confidence_boost: f64,
}

impl EvidenceInfo {
    /// Non-empty `rejection_error` recorded by the simulation lane, if any.
    pub fn rejection_error(&self) -> Option<&str> {
        self.witness
            .as_ref()?
            .get("rejection_error")?
            .as_str()
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingLocation {
    pub path: String,
    pub byte_start: u64,
    pub byte_end: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_start: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_start: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_end: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_end: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CwcInfo {
    pub id: String,
    pub name: String,
    pub severity: String,
}

/// One reported potential defect from the Aikido static analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AikidoFinding {
    pub detector: String,

    #[serde(default)]
    pub reliability_tier: ReliabilityTier,

    pub severity: Severity,
    pub confidence: Confidence,
    pub title: String,
    pub description: String,
    pub module: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwc: Option<CwcInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<FindingLocation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    #[serde(default)]
    pub related_findings: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<EvidenceInfo>,
}

/// Top-level findings report consumed by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AikidoReport {
    pub schema_version: String,
    pub project: String,

    #[serde(default)]
    pub version: String,

    pub findings: Vec<AikidoFinding>,
    pub total: usize,
}

impl AikidoReport {
    /// Parse and validate a findings report. Malformed input is the one
    /// failure surfaced to callers; everything downstream degrades instead.
    pub fn from_json(text: &str) -> Result<Self, ReviewError> {
        let report: Self =
            serde_json::from_str(text).map_err(|e| ReviewError::InvalidReport(e.to_string()))?;
        if report.schema_version != FINDINGS_SCHEMA {
            return Err(ReviewError::UnsupportedSchema(report.schema_version));
        }
        Ok(report)
    }
}

/// Final true/false-positive-spectrum verdict for a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    ConfirmedTp,
    LikelyTp,
    NeedsReview,
    LikelyFp,
    ConfirmedFp,
}

impl Classification {
    /// Fraction of the severity weight this verdict feeds into the risk score.
    pub fn risk_contribution(&self) -> f64 {
        match self {
            Self::ConfirmedTp => 1.0,
            Self::LikelyTp => 0.7,
            Self::NeedsReview => 0.4,
            Self::LikelyFp | Self::ConfirmedFp => 0.0,
        }
    }

    pub fn is_true_positive_leaning(&self) -> bool {
        matches!(self, Self::ConfirmedTp | Self::LikelyTp)
    }

    pub fn is_false_positive_leaning(&self) -> bool {
        matches!(self, Self::LikelyFp | Self::ConfirmedFp)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ConfirmedTp => "confirmed_tp",
            Self::LikelyTp => "likely_tp",
            Self::NeedsReview => "needs_review",
            Self::LikelyFp => "likely_fp",
            Self::ConfirmedFp => "confirmed_fp",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemediationPriority {
    Critical,
    High,
    Medium,
    Low,
    Informational,
}

impl RemediationPriority {
    /// Sort rank, most urgent first.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
            Self::Informational => 4,
        }
    }
}

impl fmt::Display for RemediationPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Informational => "informational",
        };
        write!(f, "{s}")
    }
}

impl From<Severity> for RemediationPriority {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Critical => Self::Critical,
            Severity::High => Self::High,
            Severity::Medium => Self::Medium,
            Severity::Low => Self::Low,
            Severity::Info => Self::Informational,
        }
    }
}

/// One reviewed finding. Created once per finding by either the heuristic
/// path or the orchestrator; the correlation pass may replace it exactly once
/// more, and only when the first pass left it at `needs_review`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingReview {
    pub finding_index: usize,
    pub detector: String,
    pub title: String,
    pub original_severity: Severity,
    pub original_confidence: Confidence,
    pub classification: Classification,
    pub reviewer_confidence: f64,
    pub reasoning: String,

    #[serde(default)]
    pub mitigating_patterns: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exploitation_scenario: Option<String>,

    pub remediation_priority: RemediationPriority,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_assessment: Option<String>,
}

/// Per-classification tallies, always recomputed from the full review list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationSummary {
    pub confirmed_tp: u32,
    pub likely_tp: u32,
    pub needs_review: u32,
    pub likely_fp: u32,
    pub confirmed_fp: u32,
}

impl ClassificationSummary {
    pub fn record(&mut self, classification: Classification) {
        match classification {
            Classification::ConfirmedTp => self.confirmed_tp += 1,
            Classification::LikelyTp => self.likely_tp += 1,
            Classification::NeedsReview => self.needs_review += 1,
            Classification::LikelyFp => self.likely_fp += 1,
            Classification::ConfirmedFp => self.confirmed_fp += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
    Minimal,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 8.0 {
            Self::Critical
        } else if score >= 6.0 {
            Self::High
        } else if score >= 4.0 {
            Self::Medium
        } else if score >= 2.0 {
            Self::Low
        } else {
            Self::Minimal
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Minimal => "minimal",
        };
        write!(f, "{s}")
    }
}

/// How much external reasoning the pipeline applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDepth {
    /// Heuristics only, no gateway calls.
    Quick,
    /// Individual calls for critical/high findings, batched calls for the rest.
    #[default]
    Standard,
    /// Standard plus a second correlation pass over ambiguous reviews.
    Deep,
}

impl fmt::Display for ReviewDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quick => write!(f, "quick"),
            Self::Standard => write!(f, "standard"),
            Self::Deep => write!(f, "deep"),
        }
    }
}

impl FromStr for ReviewDepth {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quick" => Ok(Self::Quick),
            "standard" => Ok(Self::Standard),
            "deep" => Ok(Self::Deep),
            other => Err(ReviewError::InvalidDepth(other.to_string())),
        }
    }
}

/// Final `aikido.review.v1` report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewReport {
    pub schema_version: String,
    pub project: String,
    pub review_depth: ReviewDepth,
    pub total_findings: usize,
    pub classification_summary: ClassificationSummary,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub executive_summary: String,
    pub finding_reviews: Vec<FindingReview>,
    pub recommendations: Vec<String>,
}
