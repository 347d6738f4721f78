use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity assigned by the upstream Aikido analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
            Self::Info => write!(f, "info"),
        }
    }
}

impl Severity {
    /// Weight used by the risk-score denominator and numerator.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Critical => 10.0,
            Self::High => 7.0,
            Self::Medium => 4.0,
            Self::Low => 2.0,
            Self::Info => 1.0,
        }
    }

    /// Critical and high findings get individual review calls.
    pub fn is_high_priority(&self) -> bool {
        matches!(self, Self::Critical | Self::High)
    }
}

/// Analyzer confidence in the finding, weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Possible,
    Likely,
    Definite,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Definite => write!(f, "definite"),
            Self::Likely => write!(f, "likely"),
            Self::Possible => write!(f, "possible"),
        }
    }
}

/// How battle-tested the detector that produced a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReliabilityTier {
    #[default]
    Stable,
    Beta,
    Experimental,
}

impl fmt::Display for ReliabilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stable => write!(f, "stable"),
            Self::Beta => write!(f, "beta"),
            Self::Experimental => write!(f, "experimental"),
        }
    }
}
