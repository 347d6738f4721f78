//! Deterministic heuristic classifier.
//!
//! A fixed-order cascade of named rules, each a guard plus an effect on the
//! draft verdict. Later rules may override earlier ones, and two rules fire
//! only while the draft is still at its untouched `needs_review` default.
//! The order is policy, not an accident: simulation rejection always beats
//! corroborated evidence, and the experimental-tier rule runs last so every
//! evidence rule gets a chance first. Keep the list order intact.

use crate::core::schemas::{AikidoFinding, Classification, EvidenceLevel, FindingReview};
use crate::core::severity::{Confidence, ReliabilityTier, Severity};
use crate::core::truncate;

/// Detectors that are almost always false positives at pattern-match level.
pub const HIGH_FP_DETECTORS: &[&str] = &[
    "missing-min-ada-check",
    "unused-import",
    "dead-code-path",
];

/// Mutable verdict state threaded through the cascade.
#[derive(Debug)]
pub(crate) struct Draft {
    pub classification: Classification,
    pub confidence: f64,
    pub reasoning: Vec<String>,
    pub mitigating: Vec<String>,
}

impl Draft {
    fn new() -> Self {
        Self {
            classification: Classification::NeedsReview,
            confidence: 0.5,
            reasoning: Vec::new(),
            mitigating: Vec::new(),
        }
    }

}

/// One step of the cascade. `apply` returns whether the rule fired.
pub(crate) struct HeuristicRule {
    pub name: &'static str,
    apply: fn(&AikidoFinding, &mut Draft) -> bool,
}

impl HeuristicRule {
    pub(crate) fn apply(&self, finding: &AikidoFinding, draft: &mut Draft) -> bool {
        (self.apply)(finding, draft)
    }
}

/// The cascade, in firing order.
pub(crate) const RULES: &[HeuristicRule] = &[
    HeuristicRule { name: "info-severity", apply: info_severity },
    HeuristicRule { name: "high-fp-detector", apply: high_fp_detector },
    HeuristicRule { name: "corroborated-definite", apply: corroborated_definite },
    HeuristicRule { name: "simulation-rejection", apply: simulation_rejection },
    HeuristicRule { name: "weak-pattern-match", apply: weak_pattern_match },
    HeuristicRule { name: "smt-inconclusive", apply: smt_inconclusive },
    HeuristicRule { name: "experimental-tier", apply: experimental_tier },
];

fn info_severity(finding: &AikidoFinding, draft: &mut Draft) -> bool {
    if finding.severity != Severity::Info {
        return false;
    }
    draft.classification = Classification::LikelyFp;
    draft.confidence = 0.70;
    draft
        .reasoning
        .push("Info severity findings are typically informational, not exploitable.".to_string());
    true
}

fn high_fp_detector(finding: &AikidoFinding, draft: &mut Draft) -> bool {
    if !HIGH_FP_DETECTORS.contains(&finding.detector.as_str()) {
        return false;
    }
    draft.classification = Classification::ConfirmedFp;
    draft.confidence = 0.85;
    draft.reasoning.push(format!(
        "Detector '{}' is a known high-FP pattern.",
        finding.detector
    ));
    if finding.detector == "missing-min-ada-check" {
        draft
            .mitigating
            .push("Cardano ledger enforces minimum ADA at protocol level".to_string());
    }
    true
}

fn corroborated_definite(finding: &AikidoFinding, draft: &mut Draft) -> bool {
    let Some(evidence) = &finding.evidence else {
        return false;
    };
    if evidence.level != EvidenceLevel::Corroborated
        || finding.confidence != Confidence::Definite
        || !finding.severity.is_high_priority()
    {
        return false;
    }
    draft.classification = Classification::ConfirmedTp;
    draft.confidence = 0.90;
    draft.reasoning.push(
        "Corroborated evidence with definite confidence: multiple analysis lanes agree."
            .to_string(),
    );
    true
}

// Counter-evidence: overrides anything set above, including corroborated-definite.
fn simulation_rejection(finding: &AikidoFinding, draft: &mut Draft) -> bool {
    let Some(rejection) = finding.evidence.as_ref().and_then(|e| e.rejection_error()) else {
        return false;
    };
    draft.classification = Classification::LikelyFp;
    draft.confidence = 0.75;
    draft.reasoning.push(format!(
        "Simulation rejected the exploit: {}. The validator appears to catch this scenario.",
        truncate(rejection, 120)
    ));
    draft
        .mitigating
        .push("Transaction simulation rejected exploit attempt".to_string());
    true
}

fn weak_pattern_match(finding: &AikidoFinding, draft: &mut Draft) -> bool {
    let Some(evidence) = &finding.evidence else {
        return false;
    };
    if evidence.level != EvidenceLevel::PatternMatch
        || finding.confidence != Confidence::Possible
        || draft.classification != Classification::NeedsReview
    {
        return false;
    }
    draft.classification = Classification::LikelyFp;
    draft.confidence = 0.60;
    draft
        .reasoning
        .push("PatternMatch with 'possible' confidence is the weakest evidence tier.".to_string());
    true
}

fn smt_inconclusive(finding: &AikidoFinding, draft: &mut Draft) -> bool {
    let Some(details) = finding.evidence.as_ref().and_then(|e| e.details.as_deref()) else {
        return false;
    };
    if !details.to_lowercase().contains("inconclusive") {
        return false;
    }
    draft
        .reasoning
        .push("SMT solver was inconclusive: cannot prove or disprove.".to_string());
    true
}

fn experimental_tier(finding: &AikidoFinding, draft: &mut Draft) -> bool {
    if finding.reliability_tier != ReliabilityTier::Experimental
        || draft.classification != Classification::NeedsReview
    {
        return false;
    }
    draft.classification = Classification::LikelyFp;
    draft.confidence = 0.55;
    draft
        .reasoning
        .push("Experimental detector tier has higher expected FP rate.".to_string());
    true
}

/// Classify one finding with heuristics only. Pure, infallible, no I/O.
pub fn heuristic_classify(finding: &AikidoFinding, index: usize) -> FindingReview {
    let mut draft = Draft::new();

    for rule in RULES {
        rule.apply(finding, &mut draft);
    }

    if draft.reasoning.is_empty() {
        draft.reasoning.push(format!(
            "Heuristic classification based on {} severity, {} confidence, {} tier.",
            finding.severity, finding.confidence, finding.reliability_tier
        ));
    }

    FindingReview {
        finding_index: index,
        detector: finding.detector.clone(),
        title: finding.title.clone(),
        original_severity: finding.severity,
        original_confidence: finding.confidence,
        classification: draft.classification,
        reviewer_confidence: draft.confidence,
        reasoning: draft.reasoning.join(" "),
        mitigating_patterns: draft.mitigating,
        exploitation_scenario: None,
        remediation_priority: finding.severity.into(),
        evidence_assessment: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schemas::{EvidenceInfo, RemediationPriority};

    fn make_finding(severity: Severity, confidence: Confidence) -> AikidoFinding {
        AikidoFinding {
            detector: "test-detector".to_string(),
            reliability_tier: ReliabilityTier::Stable,
            severity,
            confidence,
            title: "Test finding".to_string(),
            description: "Test description".to_string(),
            module: "validators/test".to_string(),
            cwc: None,
            location: None,
            suggestion: None,
            related_findings: vec![],
            evidence: None,
        }
    }

    fn corroborated_evidence() -> EvidenceInfo {
        EvidenceInfo {
            level: EvidenceLevel::Corroborated,
            method: "smt+simulation".to_string(),
            details: None,
            witness: None,
            confidence_boost: 1.0,
        }
    }

    #[test]
    fn test_info_severity_is_likely_fp() {
        let finding = make_finding(Severity::Info, Confidence::Possible);
        let review = heuristic_classify(&finding, 0);
        assert_eq!(review.classification, Classification::LikelyFp);
        assert_eq!(review.reviewer_confidence, 0.70);
    }

    #[test]
    fn test_high_fp_detectors_are_confirmed_fp() {
        for detector in HIGH_FP_DETECTORS {
            let mut finding = make_finding(Severity::Info, Confidence::Possible);
            finding.detector = detector.to_string();
            let review = heuristic_classify(&finding, 0);
            assert_eq!(review.classification, Classification::ConfirmedFp);
            assert_eq!(review.reviewer_confidence, 0.85);
            assert!(review.reasoning.contains(detector));
        }
    }

    #[test]
    fn test_min_ada_detector_gets_mitigating_note() {
        let mut finding = make_finding(Severity::Low, Confidence::Possible);
        finding.detector = "missing-min-ada-check".to_string();
        let review = heuristic_classify(&finding, 0);
        assert_eq!(review.classification, Classification::ConfirmedFp);
        assert_eq!(
            review.mitigating_patterns,
            vec!["Cardano ledger enforces minimum ADA at protocol level".to_string()]
        );
    }

    #[test]
    fn test_high_fp_detector_ignores_weak_evidence_and_severity() {
        let mut finding = make_finding(Severity::Critical, Confidence::Possible);
        finding.detector = "unused-import".to_string();
        finding.evidence = Some(EvidenceInfo {
            level: EvidenceLevel::PatternMatch,
            method: "static-pattern".to_string(),
            details: None,
            witness: None,
            confidence_boost: 0.0,
        });
        let review = heuristic_classify(&finding, 0);
        // weak-pattern-match only fires on an untouched draft, so the
        // detector verdict stands.
        assert_eq!(review.classification, Classification::ConfirmedFp);
        assert_eq!(review.reviewer_confidence, 0.85);
    }

    #[test]
    fn test_corroborated_definite_critical_is_confirmed_tp() {
        let mut finding = make_finding(Severity::Critical, Confidence::Definite);
        finding.evidence = Some(corroborated_evidence());
        let review = heuristic_classify(&finding, 0);
        assert_eq!(review.classification, Classification::ConfirmedTp);
        assert!(review.reviewer_confidence >= 0.85);
    }

    #[test]
    fn test_corroborated_definite_medium_stays_default() {
        let mut finding = make_finding(Severity::Medium, Confidence::Definite);
        finding.evidence = Some(corroborated_evidence());
        let review = heuristic_classify(&finding, 0);
        assert_eq!(review.classification, Classification::NeedsReview);
        assert_eq!(review.reviewer_confidence, 0.5);
    }

    #[test]
    fn test_simulation_rejection_overrides_corroborated() {
        let mut finding = make_finding(Severity::Critical, Confidence::Definite);
        let mut evidence = corroborated_evidence();
        let mut witness = serde_json::Map::new();
        witness.insert(
            "rejection_error".to_string(),
            serde_json::json!("UPLC evaluation failed: DeserialisationError"),
        );
        evidence.witness = Some(witness);
        finding.evidence = Some(evidence);

        let review = heuristic_classify(&finding, 0);
        assert_eq!(review.classification, Classification::LikelyFp);
        assert_eq!(review.reviewer_confidence, 0.75);
        assert!(review.reasoning.to_lowercase().contains("rejected"));
        assert!(review
            .mitigating_patterns
            .contains(&"Transaction simulation rejected exploit attempt".to_string()));
    }

    #[test]
    fn test_pattern_match_possible_is_likely_fp() {
        let mut finding = make_finding(Severity::Medium, Confidence::Possible);
        finding.evidence = Some(EvidenceInfo {
            level: EvidenceLevel::PatternMatch,
            method: "static-pattern".to_string(),
            details: None,
            witness: None,
            confidence_boost: 0.0,
        });
        let review = heuristic_classify(&finding, 0);
        assert_eq!(review.classification, Classification::LikelyFp);
        assert_eq!(review.reviewer_confidence, 0.60);
    }

    #[test]
    fn test_weak_pattern_match_does_not_downgrade_info_rule() {
        // info-severity already moved the draft off needs_review, so the
        // weak-pattern-match rule must not fire and reset confidence to 0.60.
        let mut finding = make_finding(Severity::Info, Confidence::Possible);
        finding.evidence = Some(EvidenceInfo {
            level: EvidenceLevel::PatternMatch,
            method: "static-pattern".to_string(),
            details: None,
            witness: None,
            confidence_boost: 0.0,
        });
        let review = heuristic_classify(&finding, 0);
        assert_eq!(review.classification, Classification::LikelyFp);
        assert_eq!(review.reviewer_confidence, 0.70);
    }

    #[test]
    fn test_smt_inconclusive_appends_note_without_reclassifying() {
        let mut finding = make_finding(Severity::High, Confidence::Likely);
        finding.evidence = Some(EvidenceInfo {
            level: EvidenceLevel::SmtProven,
            method: "smt".to_string(),
            details: Some("Solver returned INCONCLUSIVE after 30s".to_string()),
            witness: None,
            confidence_boost: 0.2,
        });
        let review = heuristic_classify(&finding, 0);
        assert_eq!(review.classification, Classification::NeedsReview);
        assert!(review.reasoning.contains("inconclusive"));
    }

    #[test]
    fn test_experimental_tier_fires_only_on_untouched_default() {
        let mut finding = make_finding(Severity::Medium, Confidence::Likely);
        finding.reliability_tier = ReliabilityTier::Experimental;
        let review = heuristic_classify(&finding, 0);
        assert_eq!(review.classification, Classification::LikelyFp);
        assert_eq!(review.reviewer_confidence, 0.55);

        // Evidence already promoted this one; the tier rule must stay silent.
        let mut finding = make_finding(Severity::Critical, Confidence::Definite);
        finding.reliability_tier = ReliabilityTier::Experimental;
        finding.evidence = Some(corroborated_evidence());
        let review = heuristic_classify(&finding, 0);
        assert_eq!(review.classification, Classification::ConfirmedTp);
    }

    #[test]
    fn test_default_reasoning_when_no_rule_fires() {
        let finding = make_finding(Severity::High, Confidence::Likely);
        let review = heuristic_classify(&finding, 3);
        assert_eq!(review.classification, Classification::NeedsReview);
        assert_eq!(review.reviewer_confidence, 0.5);
        assert_eq!(review.finding_index, 3);
        assert!(review.reasoning.contains("high severity"));
    }

    #[test]
    fn test_priority_tracks_severity_not_classification() {
        let mut finding = make_finding(Severity::Critical, Confidence::Definite);
        let mut evidence = corroborated_evidence();
        let mut witness = serde_json::Map::new();
        witness.insert("rejection_error".to_string(), serde_json::json!("rejected"));
        evidence.witness = Some(witness);
        finding.evidence = Some(evidence);

        let review = heuristic_classify(&finding, 0);
        // Classified likely_fp, but priority still mirrors the critical severity.
        assert_eq!(review.remediation_priority, RemediationPriority::Critical);
    }

    #[test]
    fn test_rule_order_is_fixed() {
        let names: Vec<&str> = RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "info-severity",
                "high-fp-detector",
                "corroborated-definite",
                "simulation-rejection",
                "weak-pattern-match",
                "smt-inconclusive",
                "experimental-tier",
            ]
        );
    }
}
