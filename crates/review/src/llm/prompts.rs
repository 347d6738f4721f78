//! System prompt and user-prompt builders for the review gateway.
//!
//! Pure functions over the data model; no I/O. The builders control what the
//! model sees: the single-finding prompt carries the most context (snippet,
//! full module when small, sibling findings), the batch prompt is compact,
//! and the correlation prompt replays the whole first pass.

use crate::core::schemas::{AikidoFinding, FindingReview};
use crate::core::truncate;

pub const SYSTEM_PROMPT: &str = r#"You are an expert Cardano smart contract security auditor reviewing findings from Aikido, a static analysis platform for Aiken smart contracts. Your job is to classify each finding as a true positive or false positive, with detailed reasoning.

## Cardano / Aiken Domain Knowledge

- Aiken validators receive (datum, redeemer, script_context); `script_context.transaction` provides inputs, outputs, extra_signatories, mint, validity_range.
- `list.has(ctx.transaction.extra_signatories, pkh)` is the standard authorization pattern. Its presence means the handler is properly guarded.
- Protocol NFTs (minting policy tokens) authenticate UTXOs; checking for a specific policy ID token in inputs is NFT-based auth.
- Datum continuity: `expect InlineDatum(new_datum) = output.datum` followed by field checks is the standard state-transition guard.
- Value preservation uses `value.lovelace_of`, `value.quantity_of`, `value.merge`.
- `interval.is_before` / `interval.is_after` implement time locks; Plutus V3 uses POSIX milliseconds.
- Withdraw-zero delegation is a legitimate multi-validator coordination pattern, NOT a vulnerability.
- `expect Some(x) = optional_value` is idiomatic safe deconstruction; it fails the transaction on mismatch. This IS proper error handling.

## Aikido Evidence Levels (strongest to weakest)

1. Corroborated: multiple analysis lanes agree. Strongest evidence.
2. SimulationConfirmed: UPLC bytecode execution confirmed exploitability.
3. SmtProven: SMT solver proved a satisfying assignment exists.
4. PathVerified: CFG analysis found a concrete execution path.
5. PatternMatch: static AST pattern match only. Most FP-prone.

Evidence interpretation:
- A `witness.rejection_error` means the simulation REJECTED the exploit attempt: the vulnerability may NOT be exploitable, the validator caught it.
- "SMT inconclusive" means the solver could neither prove nor disprove; treat as PatternMatch.
- Detector tiers: stable (low FP rate), beta (moderate), experimental (higher FP rate expected).

## Classification Rules

- Corroborated + definite + critical/high severity: confirmed_tp.
- SimulationConfirmed without rejection_error: likely_tp.
- Simulation with rejection_error: likely_fp (validator caught the exploit).
- PatternMatch + possible confidence: likely_fp (needs proof before treating as real).
- Mitigating pattern in source that static analysis missed: confirmed_fp with reasoning.
- Info severity + possible confidence: usually confirmed_fp or likely_fp.
- Dead code / unused import findings: confirmed_fp unless the code should be active.

## Output Format

For each finding, respond with valid JSON:
{
  "classification": "confirmed_tp|likely_tp|needs_review|likely_fp|confirmed_fp",
  "reviewer_confidence": 0.0-1.0,
  "reasoning": "Detailed explanation of why this classification was chosen",
  "mitigating_patterns": ["pattern1", "pattern2"],
  "exploitation_scenario": "How this could be exploited, or null if FP",
  "remediation_priority": "critical|high|medium|low|informational",
  "evidence_assessment": "Assessment of the evidence quality"
}

Be precise. Reference specific code patterns, line numbers, and function calls in your reasoning."#;

/// Prompt for an individual critical/high finding.
pub fn build_finding_prompt(
    finding: &AikidoFinding,
    index: usize,
    snippet: Option<&str>,
    full_source: Option<&str>,
    siblings: &[&AikidoFinding],
) -> String {
    let mut parts = vec![format!("## Finding #{index}: {}\n", finding.title)];

    parts.push(format!(
        "**Detector**: {} ({})",
        finding.detector, finding.reliability_tier
    ));
    parts.push(format!(
        "**Severity**: {} | **Confidence**: {}",
        finding.severity, finding.confidence
    ));
    parts.push(format!("**Module**: {}", finding.module));

    if let Some(cwc) = &finding.cwc {
        parts.push(format!("**CWC**: {} - {} ({})", cwc.id, cwc.name, cwc.severity));
    }

    parts.push(format!("\n**Description**: {}", finding.description));

    if let Some(suggestion) = &finding.suggestion {
        parts.push(format!("\n**Suggestion**: {suggestion}"));
    }

    if let Some(location) = &finding.location {
        let mut loc = location.path.clone();
        if let Some(line_start) = location.line_start {
            loc.push_str(&format!(":{line_start}"));
            if let Some(line_end) = location.line_end {
                if line_end != line_start {
                    loc.push_str(&format!("-{line_end}"));
                }
            }
        }
        parts.push(format!("\n**Location**: {loc}"));
    }

    if let Some(evidence) = &finding.evidence {
        parts.push(format!("\n**Evidence Level**: {}", evidence.level));
        parts.push(format!("**Method**: {}", evidence.method));
        if let Some(details) = &evidence.details {
            parts.push(format!("**Details**: {details}"));
        }
        if let Some(witness) = &evidence.witness {
            parts.push(format!(
                "**Witness**: {}",
                serde_json::Value::Object(witness.clone())
            ));
        }
        parts.push(format!("**Confidence Boost**: {}", evidence.confidence_boost));
    }

    if !finding.related_findings.is_empty() {
        parts.push(format!(
            "\n**Consolidated from**: {}",
            finding.related_findings.join(", ")
        ));
    }

    if let Some(snippet) = snippet {
        parts.push(format!(
            "\n### Source Code (around finding location)\n```aiken\n{snippet}\n```"
        ));
    }

    if let Some(full_source) = full_source {
        parts.push(format!("\n### Full Module Source\n```aiken\n{full_source}\n```"));
    }

    if !siblings.is_empty() {
        parts.push("\n### Other findings in same module:".to_string());
        for sibling in siblings {
            parts.push(format!(
                "- [{}/{}] {}: {}",
                sibling.severity, sibling.confidence, sibling.detector, sibling.title
            ));
        }
    }

    parts.push("\nClassify this finding. Respond with JSON only.".to_string());
    parts.join("\n")
}

/// Compact prompt covering a batch of medium/low/info findings. Asks for one
/// JSON array entry per finding, in the same order.
pub fn build_batch_prompt(items: &[(usize, &AikidoFinding, Option<String>)]) -> String {
    let mut parts = vec![
        "Review each of the following findings. Respond with a JSON array of review objects.\n"
            .to_string(),
    ];

    for (index, finding, snippet) in items {
        parts.push(format!("### Finding #{index}: {}", finding.title));
        parts.push(format!(
            "Detector: {} ({})",
            finding.detector, finding.reliability_tier
        ));
        parts.push(format!(
            "Severity: {} | Confidence: {}",
            finding.severity, finding.confidence
        ));
        parts.push(format!("Module: {}", finding.module));
        parts.push(format!("Description: {}", finding.description));

        if let Some(evidence) = &finding.evidence {
            parts.push(format!("Evidence: {} ({})", evidence.level, evidence.method));
        }

        if let Some(snippet) = snippet {
            parts.push(format!("```aiken\n{snippet}\n```"));
        }

        parts.push(String::new());
    }

    parts.push(
        "Respond with a JSON array of review objects, one per finding, in order.".to_string(),
    );
    parts.join("\n")
}

/// Second-pass prompt: a synopsis of every finalized review followed by the
/// snippets of the still-ambiguous findings.
pub fn build_correlation_prompt(
    reviews: &[FindingReview],
    targets: &[(usize, Option<String>)],
) -> String {
    let mut parts = vec!["## Review Summary So Far\n".to_string()];

    for review in reviews {
        parts.push(format!(
            "#{} [{}] {} (confidence: {:.2}): {}...",
            review.finding_index,
            review.detector,
            review.classification,
            review.reviewer_confidence,
            truncate(&review.reasoning, 100)
        ));
    }

    parts.push(
        "\n## Correlation Task\n\
         Given the full context of all findings above, re-evaluate the 'needs_review' findings. \
         Consider: Are multiple findings pointing at the same root cause? Does a mitigating \
         pattern found for one finding also apply to others in the same module? \
         Respond with a JSON array of updated review objects for ONLY the needs_review findings, \
         in the order listed below."
            .to_string(),
    );

    for (index, snippet) in targets {
        match snippet {
            Some(snippet) => {
                parts.push(format!("\n### Finding #{index}\n```aiken\n{snippet}\n```"));
            }
            None => parts.push(format!("\n### Finding #{index} (no source available)")),
        }
    }

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schemas::{Classification, EvidenceInfo, EvidenceLevel, RemediationPriority};
    use crate::core::severity::{Confidence, ReliabilityTier, Severity};

    fn finding() -> AikidoFinding {
        AikidoFinding {
            detector: "unrestricted-minting".to_string(),
            reliability_tier: ReliabilityTier::Beta,
            severity: Severity::Critical,
            confidence: Confidence::Definite,
            title: "Minting policy allows arbitrary amounts".to_string(),
            description: "The policy does not bound the minted quantity.".to_string(),
            module: "validators/mint".to_string(),
            cwc: None,
            location: None,
            suggestion: Some("Bound the minted amount.".to_string()),
            related_findings: vec!["f-12".to_string()],
            evidence: Some(EvidenceInfo {
                level: EvidenceLevel::SmtProven,
                method: "smt".to_string(),
                details: None,
                witness: None,
                confidence_boost: 0.4,
            }),
        }
    }

    #[test]
    fn test_finding_prompt_includes_context() {
        let sibling = finding();
        let prompt = build_finding_prompt(
            &finding(),
            3,
            Some("> 10 | mint code"),
            Some("full source"),
            &[&sibling],
        );
        assert!(prompt.contains("## Finding #3"));
        assert!(prompt.contains("unrestricted-minting"));
        assert!(prompt.contains("**Evidence Level**: SmtProven"));
        assert!(prompt.contains("**Suggestion**: Bound the minted amount."));
        assert!(prompt.contains("**Consolidated from**: f-12"));
        assert!(prompt.contains("Source Code (around finding location)"));
        assert!(prompt.contains("Full Module Source"));
        assert!(prompt.contains("Other findings in same module"));
        assert!(prompt.contains("Respond with JSON only."));
    }

    #[test]
    fn test_batch_prompt_enumerates_in_order() {
        let f = finding();
        let items = vec![(2, &f, None), (5, &f, Some("snippet".to_string()))];
        let prompt = build_batch_prompt(&items);
        let pos2 = prompt.find("### Finding #2").unwrap();
        let pos5 = prompt.find("### Finding #5").unwrap();
        assert!(pos2 < pos5);
        assert!(prompt.contains("JSON array"));
    }

    #[test]
    fn test_correlation_prompt_synopsis_and_targets() {
        let review = FindingReview {
            finding_index: 1,
            detector: "d".to_string(),
            title: "t".to_string(),
            original_severity: Severity::Medium,
            original_confidence: Confidence::Likely,
            classification: Classification::NeedsReview,
            reviewer_confidence: 0.5,
            reasoning: "Ambiguous.".to_string(),
            mitigating_patterns: vec![],
            exploitation_scenario: None,
            remediation_priority: RemediationPriority::Medium,
            evidence_assessment: None,
        };
        let prompt = build_correlation_prompt(&[review], &[(1, Some("code".to_string()))]);
        assert!(prompt.contains("Review Summary So Far"));
        assert!(prompt.contains("#1 [d] needs_review (confidence: 0.50)"));
        assert!(prompt.contains("Correlation Task"));
        assert!(prompt.contains("### Finding #1"));
    }
}
