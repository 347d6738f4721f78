//! Source snippet and module extraction for prompt construction.
//!
//! Findings carry absolute paths from the analysis sandbox while the caller
//! supplies sources keyed by repo-relative paths, so matching anchors on the
//! `validators/` or `lib/` segment before falling back to suffix and filename
//! matches.

use std::collections::HashMap;

use crate::core::schemas::AikidoFinding;

pub const CONTEXT_LINES: usize = 8;
pub const MAX_MODULE_LINES: usize = 200;

/// Strip the sandbox prefix, e.g. `/tmp/strike/forwards/validators/x.ak`
/// becomes `validators/x.ak`.
pub fn normalize_path(finding_path: &str) -> String {
    let parts: Vec<&str> = finding_path.split('/').collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == "validators" || *part == "lib" {
            return parts[i..].join("/");
        }
    }
    parts.last().copied().unwrap_or(finding_path).to_string()
}

/// Find the source-file key a finding path refers to. Tries exact match,
/// normalized match, suffix match, then filename match.
pub fn match_source_file<'a>(
    finding_path: &str,
    source_files: &'a HashMap<String, String>,
) -> Option<&'a str> {
    if source_files.contains_key(finding_path) {
        return source_files.get_key_value(finding_path).map(|(k, _)| k.as_str());
    }

    let normalized = normalize_path(finding_path);
    if let Some((key, _)) = source_files.get_key_value(&normalized) {
        return Some(key.as_str());
    }

    for key in source_files.keys() {
        if key.ends_with(&normalized) || normalized.ends_with(key.as_str()) {
            return Some(key.as_str());
        }
    }

    let filename = finding_path.rsplit('/').next().unwrap_or(finding_path);
    for key in source_files.keys() {
        if key.ends_with(filename) {
            return Some(key.as_str());
        }
    }

    None
}

/// Extract a snippet with line numbers, marking the finding lines with `>`.
pub fn extract_snippet(
    source: &str,
    line_start: usize,
    line_end: Option<usize>,
    context: usize,
) -> String {
    let lines: Vec<&str> = source.lines().collect();
    if lines.is_empty() || line_start < 1 {
        return String::new();
    }

    let end = line_end.unwrap_or(line_start);
    let start_idx = line_start.saturating_sub(1).saturating_sub(context);
    let end_idx = (end + context).min(lines.len());

    let mut result = Vec::with_capacity(end_idx - start_idx);
    for (i, line) in lines.iter().enumerate().take(end_idx).skip(start_idx) {
        let line_num = i + 1;
        let marker = if line_start <= line_num && line_num <= end { ">" } else { " " };
        result.push(format!("{marker} {line_num:4} | {line}"));
    }

    result.join("\n")
}

/// Snippet around a finding's location, or `None` without a usable location.
pub fn finding_snippet(
    finding: &AikidoFinding,
    source_files: &HashMap<String, String>,
    context: usize,
) -> Option<String> {
    let location = finding.location.as_ref()?;
    let key = match_source_file(&location.path, source_files)?;
    let source = source_files.get(key)?;
    let line_start = location.line_start?;
    Some(extract_snippet(source, line_start, location.line_end, context))
}

/// Full module source if it is short enough to put in a prompt.
pub fn full_module_source(
    finding: &AikidoFinding,
    source_files: &HashMap<String, String>,
    max_lines: usize,
) -> Option<String> {
    let location = finding.location.as_ref()?;
    let key = match_source_file(&location.path, source_files)?;
    let source = source_files.get(key)?;
    if source.lines().count() > max_lines {
        return None;
    }
    Some(source.clone())
}
