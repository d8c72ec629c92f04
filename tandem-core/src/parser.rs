//! Defensive parsing of raw collaborator output into typed records.
//!
//! Model output is untrusted: it may wrap JSON in prose, emit half a schema,
//! or return garbage. Every parser here is two-stage: substring extraction
//! first, then per-element schema validation with independent success or
//! failure. Nothing in this module returns an error; malformed input
//! degrades to an empty or fallback result.

use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use crate::types::{AnnotationKind, AgentRole, CodeAnnotation, GenerationResult, ReviewFinding};

/// Confidence assigned when the writer does not self-report one.
const DEFAULT_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnnotation {
    #[serde(rename = "type")]
    kind: Option<AnnotationKind>,
    message: Option<String>,
    suggestion: Option<String>,
    line_start: Option<f64>,
    line_end: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawGeneration {
    code: Option<String>,
    explanation: Option<String>,
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawFinding {
    severity: Option<crate::types::IssueSeverity>,
    category: Option<String>,
    message: Option<String>,
    fix: Option<String>,
}

/// Parse raw analysis output into validated annotations.
///
/// Extracts the first top-level array-shaped substring (first `[` to last
/// `]`). Elements must be objects with one of the four annotation kinds, a
/// non-empty `message`, and a numeric `lineStart > 0`; anything else is
/// dropped silently. `lineEnd` is normalized to at least `lineStart`. Each
/// surviving element gets a synthetic id unique within this call.
///
/// `file_path` is left empty; the caller stamps it.
pub fn parse_annotations(raw: &str, agent: AgentRole) -> Vec<CodeAnnotation> {
    let Some(slice) = extract_array(raw) else {
        debug!(agent = %agent, "no array found in analysis output");
        return Vec::new();
    };
    let Ok(elements) = serde_json::from_str::<Vec<serde_json::Value>>(slice) else {
        debug!(agent = %agent, "analysis output is not a well-formed array");
        return Vec::new();
    };

    let total = elements.len();
    let stamp = Utc::now();
    let millis = stamp.timestamp_millis();

    let annotations: Vec<CodeAnnotation> = elements
        .into_iter()
        .filter_map(|element| {
            let record: RawAnnotation = serde_json::from_value(element).ok()?;
            let kind = record.kind?;
            let message = record.message.filter(|m| !m.is_empty())?;
            let start = record.line_start.filter(|n| *n > 0.0)?;
            let line_start = start.ceil() as u32;
            let line_end = match record.line_end {
                Some(end) if end >= start => end.ceil() as u32,
                _ => line_start,
            };
            Some((kind, message, record.suggestion, line_start, line_end))
        })
        .enumerate()
        .map(
            |(index, (kind, message, suggestion, line_start, line_end))| CodeAnnotation {
                id: format!("{}-{}-{}", agent, millis, index),
                kind,
                message,
                suggestion,
                agent: agent.to_string(),
                line_start,
                line_end,
                file_path: String::new(),
                created_at: stamp,
            },
        )
        .collect();

    if annotations.len() < total {
        debug!(
            agent = %agent,
            dropped = total - annotations.len(),
            kept = annotations.len(),
            "dropped malformed annotation elements"
        );
    }
    annotations
}

/// Parse raw generation output into a [`GenerationResult`].
///
/// Tries, in order: an embedded JSON object carrying `code` (plus optional
/// `explanation` and `confidence`), a fenced code block, and finally the
/// whole trimmed text as code. Confidence is clamped to `[0, 1]` and
/// defaults to 0.5 when absent.
pub fn parse_generation(raw: &str) -> GenerationResult {
    if let Some(block) = extract_object(raw) {
        if let Ok(parsed) = serde_json::from_str::<RawGeneration>(block) {
            if let Some(code) = parsed.code.filter(|c| !c.trim().is_empty()) {
                return GenerationResult {
                    code,
                    explanation: parsed.explanation.filter(|e| !e.trim().is_empty()),
                    confidence: clamp_confidence(parsed.confidence),
                };
            }
        }
    }

    if let Some((code, remainder)) = extract_fenced_code(raw) {
        let explanation = Some(remainder).filter(|r| !r.is_empty());
        return GenerationResult {
            code,
            explanation,
            confidence: DEFAULT_CONFIDENCE,
        };
    }

    GenerationResult {
        code: raw.trim().to_string(),
        explanation: None,
        confidence: DEFAULT_CONFIDENCE,
    }
}

/// Parse raw review output into native findings.
///
/// Same array extraction as [`parse_annotations`]; elements must carry a
/// known severity and a non-empty message. Category stays free-form here;
/// remapping onto the canonical taxonomy happens when building a
/// [`ReviewResult`](crate::types::ReviewResult).
pub fn parse_findings(raw: &str) -> Vec<ReviewFinding> {
    let Some(slice) = extract_array(raw) else {
        return Vec::new();
    };
    let Ok(elements) = serde_json::from_str::<Vec<serde_json::Value>>(slice) else {
        return Vec::new();
    };

    elements
        .into_iter()
        .filter_map(|element| {
            let record: RawFinding = serde_json::from_value(element).ok()?;
            let severity = record.severity?;
            let message = record.message.filter(|m| !m.is_empty())?;
            Some(ReviewFinding {
                severity,
                category: record.category.unwrap_or_default(),
                message,
                fix: record.fix,
            })
        })
        .collect()
}

/// First `[` to last `]`, or None.
fn extract_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

/// A ```json fenced block, else first `{` to last `}`.
fn extract_object(text: &str) -> Option<&str> {
    if let Some(fence) = text.find("```json") {
        let body_start = fence + "```json".len();
        if let Some(len) = text[body_start..].find("```") {
            return Some(text[body_start..body_start + len].trim());
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Contents of the first fenced code block, plus the surrounding prose.
fn extract_fenced_code(text: &str) -> Option<(String, String)> {
    let open = text.find("```")?;
    let after_open = &text[open + 3..];
    // Skip the language tag line.
    let body_start = after_open.find('\n')? + 1;
    let body = &after_open[body_start..];
    let close = body.find("```")?;

    let code = body[..close].trim_end().to_string();
    if code.trim().is_empty() {
        return None;
    }
    let remainder = format!(
        "{} {}",
        text[..open].trim(),
        body[close + 3..].trim()
    )
    .trim()
    .to_string();
    Some((code, remainder))
}

fn clamp_confidence(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v.clamp(0.0, 1.0),
        _ => DEFAULT_CONFIDENCE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotations_extracted_from_surrounding_text() {
        let raw = r#"Here is what I found:
[
  {"type": "bug", "message": "off-by-one in loop bound", "lineStart": 12, "lineEnd": 14},
  {"type": "style", "message": "shadowed variable", "lineStart": 3}
]
Let me know if you want more detail."#;

        let annotations = parse_annotations(raw, AgentRole::Reviewer);
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations[0].kind, AnnotationKind::Bug);
        assert_eq!(annotations[0].line_start, 12);
        assert_eq!(annotations[0].line_end, 14);
        // lineEnd defaults to lineStart when absent.
        assert_eq!(annotations[1].line_end, 3);
        assert_eq!(annotations[1].agent, "reviewer");
    }

    #[test]
    fn test_annotations_invalid_elements_dropped() {
        let raw = r#"[
  {"type": "bug", "message": "valid", "lineStart": 1},
  {"type": "banana", "message": "unknown kind", "lineStart": 1},
  {"type": "bug", "lineStart": 2},
  {"type": "bug", "message": "", "lineStart": 2},
  {"type": "bug", "message": "bad line", "lineStart": 0},
  {"type": "bug", "message": "bad line", "lineStart": -3},
  {"type": "bug", "message": "string line", "lineStart": "7"},
  "not an object",
  {"type": "refactor", "message": "also valid", "lineStart": 9, "lineEnd": 4}
]"#;

        let annotations = parse_annotations(raw, AgentRole::Writer);
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations[0].message, "valid");
        // lineEnd below lineStart is raised to lineStart.
        assert_eq!(annotations[1].line_start, 9);
        assert_eq!(annotations[1].line_end, 9);
    }

    #[test]
    fn test_annotations_no_array_returns_empty() {
        assert!(parse_annotations("no array here", AgentRole::Writer).is_empty());
        assert!(parse_annotations("", AgentRole::Writer).is_empty());
        assert!(parse_annotations("[ not json ]", AgentRole::Writer).is_empty());
        assert!(parse_annotations("] backwards [", AgentRole::Writer).is_empty());
    }

    #[test]
    fn test_annotation_ids_unique_within_call() {
        let raw = r#"[
  {"type": "bug", "message": "a", "lineStart": 1},
  {"type": "bug", "message": "b", "lineStart": 2},
  {"type": "bug", "message": "c", "lineStart": 3}
]"#;
        let annotations = parse_annotations(raw, AgentRole::Reviewer);
        let mut ids: Vec<&str> = annotations.iter().map(|a| a.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
        assert!(ids.iter().all(|id| id.starts_with("reviewer-")));
    }

    #[test]
    fn test_generation_from_json_object() {
        let raw = r#"Sure, here you go:
```json
{"code": "fn add(a: i32, b: i32) -> i32 { a + b }", "explanation": "simple addition", "confidence": 0.92}
```"#;
        let result = parse_generation(raw);
        assert!(result.code.contains("fn add"));
        assert_eq!(result.explanation.as_deref(), Some("simple addition"));
        assert!((result.confidence - 0.92).abs() < f64::EPSILON);
    }

    #[test]
    fn test_generation_confidence_clamped() {
        let result = parse_generation(r#"{"code": "x", "confidence": 7.5}"#);
        assert!((result.confidence - 1.0).abs() < f64::EPSILON);

        let result = parse_generation(r#"{"code": "x", "confidence": -2.0}"#);
        assert_eq!(result.confidence, 0.0);

        let result = parse_generation(r#"{"code": "x"}"#);
        assert!((result.confidence - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_generation_from_fenced_code() {
        let raw = "Here is the function:\n```rust\nfn main() {\n    println!(\"hi\");\n}\n```\nIt prints a greeting.";
        let result = parse_generation(raw);
        assert!(result.code.starts_with("fn main()"));
        assert!(!result.code.contains("```"));
        let explanation = result.explanation.unwrap();
        assert!(explanation.contains("Here is the function:"));
        assert!(explanation.contains("It prints a greeting."));
    }

    #[test]
    fn test_generation_falls_back_to_raw_text() {
        let result = parse_generation("  fn lonely() {}  ");
        assert_eq!(result.code, "fn lonely() {}");
        assert!(result.explanation.is_none());
        assert!((result.confidence - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_findings_parse_and_drop() {
        let raw = r#"Review complete.
[
  {"severity": "critical", "category": "bug", "message": "sql injection", "fix": "use bind params"},
  {"severity": "meh", "category": "bug", "message": "dropped"},
  {"severity": "low", "message": "no category is fine"},
  {"severity": "low", "category": "style"}
]"#;
        let findings = parse_findings(raw);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].message, "sql injection");
        assert_eq!(findings[0].fix.as_deref(), Some("use bind params"));
        assert_eq!(findings[1].category, "");
    }

    #[test]
    fn test_findings_garbage_returns_empty() {
        assert!(parse_findings("nothing structured").is_empty());
        assert!(parse_findings("[{{{").is_empty());
    }
}
