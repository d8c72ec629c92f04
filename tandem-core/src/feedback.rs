//! Renders review issues into the feedback message fed back to the writer.
//!
//! Pure function of its input: no randomness, no I/O, identical output for
//! identical issues.

use crate::types::{Issue, IssueSeverity};

/// Returned when the reviewer raised nothing.
pub const CLEAN_REVIEW_MESSAGE: &str = "The code looks good. No issues to address.";

/// Medium issues rendered at most.
const MEDIUM_CAP: usize = 5;
/// Low issues rendered at most, and only when nothing blocking exists.
const LOW_CAP: usize = 3;

/// Render issues as severity-ordered sections for the next generation call.
///
/// Sections appear critical first, then high, medium, low; within a section
/// the reviewer's original order is preserved. Medium is capped at 5
/// entries; low entries appear only when there are no critical or high
/// issues, capped at 3. Each line carries the message and, when present,
/// the suggestion on an indented continuation.
pub fn format_feedback(issues: &[Issue]) -> String {
    if issues.is_empty() {
        return CLEAN_REVIEW_MESSAGE.to_string();
    }

    let by_severity = |severity: IssueSeverity| {
        issues.iter().filter(move |i| i.severity == severity)
    };
    let critical: Vec<&Issue> = by_severity(IssueSeverity::Critical).collect();
    let high: Vec<&Issue> = by_severity(IssueSeverity::High).collect();
    let medium: Vec<&Issue> = by_severity(IssueSeverity::Medium).collect();
    let low: Vec<&Issue> = by_severity(IssueSeverity::Low).collect();

    let mut out = String::from("Please address the following review feedback:\n");

    render_section(&mut out, "Critical issues (must fix):", &critical);
    render_section(&mut out, "High priority issues:", &high);
    render_section(
        &mut out,
        "Medium priority issues:",
        &medium[..medium.len().min(MEDIUM_CAP)],
    );
    if critical.is_empty() && high.is_empty() {
        render_section(&mut out, "Minor issues:", &low[..low.len().min(LOW_CAP)]);
    }

    out.trim_end().to_string()
}

fn render_section(out: &mut String, heading: &str, issues: &[&Issue]) {
    if issues.is_empty() {
        return;
    }
    out.push('\n');
    out.push_str(heading);
    out.push('\n');
    for issue in issues {
        out.push_str("- ");
        out.push_str(&issue.message);
        out.push('\n');
        if let Some(suggestion) = &issue.suggestion {
            out.push_str("  Suggestion: ");
            out.push_str(suggestion);
            out.push('\n');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IssueCategory;

    fn issue(severity: IssueSeverity, message: &str) -> Issue {
        Issue {
            severity,
            category: IssueCategory::Bug,
            message: message.to_string(),
            suggestion: None,
        }
    }

    fn issue_with_suggestion(severity: IssueSeverity, message: &str, suggestion: &str) -> Issue {
        Issue {
            suggestion: Some(suggestion.to_string()),
            ..issue(severity, message)
        }
    }

    #[test]
    fn test_empty_issues_returns_clean_message() {
        assert_eq!(format_feedback(&[]), CLEAN_REVIEW_MESSAGE);
    }

    #[test]
    fn test_sections_render_in_severity_order() {
        let issues = vec![
            issue(IssueSeverity::Medium, "medium thing"),
            issue(IssueSeverity::Critical, "critical thing"),
            issue(IssueSeverity::High, "high thing"),
        ];
        let text = format_feedback(&issues);

        let critical_at = text.find("critical thing").unwrap();
        let high_at = text.find("high thing").unwrap();
        let medium_at = text.find("medium thing").unwrap();
        assert!(critical_at < high_at);
        assert!(high_at < medium_at);
    }

    #[test]
    fn test_relative_order_preserved_within_section() {
        let issues = vec![
            issue(IssueSeverity::High, "first high"),
            issue(IssueSeverity::Critical, "the critical"),
            issue(IssueSeverity::High, "second high"),
        ];
        let text = format_feedback(&issues);
        assert!(text.find("first high").unwrap() < text.find("second high").unwrap());
    }

    #[test]
    fn test_medium_capped_at_five() {
        let issues: Vec<Issue> = (0..8)
            .map(|i| issue(IssueSeverity::Medium, &format!("medium-{}", i)))
            .collect();
        let text = format_feedback(&issues);
        assert!(text.contains("medium-4"));
        assert!(!text.contains("medium-5"));
    }

    #[test]
    fn test_low_suppressed_when_blocking_issues_exist() {
        let issues = vec![
            issue(IssueSeverity::Critical, "blocker"),
            issue(IssueSeverity::Low, "nit"),
        ];
        let text = format_feedback(&issues);
        assert!(text.contains("blocker"));
        assert!(!text.contains("nit"));
    }

    #[test]
    fn test_low_capped_at_three_when_rendered() {
        let issues: Vec<Issue> = (0..5)
            .map(|i| issue(IssueSeverity::Low, &format!("low-{}", i)))
            .collect();
        let text = format_feedback(&issues);
        assert!(text.contains("low-2"));
        assert!(!text.contains("low-3"));
    }

    #[test]
    fn test_suggestion_rendered_on_continuation_line() {
        let issues = vec![issue_with_suggestion(
            IssueSeverity::Critical,
            "unchecked index",
            "use get() and handle None",
        )];
        let text = format_feedback(&issues);
        assert!(text.contains("- unchecked index\n  Suggestion: use get() and handle None"));
    }

    #[test]
    fn test_deterministic_for_identical_input() {
        let issues = vec![
            issue(IssueSeverity::High, "a"),
            issue(IssueSeverity::Low, "b"),
        ];
        assert_eq!(format_feedback(&issues), format_feedback(&issues));
    }
}
