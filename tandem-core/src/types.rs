//! Core data model for the writer/reviewer pair: roles, statuses, workflow
//! phases, review records, and inline code annotations.
//!
//! Everything here is plain owned data. Mutation rules live with the owners:
//! statuses and phase belong to the [`AgentRegistry`](crate::registry), workflow
//! records to the orchestrator, annotations to the scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The two fixed agent roles. No runtime extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Generator: produces and refines code.
    Writer,
    /// Critic: scores code and raises issues.
    Reviewer,
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Writer => write!(f, "writer"),
            Self::Reviewer => write!(f, "reviewer"),
        }
    }
}

/// Lifecycle state of an agent, combined vocabulary for both roles.
///
/// The writer moves through Idle → Thinking → Coding/Refining → Success;
/// the reviewer through Idle → Scanning → Reviewing → Approved/Alert.
/// Either role can land in Error. The registry does not police which
/// variants a role uses; writes are unconditional overwrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Thinking,
    Coding,
    Refining,
    Success,
    Scanning,
    Reviewing,
    Approved,
    Alert,
    Error,
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Thinking => write!(f, "thinking"),
            Self::Coding => write!(f, "coding"),
            Self::Refining => write!(f, "refining"),
            Self::Success => write!(f, "success"),
            Self::Scanning => write!(f, "scanning"),
            Self::Reviewing => write!(f, "reviewing"),
            Self::Approved => write!(f, "approved"),
            Self::Alert => write!(f, "alert"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Global phase of the pair workflow. Exactly one value at a time,
/// owned by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    Idle,
    WriterGenerating,
    ReviewerReviewing,
    WriterRefining,
    Complete,
    Error,
}

impl std::fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::WriterGenerating => write!(f, "writer_generating"),
            Self::ReviewerReviewing => write!(f, "reviewer_reviewing"),
            Self::WriterRefining => write!(f, "writer_refining"),
            Self::Complete => write!(f, "complete"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Output of a single generation call, after defensive parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    /// The generated code.
    pub code: String,
    /// The writer's explanation of the code, when it gave one.
    pub explanation: Option<String>,
    /// Self-reported confidence, clamped to `[0.0, 1.0]`.
    pub confidence: f64,
}

/// Severity of a review issue, ordered most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl IssueSeverity {
    /// Score penalty for one issue of this severity.
    pub fn penalty(self) -> u32 {
        match self {
            Self::Critical => 20,
            Self::High => 10,
            Self::Medium => 5,
            Self::Low => 2,
        }
    }
}

impl std::fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// Canonical issue taxonomy. Native reviewer categories are remapped onto
/// this set; anything the taxonomy cannot place folds into `BestPractice`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCategory {
    Bug,
    Security,
    Performance,
    Style,
    BestPractice,
}

impl IssueCategory {
    /// Map a reviewer-native category string onto the taxonomy.
    ///
    /// `complexity` has no slot of its own and folds into `BestPractice`,
    /// as does any unrecognized category.
    pub fn from_native(native: &str) -> Self {
        match native.trim().to_lowercase().as_str() {
            "bug" => Self::Bug,
            "security" => Self::Security,
            "performance" => Self::Performance,
            "style" => Self::Style,
            _ => Self::BestPractice,
        }
    }
}

impl std::fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bug => write!(f, "bug"),
            Self::Security => write!(f, "security"),
            Self::Performance => write!(f, "performance"),
            Self::Style => write!(f, "style"),
            Self::BestPractice => write!(f, "best-practice"),
        }
    }
}

/// A single review issue after category remapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub severity: IssueSeverity,
    pub category: IssueCategory,
    pub message: String,
    pub suggestion: Option<String>,
}

/// The review collaborator's native finding record, before remapping.
///
/// `category` stays free-form here; the native vocabulary is wider than
/// the canonical taxonomy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewFinding {
    pub severity: IssueSeverity,
    pub category: String,
    pub message: String,
    pub fix: Option<String>,
}

/// Aggregated review outcome: issues, score, intrinsic approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewResult {
    /// Intrinsic approval: no critical or high issues and score at or
    /// above [`ReviewResult::APPROVAL_SCORE_FLOOR`]. Independent of any
    /// caller-supplied threshold.
    pub approved: bool,
    /// Issues in the order the reviewer raised them.
    pub issues: Vec<Issue>,
    /// 0-100 quality score.
    pub score: u8,
}

impl ReviewResult {
    /// Fixed score floor for intrinsic approval.
    pub const APPROVAL_SCORE_FLOOR: u8 = 80;

    /// Build a result from native findings: remap categories, compute the
    /// score, and derive approval.
    ///
    /// Score is 100 with zero issues, otherwise
    /// `max(0, 100 - 20*critical - 10*high - 5*medium - 2*low)`.
    pub fn from_findings(findings: Vec<ReviewFinding>) -> Self {
        let issues: Vec<Issue> = findings
            .into_iter()
            .map(|f| Issue {
                severity: f.severity,
                category: IssueCategory::from_native(&f.category),
                message: f.message,
                suggestion: f.fix,
            })
            .collect();

        let score = if issues.is_empty() {
            100
        } else {
            let penalty: u32 = issues.iter().map(|i| i.severity.penalty()).sum();
            100u32.saturating_sub(penalty) as u8
        };

        let blocking = issues
            .iter()
            .any(|i| matches!(i.severity, IssueSeverity::Critical | IssueSeverity::High));
        let approved = !blocking && score >= Self::APPROVAL_SCORE_FLOOR;

        Self {
            approved,
            issues,
            score,
        }
    }

    /// Count issues of one severity.
    pub fn count(&self, severity: IssueSeverity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

/// One complete orchestration run. Created by the orchestrator, appended to
/// the registry history, and never mutated after `completed_at` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub id: String,
    pub generation_result: GenerationResult,
    /// None only before the first review has happened.
    pub review_result: Option<ReviewResult>,
    /// Code from the last refinement pass, if any ran.
    pub refined_code: Option<String>,
    /// Raw collaborator call count for this run.
    pub iterations: u32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Kind of an inline annotation ("vibe").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    Bug,
    Style,
    Performance,
    Refactor,
}

impl std::fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bug => write!(f, "bug"),
            Self::Style => write!(f, "style"),
            Self::Performance => write!(f, "performance"),
            Self::Refactor => write!(f, "refactor"),
        }
    }
}

/// A single inline finding attached to a line range in a file.
///
/// Invariant: `line_end >= line_start >= 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeAnnotation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    pub message: String,
    pub suggestion: Option<String>,
    /// Role-derived label of the agent that produced the annotation.
    pub agent: String,
    pub line_start: u32,
    pub line_end: u32,
    pub file_path: String,
    pub created_at: DateTime<Utc>,
}

/// Per-invocation convergence thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Iteration budget, at least 1.
    pub max_iterations: u32,
    /// Minimum acceptable review score, 0-100.
    pub min_score: u8,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            min_score: 80,
        }
    }
}
