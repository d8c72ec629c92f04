//! Pair workflow orchestrator: drives the bounded generate→review→refine
//! loop between the writer and reviewer collaborators.
//!
//! The loop is purely sequential; each step's input depends on the previous
//! step's output, so no two collaborator calls are ever in flight at once.
//! Both public operations serialize their phase transitions through the
//! shared [`AgentRegistry`] and are not re-entrant: invoking a second run
//! against the same registry while one is in flight interleaves phase
//! writes unpredictably.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::collaborators::{CodeGenerator, CodeReviewer, CollaboratorError};
use crate::feedback::format_feedback;
use crate::parser::parse_generation;
use crate::registry::AgentRegistry;
use crate::types::{
    AgentRole, AgentStatus, GenerationResult, ReviewResult, ThresholdConfig, WorkflowPhase,
    WorkflowRecord,
};

/// Default refinement-cycle budget for [`PairOrchestrator::run_pipeline`].
pub const DEFAULT_PIPELINE_ITERATIONS: u32 = 3;

/// When a review is good enough to stop the loop.
#[derive(Debug, Clone, Copy)]
enum ApprovalRule {
    /// The review's own `approved` flag; independent of any caller threshold.
    Intrinsic,
    /// `approved` plus a caller-supplied score floor.
    MinScore(u8),
}

impl ApprovalRule {
    fn accepts(self, review: &ReviewResult) -> bool {
        match self {
            Self::Intrinsic => review.approved,
            Self::MinScore(floor) => review.approved && review.score >= floor,
        }
    }
}

/// The single parameterized loop behind both public operations.
#[derive(Debug, Clone, Copy)]
struct LoopPolicy {
    /// How many loop cycles the budget allows.
    max_cycles: u32,
    approval: ApprovalRule,
    /// Whether the review of the initial generation consumes one budget
    /// unit (convergence mode) or only refine+review passes do (pipeline
    /// mode).
    budget_includes_first_review: bool,
}

struct LoopOutcome {
    generation: GenerationResult,
    review: ReviewResult,
    refined_code: Option<String>,
}

/// Drives one writer and one reviewer against the shared registry.
pub struct PairOrchestrator<G, R> {
    registry: Arc<AgentRegistry>,
    generator: Arc<G>,
    reviewer: Arc<R>,
}

impl<G, R> PairOrchestrator<G, R>
where
    G: CodeGenerator,
    R: CodeReviewer,
{
    pub fn new(registry: Arc<AgentRegistry>, generator: Arc<G>, reviewer: Arc<R>) -> Self {
        Self {
            registry,
            generator,
            reviewer,
        }
    }

    /// Bounded pipeline: generate, review, then refine at most
    /// `max_iterations` times while the review is not intrinsically
    /// approved.
    ///
    /// Terminates within `2 + 2 * max_iterations` collaborator calls. The
    /// returned record's `iterations` is the exact number of calls made.
    /// When the budget runs out the last review stands, approved or not.
    pub async fn run_pipeline(
        &self,
        prompt: &str,
        context: &str,
        max_iterations: u32,
    ) -> Result<WorkflowRecord, CollaboratorError> {
        self.run_loop(
            prompt,
            context,
            LoopPolicy {
                max_cycles: max_iterations.max(1),
                approval: ApprovalRule::Intrinsic,
                budget_includes_first_review: false,
            },
        )
        .await
    }

    /// Convergence loop: review first on every cycle, refine only while the
    /// review misses `thresholds.min_score`, spending the budget uniformly
    /// across review(+refine) pairs.
    ///
    /// At most `thresholds.max_iterations` reviews occur. On exhaustion the
    /// last state stands and the phase resolves to idle.
    pub async fn run_until_converged(
        &self,
        prompt: &str,
        context: &str,
        thresholds: ThresholdConfig,
    ) -> Result<WorkflowRecord, CollaboratorError> {
        self.run_loop(
            prompt,
            context,
            LoopPolicy {
                max_cycles: thresholds.max_iterations.max(1),
                approval: ApprovalRule::MinScore(thresholds.min_score),
                budget_includes_first_review: true,
            },
        )
        .await
    }

    async fn run_loop(
        &self,
        prompt: &str,
        context: &str,
        policy: LoopPolicy,
    ) -> Result<WorkflowRecord, CollaboratorError> {
        let started = Utc::now();
        let mut calls: u32 = 0;
        info!(max_cycles = policy.max_cycles, "pair workflow starting");

        match self.drive(prompt, context, policy, &mut calls).await {
            Ok(outcome) => {
                let accepted = policy.approval.accepts(&outcome.review);
                let record = WorkflowRecord {
                    id: Uuid::new_v4().to_string(),
                    generation_result: outcome.generation,
                    review_result: Some(outcome.review),
                    refined_code: outcome.refined_code,
                    iterations: calls,
                    created_at: started,
                    completed_at: Some(Utc::now()),
                };

                if accepted {
                    self.registry.set_status(AgentRole::Writer, AgentStatus::Success);
                    self.registry
                        .set_status(AgentRole::Reviewer, AgentStatus::Approved);
                    self.registry.set_phase(WorkflowPhase::Complete);
                } else {
                    self.registry.set_status(AgentRole::Writer, AgentStatus::Idle);
                    self.registry
                        .set_status(AgentRole::Reviewer, AgentStatus::Alert);
                    self.registry.set_phase(WorkflowPhase::Idle);
                }

                info!(
                    id = %record.id,
                    iterations = record.iterations,
                    accepted,
                    "pair workflow finished"
                );
                self.registry.record_workflow(record.clone());
                Ok(record)
            }
            Err(e) => {
                // Collaborator unavailable: mark, re-raise, append nothing.
                error!(error = %e, calls, "collaborator call failed, aborting workflow");
                self.registry.set_status(AgentRole::Writer, AgentStatus::Error);
                self.registry
                    .set_status(AgentRole::Reviewer, AgentStatus::Error);
                self.registry.set_phase(WorkflowPhase::Error);
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        prompt: &str,
        context: &str,
        policy: LoopPolicy,
        calls: &mut u32,
    ) -> Result<LoopOutcome, CollaboratorError> {
        self.registry.set_phase(WorkflowPhase::WriterGenerating);
        self.registry
            .set_status(AgentRole::Writer, AgentStatus::Thinking);
        let raw = self.generator.generate(prompt, context).await?;
        *calls += 1;
        self.registry.set_status(AgentRole::Writer, AgentStatus::Coding);

        let generation = parse_generation(&raw);
        let mut current_code = generation.code.clone();
        let mut refined_code: Option<String> = None;

        let mut review = self.review_pass(&current_code, calls).await?;
        let mut cycles: u32 = u32::from(policy.budget_includes_first_review);

        while !policy.approval.accepts(&review) && cycles < policy.max_cycles {
            debug!(
                cycle = cycles + 1,
                score = review.score,
                issues = review.issues.len(),
                "review not accepted, refining"
            );
            let feedback = format_feedback(&review.issues);

            self.registry.set_phase(WorkflowPhase::WriterRefining);
            self.registry
                .set_status(AgentRole::Writer, AgentStatus::Refining);
            let raw = self.generator.refine(&current_code, &feedback).await?;
            *calls += 1;

            let refined = parse_generation(&raw);
            current_code = refined.code.clone();
            refined_code = Some(refined.code);

            review = self.review_pass(&current_code, calls).await?;
            cycles += 1;
        }

        Ok(LoopOutcome {
            generation,
            review,
            refined_code,
        })
    }

    async fn review_pass(
        &self,
        code: &str,
        calls: &mut u32,
    ) -> Result<ReviewResult, CollaboratorError> {
        self.registry.set_phase(WorkflowPhase::ReviewerReviewing);
        self.registry
            .set_status(AgentRole::Reviewer, AgentStatus::Reviewing);
        let findings = self.reviewer.review(code).await?;
        *calls += 1;

        let review = ReviewResult::from_findings(findings);
        let status = if review.approved {
            AgentStatus::Approved
        } else {
            AgentStatus::Alert
        };
        self.registry.set_status(AgentRole::Reviewer, status);
        debug!(
            score = review.score,
            approved = review.approved,
            issues = review.issues.len(),
            "review pass complete"
        );
        Ok(review)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::collaborators::{MockCodeGenerator, MockCodeReviewer};
    use crate::types::{IssueSeverity, ReviewFinding};

    fn finding(severity: IssueSeverity, message: &str) -> ReviewFinding {
        ReviewFinding {
            severity,
            category: "bug".to_string(),
            message: message.to_string(),
            fix: None,
        }
    }

    fn orchestrator(
        generator: MockCodeGenerator,
        reviewer: MockCodeReviewer,
    ) -> (
        Arc<AgentRegistry>,
        PairOrchestrator<MockCodeGenerator, MockCodeReviewer>,
    ) {
        let registry = Arc::new(AgentRegistry::new());
        let orch = PairOrchestrator::new(registry.clone(), Arc::new(generator), Arc::new(reviewer));
        (registry, orch)
    }

    #[tokio::test]
    async fn test_pipeline_clean_review_terminates_after_two_calls() {
        let mut generator = MockCodeGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_, _| Ok("fn main() {}".to_string()));
        generator.expect_refine().times(0);

        let mut reviewer = MockCodeReviewer::new();
        reviewer.expect_review().times(1).returning(|_| Ok(vec![]));

        let (registry, orch) = orchestrator(generator, reviewer);
        let record = orch
            .run_pipeline("write main", "", DEFAULT_PIPELINE_ITERATIONS)
            .await
            .unwrap();

        assert_eq!(record.iterations, 2);
        let review = record.review_result.unwrap();
        assert_eq!(review.score, 100);
        assert!(review.approved);
        assert!(record.refined_code.is_none());
        assert!(record.completed_at.is_some());

        assert_eq!(registry.phase(), WorkflowPhase::Complete);
        assert_eq!(registry.status(AgentRole::Writer), AgentStatus::Success);
        assert_eq!(registry.status(AgentRole::Reviewer), AgentStatus::Approved);
        assert_eq!(registry.history_len(), 1);
    }

    #[tokio::test]
    async fn test_pipeline_exhausts_budget_within_call_bound() {
        let max_iterations = 3;

        let mut generator = MockCodeGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_, _| Ok("v1".to_string()));
        generator
            .expect_refine()
            .times(max_iterations as usize)
            .returning(|code, _| Ok(format!("{code}+")));

        let mut reviewer = MockCodeReviewer::new();
        reviewer
            .expect_review()
            .times(1 + max_iterations as usize)
            .returning(|_| Ok(vec![finding(IssueSeverity::Critical, "still broken")]));

        let (registry, orch) = orchestrator(generator, reviewer);
        let record = orch.run_pipeline("p", "c", max_iterations).await.unwrap();

        // 2 + 2 * max_iterations collaborator calls, counted exactly.
        assert_eq!(record.iterations, 2 + 2 * max_iterations);
        assert!(!record.review_result.unwrap().approved);
        // The last refinement's code stands.
        assert_eq!(record.refined_code.as_deref(), Some("v1+++"));

        assert_eq!(registry.phase(), WorkflowPhase::Idle);
        assert_eq!(registry.status(AgentRole::Writer), AgentStatus::Idle);
        assert_eq!(registry.status(AgentRole::Reviewer), AgentStatus::Alert);
        assert_eq!(registry.history_len(), 1);
    }

    #[tokio::test]
    async fn test_pipeline_zero_budget_treated_as_one() {
        let mut generator = MockCodeGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_, _| Ok("v1".to_string()));
        generator
            .expect_refine()
            .times(1)
            .returning(|_, _| Ok("v2".to_string()));

        let mut reviewer = MockCodeReviewer::new();
        reviewer
            .expect_review()
            .times(2)
            .returning(|_| Ok(vec![finding(IssueSeverity::Critical, "nope")]));

        let (_registry, orch) = orchestrator(generator, reviewer);
        let record = orch.run_pipeline("p", "c", 0).await.unwrap();
        assert_eq!(record.iterations, 4);
    }

    #[tokio::test]
    async fn test_converged_on_second_review() {
        let mut generator = MockCodeGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_, _| Ok("first draft".to_string()));
        generator
            .expect_refine()
            .times(1)
            .returning(|_, feedback| {
                assert!(feedback.contains("unvalidated input"));
                Ok("refined draft".to_string())
            });

        let reviews = AtomicUsize::new(0);
        let mut reviewer = MockCodeReviewer::new();
        reviewer.expect_review().times(2).returning(move |_| {
            if reviews.fetch_add(1, Ordering::SeqCst) == 0 {
                // 100 - 20 - 10 - 10 = 60, below the floor.
                Ok(vec![
                    finding(IssueSeverity::Critical, "unvalidated input"),
                    finding(IssueSeverity::High, "panic on empty"),
                    finding(IssueSeverity::High, "blocking io"),
                ])
            } else {
                Ok(vec![])
            }
        });

        let (registry, orch) = orchestrator(generator, reviewer);
        let record = orch
            .run_until_converged("p", "c", ThresholdConfig::default())
            .await
            .unwrap();

        // generate + review + refine + review.
        assert_eq!(record.iterations, 4);
        assert_eq!(record.generation_result.code, "first draft");
        assert_eq!(record.refined_code.as_deref(), Some("refined draft"));
        assert!(record.review_result.unwrap().approved);
        assert_eq!(registry.phase(), WorkflowPhase::Complete);
    }

    #[tokio::test]
    async fn test_convergence_min_score_stricter_than_intrinsic_approval() {
        // Two low issues: score 96 and intrinsically approved, but below
        // the caller's floor of 97, so the loop keeps refining.
        let max_iterations = 2;

        let mut generator = MockCodeGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_, _| Ok("v1".to_string()));
        generator
            .expect_refine()
            .times((max_iterations - 1) as usize)
            .returning(|_, _| Ok("v2".to_string()));

        let mut reviewer = MockCodeReviewer::new();
        reviewer
            .expect_review()
            .times(max_iterations as usize)
            .returning(|_| {
                Ok(vec![
                    finding(IssueSeverity::Low, "nit one"),
                    finding(IssueSeverity::Low, "nit two"),
                ])
            });

        let (registry, orch) = orchestrator(generator, reviewer);
        let thresholds = ThresholdConfig {
            max_iterations,
            min_score: 97,
        };
        let record = orch.run_until_converged("p", "c", thresholds).await.unwrap();

        // Budget spent uniformly: max_iterations reviews, one fewer refine.
        assert_eq!(record.iterations, 1 + 2 * max_iterations - 1);
        let review = record.review_result.unwrap();
        assert!(review.approved);
        assert_eq!(review.score, 96);
        // Not converged by the caller's rule.
        assert_eq!(registry.phase(), WorkflowPhase::Idle);
    }

    #[tokio::test]
    async fn test_collaborator_failure_marks_error_and_appends_nothing() {
        let mut generator = MockCodeGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_, _| Err(CollaboratorError::Transport("connection refused".into())));

        let reviewer = MockCodeReviewer::new();

        let (registry, orch) = orchestrator(generator, reviewer);
        let err = orch.run_pipeline("p", "c", 3).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Transport(_)));

        assert_eq!(registry.phase(), WorkflowPhase::Error);
        assert_eq!(registry.status(AgentRole::Writer), AgentStatus::Error);
        assert_eq!(registry.status(AgentRole::Reviewer), AgentStatus::Error);
        assert_eq!(registry.history_len(), 0);
    }

    #[tokio::test]
    async fn test_review_failure_mid_loop_propagates() {
        let mut generator = MockCodeGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_, _| Ok("v1".to_string()));

        let mut reviewer = MockCodeReviewer::new();
        reviewer.expect_review().times(1).returning(|_| {
            Err(CollaboratorError::Provider {
                status: 503,
                message: "overloaded".into(),
            })
        });

        let (registry, orch) = orchestrator(generator, reviewer);
        let err = orch.run_pipeline("p", "c", 3).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Provider { status: 503, .. }));
        assert_eq!(registry.phase(), WorkflowPhase::Error);
        assert_eq!(registry.history_len(), 0);
    }

    #[tokio::test]
    async fn test_generation_result_parsed_from_wrapped_output() {
        let mut generator = MockCodeGenerator::new();
        generator.expect_generate().times(1).returning(|_, _| {
            Ok("```rust\nfn answer() -> u32 { 42 }\n```\nShort and sweet.".to_string())
        });

        let mut reviewer = MockCodeReviewer::new();
        reviewer.expect_review().times(1).returning(|_| Ok(vec![]));

        let (_registry, orch) = orchestrator(generator, reviewer);
        let record = orch.run_pipeline("p", "c", 3).await.unwrap();
        assert_eq!(record.generation_result.code, "fn answer() -> u32 { 42 }");
        assert_eq!(
            record.generation_result.explanation.as_deref(),
            Some("Short and sweet.")
        );
    }
}
