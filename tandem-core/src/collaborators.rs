//! Consumed collaborator interfaces: code generation and code review.
//!
//! The orchestration layer never talks to a model directly. It is handed
//! implementations of these traits and treats them as unreliable external
//! services: arbitrary latency, no guaranteed output schema. Timeouts are a
//! collaborator concern; the orchestration layer awaits indefinitely.

use async_trait::async_trait;

use crate::types::ReviewFinding;

/// Failure modes of a collaborator call.
///
/// Anything surfaced through this type means "collaborator unavailable" and
/// is propagated by the orchestrator. Malformed but delivered output is not
/// an error; the parser recovers it silently.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    /// The call never reached the service or the connection broke.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a failure status.
    #[error("provider error (status {status}): {message}")]
    Provider { status: u16, message: String },

    /// The service answered but produced no usable text.
    #[error("collaborator returned an empty response")]
    EmptyResponse,
}

pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// The writer side: turns prompts into code, and code plus feedback into
/// better code.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    /// Generate code for a prompt with supporting context.
    async fn generate(&self, prompt: &str, context: &str) -> CollaboratorResult<String>;

    /// Rework previously generated code against review feedback.
    ///
    /// Implementations lower their own creativity here relative to
    /// [`generate`](Self::generate); the orchestrator does not pass a
    /// temperature.
    async fn refine(&self, code: &str, feedback: &str) -> CollaboratorResult<String>;

    /// Writer-style analysis pass: raw text expected to contain
    /// performance/refactor annotations for the given code.
    async fn suggest(&self, code: &str) -> CollaboratorResult<String>;
}

/// The reviewer side: scores code and scans it for inline findings.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CodeReviewer: Send + Sync {
    /// Full review of the given code, returning native findings.
    async fn review(&self, code: &str) -> CollaboratorResult<Vec<ReviewFinding>>;

    /// Reviewer-style analysis pass: raw text expected to contain
    /// bug/style annotations for the given code.
    async fn scan(&self, code: &str) -> CollaboratorResult<String>;
}
