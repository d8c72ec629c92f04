//! Tandem core: orchestration for a writer/reviewer pair of coding agents.
//!
//! This crate coordinates two cooperating agents, a generator ("writer")
//! and a critic ("reviewer"), in two modes:
//!
//! - An explicit, bounded generate→review→refine loop driven by the
//!   [`orchestrator::PairOrchestrator`], which records a full
//!   [`types::WorkflowRecord`] per run.
//! - An opportunistic, debounced analysis pipeline driven by the
//!   [`scheduler::AnalysisScheduler`], which fans two concurrent analysis
//!   calls out over an edit stream and joins them into inline
//!   [`types::CodeAnnotation`]s.
//!
//! The generation and review services themselves are external: they are
//! consumed through the [`collaborators`] traits and treated as unreliable.
//! Their raw output is decoded defensively by [`parser`]; shared agent
//! state lives in the [`registry::AgentRegistry`], constructed explicitly
//! and handed to consumers so tests get isolated instances.

pub mod collaborators;
pub mod feedback;
pub mod orchestrator;
pub mod parser;
pub mod registry;
pub mod scheduler;
pub mod types;

pub use collaborators::{CodeGenerator, CodeReviewer, CollaboratorError, CollaboratorResult};
pub use orchestrator::{PairOrchestrator, DEFAULT_PIPELINE_ITERATIONS};
pub use registry::{AgentRegistry, RegistryEvent};
pub use scheduler::{AnalysisScheduler, AnnotationStore, SchedulerConfig};
pub use types::{
    AgentRole, AgentStatus, AnnotationKind, CodeAnnotation, GenerationResult, Issue,
    IssueCategory, IssueSeverity, ReviewFinding, ReviewResult, ThresholdConfig, WorkflowPhase,
    WorkflowRecord,
};
