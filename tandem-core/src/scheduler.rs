//! Debounced analysis scheduler: turns a stream of edit events into
//! periodic concurrent analysis passes over the writer and reviewer.
//!
//! Each edit resets a single pending timer; when the editor goes quiet the
//! timer fires one analysis pass that fans out both collaborator branches
//! in parallel and joins them into a merged annotation set. The merged set
//! fully replaces the file's previous annotations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::collaborators::{CodeGenerator, CodeReviewer, CollaboratorError, CollaboratorResult};
use crate::parser::parse_annotations;
use crate::registry::AgentRegistry;
use crate::types::{AgentRole, AgentStatus, AnnotationKind, CodeAnnotation};

/// Scheduler tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Quiet period after the last qualifying edit before analysis runs.
    pub debounce: Duration,
    /// Edits whose trimmed code is shorter than this are ignored entirely:
    /// no timer reset, no analysis.
    pub min_code_len: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(1500),
            min_code_len: 50,
        }
    }
}

/// Current annotation sets, keyed by file path.
///
/// A successful analysis pass replaces a file's whole set; sets are never
/// merged across passes.
#[derive(Default)]
pub struct AnnotationStore {
    files: RwLock<HashMap<String, Vec<CodeAnnotation>>>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the annotation set for a file.
    pub fn replace(&self, file_path: &str, annotations: Vec<CodeAnnotation>) {
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        files.insert(file_path.to_string(), annotations);
    }

    /// Snapshot of a file's annotations, empty if none.
    pub fn get(&self, file_path: &str) -> Vec<CodeAnnotation> {
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        files.get(file_path).cloned().unwrap_or_default()
    }

    /// Drop all annotations for all files.
    pub fn clear(&self) {
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        files.clear();
    }
}

/// Debounces edit events and runs fan-out/fan-in analysis passes.
///
/// One logical edit stream per scheduler: a new qualifying edit cancels the
/// pending timer, not an analysis already in flight. In-flight passes carry
/// a generation number; a pass that finishes after a newer one has started
/// discards its result instead of overwriting the newer annotations.
pub struct AnalysisScheduler<G, R> {
    registry: Arc<AgentRegistry>,
    generator: Arc<G>,
    reviewer: Arc<R>,
    annotations: Arc<AnnotationStore>,
    config: SchedulerConfig,
    pending: Mutex<Option<JoinHandle<()>>>,
    generation: AtomicU64,
}

impl<G, R> AnalysisScheduler<G, R>
where
    G: CodeGenerator + 'static,
    R: CodeReviewer + 'static,
{
    pub fn new(registry: Arc<AgentRegistry>, generator: Arc<G>, reviewer: Arc<R>) -> Self {
        Self::with_config(registry, generator, reviewer, SchedulerConfig::default())
    }

    pub fn with_config(
        registry: Arc<AgentRegistry>,
        generator: Arc<G>,
        reviewer: Arc<R>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            registry,
            generator,
            reviewer,
            annotations: Arc::new(AnnotationStore::new()),
            config,
            pending: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Shared handle to the annotation store.
    pub fn annotations(&self) -> Arc<AnnotationStore> {
        Arc::clone(&self.annotations)
    }

    /// Handle one edit event. Fire-and-forget; analysis errors are caught
    /// and logged here, never surfaced to the caller.
    ///
    /// Must be called from within a tokio runtime.
    pub fn on_edit(self: &Arc<Self>, code: &str, file_path: &str) {
        if code.trim().chars().count() < self.config.min_code_len {
            return;
        }

        let this = Arc::clone(self);
        let code = code.to_string();
        let file_path = file_path.to_string();
        let debounce = self.config.debounce;

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if let Err(e) = this.analyze(&code, &file_path).await {
                warn!(file = %file_path, error = %e, "scheduled analysis failed");
            }
        }));
    }

    /// Run one analysis pass: fan out both branches, join, filter each
    /// branch to the annotation kinds it is responsible for, and replace
    /// the file's annotation set.
    ///
    /// One failed branch contributes nothing and is only logged; both
    /// branches failing marks both agents errored and re-raises.
    pub async fn analyze(
        &self,
        code: &str,
        file_path: &str,
    ) -> Result<Vec<CodeAnnotation>, CollaboratorError> {
        let pass = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(file = file_path, pass, "analysis pass starting");

        self.registry
            .set_status(AgentRole::Writer, AgentStatus::Thinking);
        self.registry
            .set_status(AgentRole::Reviewer, AgentStatus::Scanning);

        let (scan, suggest) = tokio::join!(self.reviewer.scan(code), self.generator.suggest(code));

        match (scan, suggest) {
            (Err(scan_err), Err(suggest_err)) => {
                error!(
                    file = file_path,
                    reviewer_branch = %scan_err,
                    writer_branch = %suggest_err,
                    "both analysis branches failed"
                );
                self.registry
                    .set_status(AgentRole::Writer, AgentStatus::Error);
                self.registry
                    .set_status(AgentRole::Reviewer, AgentStatus::Error);
                Err(scan_err)
            }
            (scan, suggest) => {
                // Reviewer branch first; concatenation order is fixed after
                // the join, regardless of which call settled first.
                let mut combined = branch_annotations(
                    scan,
                    AgentRole::Reviewer,
                    &[AnnotationKind::Bug, AnnotationKind::Style],
                    file_path,
                );
                combined.extend(branch_annotations(
                    suggest,
                    AgentRole::Writer,
                    &[AnnotationKind::Performance, AnnotationKind::Refactor],
                    file_path,
                ));

                if self.generation.load(Ordering::SeqCst) != pass {
                    // A newer pass started while this one was in flight; its
                    // result wins. Leave statuses to the newer pass too.
                    debug!(file = file_path, pass, "stale analysis pass, discarding result");
                    return Ok(combined);
                }

                self.annotations.replace(file_path, combined.clone());
                self.registry.set_status(AgentRole::Writer, AgentStatus::Idle);
                self.registry
                    .set_status(AgentRole::Reviewer, AgentStatus::Idle);
                debug!(
                    file = file_path,
                    count = combined.len(),
                    "analysis pass complete"
                );
                Ok(combined)
            }
        }
    }
}

/// Parse one branch's raw output and keep only the kinds that branch is
/// responsible for. A failed branch degrades to an empty set.
fn branch_annotations(
    result: CollaboratorResult<String>,
    role: AgentRole,
    kinds: &[AnnotationKind],
    file_path: &str,
) -> Vec<CodeAnnotation> {
    match result {
        Ok(raw) => {
            let mut annotations = parse_annotations(&raw, role);
            annotations.retain(|a| kinds.contains(&a.kind));
            for annotation in &mut annotations {
                annotation.file_path = file_path.to_string();
            }
            annotations
        }
        Err(e) => {
            warn!(branch = %role, error = %e, "analysis branch failed, contributing no annotations");
            Vec::new()
        }
    }
}
