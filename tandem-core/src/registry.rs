//! Agent state registry: the single shared snapshot of agent statuses,
//! workflow phase, and workflow history.
//!
//! Every component writes status and phase through here instead of keeping
//! private copies, so concurrent observers (UI, scheduler, orchestrator)
//! always read one consistent snapshot. All writes are whole-field
//! overwrites; all operations are synchronous and infallible.

use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::debug;

use crate::types::{AgentRole, AgentStatus, WorkflowPhase, WorkflowRecord};

/// Broadcast channel capacity for registry change events.
const EVENT_CAPACITY: usize = 256;

/// Default bound on retained workflow records; oldest are evicted first.
pub const DEFAULT_HISTORY_CAP: usize = 256;

/// Change notification published on every registry write.
///
/// Consumers subscribe with [`AgentRegistry::subscribe`]. Dropped receivers
/// and lagging subscribers are never an error.
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    StatusChanged { role: AgentRole, status: AgentStatus },
    PhaseChanged { phase: WorkflowPhase },
    WorkflowRecorded { id: String },
    Reset,
}

struct RegistryState {
    writer: AgentStatus,
    reviewer: AgentStatus,
    writer_activity: DateTime<Utc>,
    reviewer_activity: DateTime<Utc>,
    phase: WorkflowPhase,
    history: VecDeque<WorkflowRecord>,
}

impl RegistryState {
    fn fresh() -> Self {
        let now = Utc::now();
        Self {
            writer: AgentStatus::Idle,
            reviewer: AgentStatus::Idle,
            writer_activity: now,
            reviewer_activity: now,
            phase: WorkflowPhase::Idle,
            history: VecDeque::new(),
        }
    }
}

/// The shared agent state registry.
///
/// Construct one per pair session and hand it to consumers explicitly; tests
/// get isolated copies by constructing their own.
pub struct AgentRegistry {
    state: RwLock<RegistryState>,
    events: broadcast::Sender<RegistryEvent>,
    history_cap: usize,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::with_history_cap(DEFAULT_HISTORY_CAP)
    }

    /// Create a registry retaining at most `cap` workflow records.
    pub fn with_history_cap(cap: usize) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: RwLock::new(RegistryState::fresh()),
            events,
            history_cap: cap.max(1),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: RegistryEvent) {
        // No receivers is fine; state is the source of truth.
        let _ = self.events.send(event);
    }

    /// Overwrite a role's status and stamp its last-activity time.
    pub fn set_status(&self, role: AgentRole, status: AgentStatus) {
        {
            let mut state = self.write();
            let now = Utc::now();
            match role {
                AgentRole::Writer => {
                    state.writer = status;
                    state.writer_activity = now;
                }
                AgentRole::Reviewer => {
                    state.reviewer = status;
                    state.reviewer_activity = now;
                }
            }
        }
        debug!(role = %role, status = %status, "agent status changed");
        self.publish(RegistryEvent::StatusChanged { role, status });
    }

    /// Overwrite the global workflow phase.
    pub fn set_phase(&self, phase: WorkflowPhase) {
        {
            let mut state = self.write();
            state.phase = phase;
        }
        debug!(phase = %phase, "workflow phase changed");
        self.publish(RegistryEvent::PhaseChanged { phase });
    }

    /// Restore both roles to idle, the phase to idle, and clear the history.
    pub fn reset(&self) {
        {
            let mut state = self.write();
            *state = RegistryState::fresh();
        }
        debug!("registry reset");
        self.publish(RegistryEvent::Reset);
    }

    /// Append a finished workflow record, evicting the oldest when the
    /// retention cap is reached.
    pub fn record_workflow(&self, record: WorkflowRecord) {
        let id = record.id.clone();
        {
            let mut state = self.write();
            if state.history.len() >= self.history_cap {
                state.history.pop_front();
            }
            state.history.push_back(record);
        }
        self.publish(RegistryEvent::WorkflowRecorded { id });
    }

    /// Current status of a role.
    pub fn status(&self, role: AgentRole) -> AgentStatus {
        let state = self.read();
        match role {
            AgentRole::Writer => state.writer,
            AgentRole::Reviewer => state.reviewer,
        }
    }

    /// Last time a role's status was written.
    pub fn last_activity(&self, role: AgentRole) -> DateTime<Utc> {
        let state = self.read();
        match role {
            AgentRole::Writer => state.writer_activity,
            AgentRole::Reviewer => state.reviewer_activity,
        }
    }

    /// Current workflow phase.
    pub fn phase(&self) -> WorkflowPhase {
        self.read().phase
    }

    /// Snapshot of the workflow history, oldest first.
    pub fn history(&self) -> Vec<WorkflowRecord> {
        self.read().history.iter().cloned().collect()
    }

    /// Number of retained workflow records.
    pub fn history_len(&self) -> usize {
        self.read().history.len()
    }

    /// Subscribe to registry change events.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
