//! Worker lifecycle and status event models.

use serde::Serialize;
use uuid::Uuid;

use super::connection::ServiceIdentity;
use crate::error::WorkerError;

/// Lifecycle of a tunnel worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    #[default]
    Starting,
    Running,
    Stopping,
    /// The restart policy gave up; no worker runs for this identity.
    Stopped,
}

impl WorkerState {
    /// Whether a worker task is live and has not been asked to stop.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }
}

/// How a tunnel ended.
///
/// The side that initiated termination sets the tag; it is never inferred
/// from the presence of an error.
#[derive(Debug)]
pub enum TunnelOutcome {
    /// The worker's cancellation token fired.
    Cancelled,
    /// Resolution or the transport failed on its own.
    Failed(WorkerError),
}

impl TunnelOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Terminal report of one worker. Sent exactly once per worker.
#[derive(Debug)]
pub struct StatusEvent {
    pub worker_id: Uuid,
    pub identity: ServiceIdentity,
    pub outcome: TunnelOutcome,
}

/// Messages flowing from workers to the supervisor.
#[derive(Debug)]
pub enum WorkerMessage {
    /// The endpoint resolved and the transport is being started.
    Started {
        worker_id: Uuid,
        identity: ServiceIdentity,
    },
    Terminated(StatusEvent),
}

/// Read-only view of one worker record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSnapshot {
    pub identity: ServiceIdentity,
    pub worker_id: Uuid,
    pub state: WorkerState,
    pub local_port: u16,
    pub consecutive_failures: u32,
}

/// Read-only view of the whole supervisor, published after every message it handles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorSnapshot {
    pub active_context: Option<String>,
    pub workers: Vec<WorkerSnapshot>,
    pub restarts_issued: u64,
}

impl SupervisorSnapshot {
    pub fn worker(&self, identity: &ServiceIdentity) -> Option<&WorkerSnapshot> {
        self.workers.iter().find(|w| &w.identity == identity)
    }
}
