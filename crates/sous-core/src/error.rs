//! Error taxonomy for timeline generation and live execution.
//!
//! The variants split along the caller-facing fault lines: validation
//! problems are user-correctable and never contact a collaborator;
//! collaborator failures are surfaced distinctly from storage failures so
//! the caller can offer a manual-edit fallback instead of a blind retry;
//! undo-window expiry rejects with no state change.

use thiserror::Error;
use uuid::Uuid;

use sous_store::StoreError;
use sous_store::models::{RunState, TaskStatus};

/// Errors from the orchestrator, session state machine, and
/// recalculation engine.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Malformed input (missing meal id, zero recipes, bad reorder set).
    /// Surfaced before any collaborator or storage call.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("timeline {0} not found")]
    NotFound(Uuid),

    #[error("task {task_id} not found in timeline {timeline_id}")]
    TaskNotFound { timeline_id: Uuid, task_id: Uuid },

    #[error("invalid task transition: {from} -> {to}")]
    InvalidTaskTransition { from: TaskStatus, to: TaskStatus },

    #[error("invalid run transition: {from} -> {to}")]
    InvalidRunTransition { from: RunState, to: RunState },

    /// Undo attempted past the 30-second window. State is unchanged.
    #[error("undo window expired for task {task_id}")]
    UndoExpired { task_id: Uuid },

    /// The generation or recalculation service was unreachable or
    /// returned unparseable output.
    #[error("collaborator failure: {0:#}")]
    Collaborator(anyhow::Error),

    /// Persistence unreachable. Retried only by explicit user action.
    #[error("storage failure: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for SessionError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::TimelineNotFound(id) => Self::NotFound(id),
            StoreError::TaskNotFound {
                timeline_id,
                task_id,
            } => Self::TaskNotFound {
                timeline_id,
                task_id,
            },
            other => Self::Storage(other),
        }
    }
}
