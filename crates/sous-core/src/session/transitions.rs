//! Transition graphs for task status and timeline run state, plus the
//! undo-window arithmetic.

use chrono::{DateTime, Duration, Utc};

use sous_store::models::{RunState, TaskStatus};

/// Seconds a completed task stays undoable.
pub const UNDO_WINDOW_SECS: i64 = 30;

/// Check whether a task status transition is a valid edge.
///
/// The graph:
///
/// ```text
/// pending     -> in_progress
/// pending     -> completed    (checkoff out of order)
/// pending     -> skipped
/// in_progress -> completed
/// in_progress -> skipped
/// skipped     -> completed    (checkoff requires only "not completed")
/// completed   -> pending      (undo, window-guarded by the caller)
/// ```
pub fn is_valid_task_transition(from: TaskStatus, to: TaskStatus) -> bool {
    matches!(
        (from, to),
        (TaskStatus::Pending, TaskStatus::InProgress)
            | (TaskStatus::Pending, TaskStatus::Completed)
            | (TaskStatus::Pending, TaskStatus::Skipped)
            | (TaskStatus::InProgress, TaskStatus::Completed)
            | (TaskStatus::InProgress, TaskStatus::Skipped)
            | (TaskStatus::Skipped, TaskStatus::Completed)
            | (TaskStatus::Completed, TaskStatus::Pending)
    )
}

/// Check whether a run state transition is a valid edge.
/// `not_started -> running -> ended`, linear, no re-entry.
pub fn is_valid_run_transition(from: RunState, to: RunState) -> bool {
    matches!(
        (from, to),
        (RunState::NotStarted, RunState::Running) | (RunState::Running, RunState::Ended)
    )
}

/// The wall-clock deadline for undoing a completion.
pub fn undo_deadline(completed_at: DateTime<Utc>) -> DateTime<Utc> {
    completed_at + Duration::seconds(UNDO_WINDOW_SECS)
}

/// Whether an undo is still allowed at `now`. Deadlines are checked
/// lazily on interaction; there is no background timer.
pub fn undo_window_open(completed_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now <= undo_deadline(completed_at)
}
