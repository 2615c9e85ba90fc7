//! Authoritative session operations against the store.
//!
//! Each operation loads the timeline, enforces the transition graph,
//! applies the mutation, re-runs the validator, and persists the
//! refreshed conflict set and current-task cache alongside the change.
//! Undo deadlines are enforced here with the server's own clock -- a
//! client-supplied timestamp is never trusted for the deadline check.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use sous_store::models::{
    RunState, Task, TaskPatch, TaskStatus, Timeline, TimelinePatch,
};
use sous_store::TimelineStore;

use crate::error::SessionError;
use crate::validate;

use super::transitions::{
    is_valid_run_transition, is_valid_task_transition, undo_window_open,
};

/// Fetch a timeline or fail with `NotFound`.
pub async fn load(
    store: &dyn TimelineStore,
    timeline_id: Uuid,
) -> Result<Timeline, SessionError> {
    store
        .get(timeline_id)
        .await?
        .ok_or(SessionError::NotFound(timeline_id))
}

/// Fetch the timeline for a meal or fail with `Validation`.
pub async fn load_by_meal(
    store: &dyn TimelineStore,
    meal_id: Uuid,
) -> Result<Timeline, SessionError> {
    store
        .get_by_meal(meal_id)
        .await?
        .ok_or_else(|| SessionError::Validation(format!("no timeline exists for meal {meal_id}")))
}

/// Start cooking: `not_started -> running`. Picks the pending task with
/// the earliest start as the current task and marks it in progress.
/// `started_at` anchors real time exactly once; task times stay
/// serve-relative, so a late start does not shift the plan.
pub async fn start(
    store: &dyn TimelineStore,
    timeline_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Timeline, SessionError> {
    let timeline = load(store, timeline_id).await?;
    if !is_valid_run_transition(timeline.run_state, RunState::Running) {
        return Err(SessionError::InvalidRunTransition {
            from: timeline.run_state,
            to: RunState::Running,
        });
    }

    let first = earliest_with_status(&timeline, TaskStatus::Pending)
        .ok_or_else(|| SessionError::Validation("timeline has no pending tasks".to_string()))?;

    tracing::info!(timeline_id = %timeline_id, first_task = %first, "starting cooking session");

    store
        .update_task(
            timeline_id,
            first,
            &TaskPatch {
                status: Some(TaskStatus::InProgress),
                ..Default::default()
            },
        )
        .await?;
    store
        .update_timeline(
            timeline_id,
            &TimelinePatch {
                run_state: Some(RunState::Running),
                started_at: Some(now),
                current_task_id: Some(Some(first)),
                ..Default::default()
            },
        )
        .await?;

    revalidate_and_refresh(store, timeline_id).await
}

/// Complete a task. Valid from any status except `completed`. Advances
/// the current-task pointer to the next-earliest remaining pending task
/// (marking it in progress), or clears it when none remain -- cooking is
/// complete, but the run stays live until [`finish`].
pub async fn checkoff(
    store: &dyn TimelineStore,
    timeline_id: Uuid,
    task_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Timeline, SessionError> {
    let timeline = load(store, timeline_id).await?;
    let task = find_task(&timeline, task_id)?;
    if !is_valid_task_transition(task.status, TaskStatus::Completed) {
        return Err(SessionError::InvalidTaskTransition {
            from: task.status,
            to: TaskStatus::Completed,
        });
    }

    store
        .update_task(
            timeline_id,
            task_id,
            &TaskPatch {
                status: Some(TaskStatus::Completed),
                completed_at: Some(Some(now)),
                ..Default::default()
            },
        )
        .await?;

    advance_current(store, timeline_id).await?;
    revalidate_and_refresh(store, timeline_id).await
}

/// Revert a completion to pending. Valid only inside the 30-second undo
/// window, measured against `now` (the server clock). The current-task
/// pointer is not rewound -- it is derived from statuses on refresh.
pub async fn undo(
    store: &dyn TimelineStore,
    timeline_id: Uuid,
    task_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Timeline, SessionError> {
    let timeline = load(store, timeline_id).await?;
    let task = find_task(&timeline, task_id)?;
    if task.status != TaskStatus::Completed {
        return Err(SessionError::InvalidTaskTransition {
            from: task.status,
            to: TaskStatus::Pending,
        });
    }

    let within_window = task
        .completed_at
        .is_some_and(|completed_at| undo_window_open(completed_at, now));
    if !within_window {
        return Err(SessionError::UndoExpired { task_id });
    }

    store
        .update_task(
            timeline_id,
            task_id,
            &TaskPatch {
                status: Some(TaskStatus::Pending),
                completed_at: Some(None),
                ..Default::default()
            },
        )
        .await?;

    revalidate_and_refresh(store, timeline_id).await
}

/// Skip a pending or in-progress task, advancing the pointer like a
/// checkoff.
pub async fn skip(
    store: &dyn TimelineStore,
    timeline_id: Uuid,
    task_id: Uuid,
) -> Result<Timeline, SessionError> {
    let timeline = load(store, timeline_id).await?;
    let task = find_task(&timeline, task_id)?;
    if !is_valid_task_transition(task.status, TaskStatus::Skipped) {
        return Err(SessionError::InvalidTaskTransition {
            from: task.status,
            to: TaskStatus::Skipped,
        });
    }

    store
        .update_task(
            timeline_id,
            task_id,
            &TaskPatch {
                status: Some(TaskStatus::Skipped),
                ..Default::default()
            },
        )
        .await?;

    advance_current(store, timeline_id).await?;
    revalidate_and_refresh(store, timeline_id).await
}

/// Edit a task's fields. Allowed at any time; `end_minutes` is
/// recomputed by the patch application before re-validation runs.
///
/// Status changes go through [`checkoff`]/[`undo`]/[`skip`], not here.
pub async fn edit(
    store: &dyn TimelineStore,
    timeline_id: Uuid,
    task_id: Uuid,
    patch: &TaskPatch,
) -> Result<Timeline, SessionError> {
    if patch.status.is_some() || patch.completed_at.is_some() {
        return Err(SessionError::Validation(
            "status changes must go through checkoff, undo, or skip".to_string(),
        ));
    }

    let timeline = load(store, timeline_id).await?;
    find_task(&timeline, task_id)?;

    store.update_task(timeline_id, task_id, patch).await?;
    revalidate_and_refresh(store, timeline_id).await
}

/// Delete a task. The store scrubs the id from every other task's
/// `depends_on`; re-validation then runs on the cleaned set.
pub async fn delete_task(
    store: &dyn TimelineStore,
    timeline_id: Uuid,
    task_id: Uuid,
) -> Result<Timeline, SessionError> {
    store.delete_task(timeline_id, task_id).await?;
    revalidate_and_refresh(store, timeline_id).await
}

/// Reorder the display order. Never changes timing and does not trigger
/// re-validation.
pub async fn reorder(
    store: &dyn TimelineStore,
    timeline_id: Uuid,
    ordered: &[Uuid],
) -> Result<Timeline, SessionError> {
    let refreshed = store.reorder_tasks(timeline_id, ordered).await?;
    Ok(refreshed)
}

/// End cooking: `running -> ended`.
pub async fn finish(
    store: &dyn TimelineStore,
    timeline_id: Uuid,
) -> Result<Timeline, SessionError> {
    let timeline = load(store, timeline_id).await?;
    if !is_valid_run_transition(timeline.run_state, RunState::Ended) {
        return Err(SessionError::InvalidRunTransition {
            from: timeline.run_state,
            to: RunState::Ended,
        });
    }

    let refreshed = store
        .update_timeline(
            timeline_id,
            &TimelinePatch {
                run_state: Some(RunState::Ended),
                current_task_id: Some(None),
                ..Default::default()
            },
        )
        .await?;
    Ok(refreshed)
}

/// Delete a timeline outright (a meal is being deleted).
pub async fn delete_timeline(
    store: &dyn TimelineStore,
    timeline_id: Uuid,
) -> Result<(), SessionError> {
    store.delete_timeline(timeline_id).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

fn find_task(timeline: &Timeline, task_id: Uuid) -> Result<&Task, SessionError> {
    timeline.task(task_id).ok_or(SessionError::TaskNotFound {
        timeline_id: timeline.id,
        task_id,
    })
}

fn earliest_with_status(timeline: &Timeline, status: TaskStatus) -> Option<Uuid> {
    timeline
        .tasks
        .iter()
        .filter(|t| t.status == status)
        .min_by(|a, b| {
            a.start_minutes
                .cmp(&b.start_minutes)
                .then_with(|| a.title.cmp(&b.title))
        })
        .map(|t| t.id)
}

/// After a status change, promote the derived current task to
/// in-progress if it is still pending. A cleared pointer (no candidate)
/// signals cooking complete.
async fn advance_current(
    store: &dyn TimelineStore,
    timeline_id: Uuid,
) -> Result<(), SessionError> {
    let timeline = load(store, timeline_id).await?;
    if !timeline.is_running() {
        return Ok(());
    }

    if let Some(next) = timeline.derived_current_task() {
        let is_pending = timeline.task(next).map(|t| t.status) == Some(TaskStatus::Pending);
        if is_pending {
            store
                .update_task(
                    timeline_id,
                    next,
                    &TaskPatch {
                        status: Some(TaskStatus::InProgress),
                        ..Default::default()
                    },
                )
                .await?;
        }
    } else {
        tracing::info!(timeline_id = %timeline_id, "all tasks done; cooking complete");
    }
    Ok(())
}

/// Re-run the validator over the current task set and persist the
/// refreshed annotation, conflict summary, and current-task cache.
pub(crate) async fn revalidate_and_refresh(
    store: &dyn TimelineStore,
    timeline_id: Uuid,
) -> Result<Timeline, SessionError> {
    let timeline = load(store, timeline_id).await?;
    let mut tasks = timeline.tasks.clone();
    let report = validate::validate_and_annotate(&mut tasks);
    store.replace_tasks(timeline_id, &tasks).await?;

    let current = if timeline.is_running() {
        timeline.derived_current_task()
    } else {
        None
    };

    let refreshed = store
        .update_timeline(
            timeline_id,
            &TimelinePatch {
                conflicts: Some(report.conflicts),
                current_task_id: Some(current),
                ..Default::default()
            },
        )
        .await?;
    Ok(refreshed)
}
