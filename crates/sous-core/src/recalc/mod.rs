//! Recalculation engine: bounded-retry, single-suggestion recovery for a
//! cook who is running behind, plus the network-independent uniform
//! shift fallback.

pub mod advisor;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sous_store::models::{TaskPatch, TaskStatus, Timeline};
use sous_store::TimelineStore;

use crate::error::SessionError;
use crate::session::service::revalidate_and_refresh;

pub use advisor::{LocalAdvisor, RecalcAdvisor};

/// Minutes added to every pending task by the offline fallback.
pub const OFFLINE_SHIFT_MINUTES: i32 = 15;

/// Maximum suggestion requests per behind-schedule episode.
pub const MAX_SUGGESTION_ATTEMPTS: u8 = 3;

/// A proposed single-task move with its cascaded dependents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecalculationSuggestion {
    /// The task to move.
    pub task_id: Uuid,
    pub new_start_minutes: i32,
    pub description: String,
    /// Tasks shifted by the same delta so relative spacing is preserved.
    pub affected_task_ids: Vec<Uuid>,
    /// Total tasks moved, the named one included.
    pub tasks_shifted: usize,
}

/// One behind-schedule episode: hands out up to three fresh,
/// independent suggestions against the same timeline snapshot, then
/// refuses until [`RecalcSession::reset`].
#[derive(Debug, Default)]
pub struct RecalcSession {
    attempts: u8,
}

impl RecalcSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> u8 {
        self.attempts
    }

    /// Request one suggestion. Every request spends one of the
    /// episode's attempts, whether or not the advisor succeeds.
    pub async fn suggest(
        &mut self,
        advisor: &dyn RecalcAdvisor,
        timeline: &Timeline,
        now: DateTime<Utc>,
        context: Option<&str>,
    ) -> Result<RecalculationSuggestion, SessionError> {
        if self.attempts >= MAX_SUGGESTION_ATTEMPTS {
            return Err(SessionError::Validation(format!(
                "suggestion limit ({MAX_SUGGESTION_ATTEMPTS}) reached for this episode"
            )));
        }
        self.attempts += 1;

        tracing::info!(
            timeline_id = %timeline.id,
            advisor = advisor.name(),
            attempt = self.attempts,
            "requesting recalculation suggestion"
        );

        advisor
            .suggest(timeline, now, context)
            .await
            .map_err(SessionError::Collaborator)
    }

    /// Back on schedule: start a fresh episode.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

/// Apply an accepted suggestion authoritatively: move the named task to
/// `new_start_minutes` and shift every listed task by the identical
/// delta, persisting task-by-task, then refresh validation. Tasks not
/// listed are untouched. Unknown affected ids are skipped -- the
/// suggestion is advisory.
pub async fn apply_suggestion(
    store: &dyn TimelineStore,
    timeline_id: Uuid,
    suggestion: &RecalculationSuggestion,
) -> Result<Timeline, SessionError> {
    let timeline = store
        .get(timeline_id)
        .await?
        .ok_or(SessionError::NotFound(timeline_id))?;

    let named = timeline
        .task(suggestion.task_id)
        .ok_or(SessionError::TaskNotFound {
            timeline_id,
            task_id: suggestion.task_id,
        })?;
    let delta = suggestion.new_start_minutes - named.start_minutes;

    let mut batch: Vec<Uuid> = vec![suggestion.task_id];
    batch.extend(
        suggestion
            .affected_task_ids
            .iter()
            .filter(|id| **id != suggestion.task_id),
    );

    for id in batch {
        let Some(task) = timeline.task(id) else {
            continue;
        };
        store
            .update_task(
                timeline_id,
                id,
                &TaskPatch {
                    start_minutes: Some(task.start_minutes + delta),
                    ..Default::default()
                },
            )
            .await?;
    }

    revalidate_and_refresh(store, timeline_id).await
}

/// Authoritative arm of the offline fallback: uniformly shift every
/// pending task by `OFFLINE_SHIFT_MINUTES`, last-write-wins. Used when a
/// client replays a shift it already applied locally.
pub async fn shift_pending(
    store: &dyn TimelineStore,
    timeline_id: Uuid,
) -> Result<Timeline, SessionError> {
    let timeline = store
        .get(timeline_id)
        .await?
        .ok_or(SessionError::NotFound(timeline_id))?;

    let pending: Vec<_> = timeline
        .tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Pending)
        .map(|t| (t.id, t.start_minutes))
        .collect();

    tracing::info!(
        timeline_id = %timeline_id,
        shifted = pending.len(),
        minutes = OFFLINE_SHIFT_MINUTES,
        "applying uniform shift to pending tasks"
    );

    for (id, start) in pending {
        store
            .update_task(
                timeline_id,
                id,
                &TaskPatch {
                    start_minutes: Some(start + OFFLINE_SHIFT_MINUTES),
                    ..Default::default()
                },
            )
            .await?;
    }

    revalidate_and_refresh(store, timeline_id).await
}
