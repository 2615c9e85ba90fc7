//! The embeddable cook-mode engine: optimistic updates with structural
//! rollback.
//!
//! `LiveSession` owns a timeline snapshot. Every mutating operation
//! captures the exact pre-mutation state, applies its change to the
//! snapshot synchronously, then persists through the store; a
//! persistence failure restores the captured state -- never an
//! approximation. Completions and accepted batch shifts also land in an
//! undo ledger with a 30-second deadline, checked lazily on the next
//! interaction (no background timer).
//!
//! Operations are not serialized against one another by this type; the
//! caller disables controls affected by an in-flight mutation.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use sous_store::models::{Task, TaskPatch, TaskStatus, Timeline, TimelinePatch};
use sous_store::{StoreError, TimelineStore};

use crate::error::SessionError;
use crate::recalc::{RecalculationSuggestion, OFFLINE_SHIFT_MINUTES};
use crate::session::transitions::{is_valid_task_transition, UNDO_WINDOW_SECS};
use crate::validate;

/// What an undo ledger entry reverts.
#[derive(Debug, Clone, PartialEq)]
pub enum UndoKind {
    /// A single checkoff: restores the captured status and clears the
    /// completion timestamp.
    Checkoff { task_id: Uuid },
    /// An accepted recalculation shift: restores the captured start
    /// times of the whole batch as one unit.
    BatchShift,
}

/// A pending undo opportunity. `captured` holds the exact prior task
/// values; `expires_at` is completion time + 30 seconds.
#[derive(Debug, Clone)]
pub struct UndoableAction {
    pub kind: UndoKind,
    captured: Vec<Task>,
    pub expires_at: DateTime<Utc>,
}

impl UndoableAction {
    fn covers(&self, task_id: Uuid) -> bool {
        match &self.kind {
            UndoKind::Checkoff { task_id: id } => *id == task_id,
            UndoKind::BatchShift => self.captured.iter().any(|t| t.id == task_id),
        }
    }
}

/// Live cook-mode engine over one timeline.
pub struct LiveSession {
    store: Arc<dyn TimelineStore>,
    timeline: Timeline,
    ledger: Vec<UndoableAction>,
    /// Task ids shifted while offline, awaiting replay.
    replay_queue: Vec<Uuid>,
}

impl LiveSession {
    pub fn new(store: Arc<dyn TimelineStore>, timeline: Timeline) -> Self {
        Self {
            store,
            timeline,
            ledger: Vec::new(),
            replay_queue: Vec::new(),
        }
    }

    /// The optimistic local snapshot -- what the UI renders.
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Number of offline shifts awaiting replay.
    pub fn pending_replays(&self) -> usize {
        self.replay_queue.len()
    }

    /// Complete a task optimistically, then persist. On persistence
    /// failure the snapshot is restored exactly and the error surfaced
    /// for an explicit retry.
    pub async fn checkoff(
        &mut self,
        task_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        self.prune_expired(now);

        let snapshot = self.timeline.clone();
        let task = self
            .timeline
            .task(task_id)
            .ok_or(SessionError::TaskNotFound {
                timeline_id: self.timeline.id,
                task_id,
            })?;
        if !is_valid_task_transition(task.status, TaskStatus::Completed) {
            return Err(SessionError::InvalidTaskTransition {
                from: task.status,
                to: TaskStatus::Completed,
            });
        }
        let prior = task.clone();

        // Optimistic apply: complete, then promote the next pending task.
        if let Some(task) = self.timeline.task_mut(task_id) {
            task.status = TaskStatus::Completed;
            task.completed_at = Some(now);
        }
        let mut promoted = None;
        if self.timeline.is_running() {
            if let Some(next) = self.timeline.derived_current_task() {
                if let Some(next_task) = self.timeline.task_mut(next) {
                    if next_task.status == TaskStatus::Pending {
                        next_task.status = TaskStatus::InProgress;
                        promoted = Some(next);
                    }
                }
            }
        }
        self.timeline.current_task_id = self.timeline.derived_current_task();

        if let Err(e) = self.persist_checkoff(task_id, now, promoted).await {
            self.timeline = snapshot;
            return Err(e.into());
        }

        self.ledger.push(UndoableAction {
            kind: UndoKind::Checkoff { task_id },
            captured: vec![prior],
            expires_at: now + Duration::seconds(UNDO_WINDOW_SECS),
        });
        Ok(())
    }

    /// Undo the most recent undoable action covering `task_id`. Rejected
    /// with no state change when no unexpired entry covers it.
    pub async fn undo(&mut self, task_id: Uuid, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.prune_expired(now);

        let position = self
            .ledger
            .iter()
            .rposition(|a| a.covers(task_id))
            .ok_or(SessionError::UndoExpired { task_id })?;

        let snapshot = self.timeline.clone();
        let action = self.ledger[position].clone();
        let mut touched: Vec<Uuid> = Vec::new();

        match &action.kind {
            UndoKind::Checkoff { task_id } => {
                if let Some(task) = self.timeline.task_mut(*task_id) {
                    task.status = action.captured[0].status;
                    task.completed_at = None;
                    touched.push(*task_id);
                }
            }
            UndoKind::BatchShift => {
                // Restore times only: statuses may have legitimately
                // changed since the shift was applied.
                for captured in &action.captured {
                    if let Some(task) = self.timeline.task_mut(captured.id) {
                        task.start_minutes = captured.start_minutes;
                        task.duration_minutes = captured.duration_minutes;
                        task.recompute_end();
                        touched.push(captured.id);
                    }
                }
            }
        }

        self.refresh_local();

        if let Err(e) = self.persist_tasks(&touched).await {
            self.timeline = snapshot;
            return Err(e.into());
        }

        self.ledger.remove(position);
        Ok(())
    }

    /// Accept a recalculation suggestion: move the named task to its new
    /// start and shift every affected task by the identical delta.
    /// Applied optimistically, persisted task-by-task, undoable as one
    /// unit for 30 seconds.
    pub async fn accept_suggestion(
        &mut self,
        suggestion: &RecalculationSuggestion,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        self.prune_expired(now);

        let snapshot = self.timeline.clone();
        let named = self
            .timeline
            .task(suggestion.task_id)
            .ok_or(SessionError::TaskNotFound {
                timeline_id: self.timeline.id,
                task_id: suggestion.task_id,
            })?;
        let delta = suggestion.new_start_minutes - named.start_minutes;

        let mut batch: Vec<Uuid> = vec![suggestion.task_id];
        batch.extend(
            suggestion
                .affected_task_ids
                .iter()
                .filter(|id| **id != suggestion.task_id && self.timeline.task(**id).is_some())
                .copied(),
        );

        let captured: Vec<Task> = batch
            .iter()
            .filter_map(|id| self.timeline.task(*id).cloned())
            .collect();

        for id in &batch {
            if let Some(task) = self.timeline.task_mut(*id) {
                task.start_minutes += delta;
                task.recompute_end();
            }
        }

        self.refresh_local();

        if let Err(e) = self.persist_tasks(&batch).await {
            self.timeline = snapshot;
            return Err(e.into());
        }

        self.ledger.push(UndoableAction {
            kind: UndoKind::BatchShift,
            captured,
            expires_at: now + Duration::seconds(UNDO_WINDOW_SECS),
        });
        Ok(())
    }

    /// Network-independent fallback while running behind: uniformly push
    /// every pending task back by 15 minutes. Applied immediately; the
    /// change is queued and replayed to storage by [`Self::replay_pending`]
    /// once connectivity returns. Returns the number of tasks shifted.
    pub fn offline_shift(&mut self) -> usize {
        let mut shifted = 0;
        for task in &mut self.timeline.tasks {
            if task.status == TaskStatus::Pending {
                task.start_minutes += OFFLINE_SHIFT_MINUTES;
                task.recompute_end();
                if !self.replay_queue.contains(&task.id) {
                    self.replay_queue.push(task.id);
                }
                shifted += 1;
            }
        }
        self.refresh_local();
        shifted
    }

    /// Replay offline shifts to storage, last-write-wins: each queued
    /// task's *current* local times overwrite whatever storage holds, no
    /// merging. On failure the queue is kept for the next explicit
    /// attempt.
    pub async fn replay_pending(&mut self) -> Result<usize, SessionError> {
        if self.replay_queue.is_empty() {
            return Ok(0);
        }

        let queue = self.replay_queue.clone();
        if let Err(e) = self.persist_tasks(&queue).await {
            tracing::warn!(
                timeline_id = %self.timeline.id,
                queued = queue.len(),
                error = %e,
                "offline shift replay failed; keeping queue"
            );
            return Err(e.into());
        }

        let count = queue.len();
        self.replay_queue.clear();
        Ok(count)
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    /// Drop expired undo entries. Called lazily at each interaction.
    fn prune_expired(&mut self, now: DateTime<Utc>) {
        self.ledger.retain(|a| now <= a.expires_at);
    }

    /// Re-run validation and the derived pointer over the local snapshot.
    fn refresh_local(&mut self) {
        let report = validate::validate_and_annotate(&mut self.timeline.tasks);
        self.timeline.set_conflicts(report.conflicts);
        if self.timeline.is_running() {
            self.timeline.current_task_id = self.timeline.derived_current_task();
        }
    }

    async fn persist_checkoff(
        &self,
        task_id: Uuid,
        now: DateTime<Utc>,
        promoted: Option<Uuid>,
    ) -> Result<(), StoreError> {
        self.store
            .update_task(
                self.timeline.id,
                task_id,
                &TaskPatch {
                    status: Some(TaskStatus::Completed),
                    completed_at: Some(Some(now)),
                    ..Default::default()
                },
            )
            .await?;
        if let Some(next) = promoted {
            self.store
                .update_task(
                    self.timeline.id,
                    next,
                    &TaskPatch {
                        status: Some(TaskStatus::InProgress),
                        ..Default::default()
                    },
                )
                .await?;
        }
        self.persist_summary().await
    }

    /// Persist the current local values of `task_ids` one by one, then
    /// the conflict summary. Local state is the source of truth: the
    /// last write wins.
    async fn persist_tasks(&self, task_ids: &[Uuid]) -> Result<(), StoreError> {
        for id in task_ids {
            let Some(task) = self.timeline.task(*id) else {
                continue;
            };
            self.store
                .update_task(
                    self.timeline.id,
                    *id,
                    &TaskPatch {
                        start_minutes: Some(task.start_minutes),
                        duration_minutes: Some(task.duration_minutes),
                        status: Some(task.status),
                        completed_at: Some(task.completed_at),
                        ..Default::default()
                    },
                )
                .await?;
        }
        self.persist_summary().await
    }

    async fn persist_summary(&self) -> Result<(), StoreError> {
        self.store
            .update_timeline(
                self.timeline.id,
                &TimelinePatch {
                    conflicts: Some(self.timeline.conflicts.clone()),
                    current_task_id: Some(self.timeline.current_task_id),
                    ..Default::default()
                },
            )
            .await?;
        Ok(())
    }
}
