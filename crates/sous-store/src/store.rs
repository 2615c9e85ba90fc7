//! The `TimelineStore` trait -- the abstract persistence contract.
//!
//! Persistence mechanics live behind this seam: the generation
//! orchestrator and the live session never talk to a concrete backend
//! directly. The trait is object-safe so it can be shared as
//! `Arc<dyn TimelineStore>`.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Task, TaskPatch, Timeline, TimelinePatch};

/// Errors surfaced by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("timeline {0} not found")]
    TimelineNotFound(Uuid),

    #[error("no timeline exists for meal {0}")]
    MealNotFound(Uuid),

    #[error("task {task_id} not found in timeline {timeline_id}")]
    TaskNotFound { timeline_id: Uuid, task_id: Uuid },

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Abstract CRUD over timelines and their tasks.
///
/// Every mutating operation returns the full refreshed [`Timeline`] so
/// callers always observe the latest task set and conflict summary.
#[async_trait]
pub trait TimelineStore: Send + Sync {
    /// Insert a new timeline row (tasks included as-is). Fails if a
    /// timeline already exists for the same meal.
    async fn insert_timeline(&self, timeline: &Timeline) -> Result<Timeline, StoreError>;

    /// Append tasks to an existing timeline.
    async fn insert_tasks(&self, timeline_id: Uuid, tasks: &[Task]) -> Result<Timeline, StoreError>;

    /// Atomically replace the full task set of a timeline
    /// (delete-then-reinsert).
    async fn replace_tasks(
        &self,
        timeline_id: Uuid,
        tasks: &[Task],
    ) -> Result<Timeline, StoreError>;

    /// Delete a timeline and all its tasks.
    async fn delete_timeline(&self, timeline_id: Uuid) -> Result<(), StoreError>;

    /// Fetch a timeline by id.
    async fn get(&self, timeline_id: Uuid) -> Result<Option<Timeline>, StoreError>;

    /// Fetch the timeline for a meal, if one exists.
    async fn get_by_meal(&self, meal_id: Uuid) -> Result<Option<Timeline>, StoreError>;

    /// Apply a partial update to the timeline's own fields (conflict
    /// summary, run state, current-task cache).
    async fn update_timeline(
        &self,
        timeline_id: Uuid,
        patch: &TimelinePatch,
    ) -> Result<Timeline, StoreError>;

    /// Apply a partial update to one task.
    async fn update_task(
        &self,
        timeline_id: Uuid,
        task_id: Uuid,
        patch: &TaskPatch,
    ) -> Result<Timeline, StoreError>;

    /// Delete one task, scrubbing its id from every other task's
    /// `depends_on`.
    async fn delete_task(&self, timeline_id: Uuid, task_id: Uuid) -> Result<Timeline, StoreError>;

    /// Reorder the display order of tasks. Timing is untouched.
    async fn reorder_tasks(
        &self,
        timeline_id: Uuid,
        ordered: &[Uuid],
    ) -> Result<Timeline, StoreError>;
}

// Compile-time assertion: TimelineStore must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn TimelineStore) {}
};
