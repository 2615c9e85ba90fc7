//! In-memory reference implementation of [`TimelineStore`].
//!
//! Backs the bundled server and the test suites. A single `RwLock`
//! guards the whole map, which is plenty for the single-cook model.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Task, TaskPatch, Timeline, TimelinePatch};
use crate::store::{StoreError, TimelineStore};

#[derive(Default)]
struct Inner {
    timelines: HashMap<Uuid, Timeline>,
    /// meal id -> timeline id. One timeline per meal.
    by_meal: HashMap<Uuid, Uuid>,
}

/// In-memory [`TimelineStore`].
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn timeline_mut(&mut self, timeline_id: Uuid) -> Result<&mut Timeline, StoreError> {
        self.timelines
            .get_mut(&timeline_id)
            .ok_or(StoreError::TimelineNotFound(timeline_id))
    }
}

#[async_trait]
impl TimelineStore for MemoryStore {
    async fn insert_timeline(&self, timeline: &Timeline) -> Result<Timeline, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.by_meal.contains_key(&timeline.meal_id) {
            return Err(StoreError::Unavailable(format!(
                "meal {} already has a timeline",
                timeline.meal_id
            )));
        }
        let mut stored = timeline.clone();
        stored.updated_at = Utc::now();
        inner.by_meal.insert(stored.meal_id, stored.id);
        inner.timelines.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn insert_tasks(&self, timeline_id: Uuid, tasks: &[Task]) -> Result<Timeline, StoreError> {
        let mut inner = self.inner.write().await;
        let timeline = inner.timeline_mut(timeline_id)?;
        timeline.tasks.extend_from_slice(tasks);
        timeline.updated_at = Utc::now();
        Ok(timeline.clone())
    }

    async fn replace_tasks(
        &self,
        timeline_id: Uuid,
        tasks: &[Task],
    ) -> Result<Timeline, StoreError> {
        let mut inner = self.inner.write().await;
        let timeline = inner.timeline_mut(timeline_id)?;
        timeline.tasks = tasks.to_vec();
        timeline.updated_at = Utc::now();
        Ok(timeline.clone())
    }

    async fn delete_timeline(&self, timeline_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let timeline = inner
            .timelines
            .remove(&timeline_id)
            .ok_or(StoreError::TimelineNotFound(timeline_id))?;
        inner.by_meal.remove(&timeline.meal_id);
        Ok(())
    }

    async fn get(&self, timeline_id: Uuid) -> Result<Option<Timeline>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.timelines.get(&timeline_id).cloned())
    }

    async fn get_by_meal(&self, meal_id: Uuid) -> Result<Option<Timeline>, StoreError> {
        let inner = self.inner.read().await;
        let id = match inner.by_meal.get(&meal_id) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(inner.timelines.get(&id).cloned())
    }

    async fn update_timeline(
        &self,
        timeline_id: Uuid,
        patch: &TimelinePatch,
    ) -> Result<Timeline, StoreError> {
        let mut inner = self.inner.write().await;
        let timeline = inner.timeline_mut(timeline_id)?;
        timeline.apply(patch);
        timeline.updated_at = Utc::now();
        Ok(timeline.clone())
    }

    async fn update_task(
        &self,
        timeline_id: Uuid,
        task_id: Uuid,
        patch: &TaskPatch,
    ) -> Result<Timeline, StoreError> {
        let mut inner = self.inner.write().await;
        let timeline = inner.timeline_mut(timeline_id)?;
        let task = timeline
            .task_mut(task_id)
            .ok_or(StoreError::TaskNotFound {
                timeline_id,
                task_id,
            })?;
        task.apply(patch);
        timeline.updated_at = Utc::now();
        Ok(timeline.clone())
    }

    async fn delete_task(&self, timeline_id: Uuid, task_id: Uuid) -> Result<Timeline, StoreError> {
        let mut inner = self.inner.write().await;
        let timeline = inner.timeline_mut(timeline_id)?;
        timeline
            .remove_task(task_id)
            .ok_or(StoreError::TaskNotFound {
                timeline_id,
                task_id,
            })?;
        timeline.updated_at = Utc::now();
        Ok(timeline.clone())
    }

    async fn reorder_tasks(
        &self,
        timeline_id: Uuid,
        ordered: &[Uuid],
    ) -> Result<Timeline, StoreError> {
        let mut inner = self.inner.write().await;
        let timeline = inner.timeline_mut(timeline_id)?;
        timeline.reorder(ordered);
        timeline.updated_at = Utc::now();
        Ok(timeline.clone())
    }
}
