//! Shared test utilities for sous integration tests.
//!
//! Provides scripted collaborators (a generator and an advisor that
//! return exactly what a test hands them), a failure-injecting store
//! wrapper for exercising rollback paths, and meal/timeline builders.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use sous_core::generate::{GenerateRequest, RawTask, TaskGenerator};
use sous_core::recalc::{RecalcAdvisor, RecalculationSuggestion};
use sous_store::models::{
    Meal, Recipe, RecipeStep, Task, TaskPatch, Timeline, TimelinePatch,
};
use sous_store::{MemoryStore, StoreError, TimelineStore};

// ---------------------------------------------------------------------------
// Scripted collaborators
// ---------------------------------------------------------------------------

/// A [`TaskGenerator`] that returns a canned task list, or fails.
pub struct ScriptedGenerator {
    script: Result<Vec<RawTask>, String>,
}

impl ScriptedGenerator {
    pub fn ok(tasks: Vec<RawTask>) -> Self {
        Self { script: Ok(tasks) }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            script: Err(message.to_string()),
        }
    }
}

#[async_trait]
impl TaskGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, _request: &GenerateRequest) -> Result<Vec<RawTask>> {
        match &self.script {
            Ok(tasks) => Ok(tasks.clone()),
            Err(message) => bail!("{message}"),
        }
    }
}

/// A [`RecalcAdvisor`] that returns a canned suggestion, or fails.
pub struct ScriptedAdvisor {
    script: Result<RecalculationSuggestion, String>,
}

impl ScriptedAdvisor {
    pub fn ok(suggestion: RecalculationSuggestion) -> Self {
        Self {
            script: Ok(suggestion),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            script: Err(message.to_string()),
        }
    }
}

#[async_trait]
impl RecalcAdvisor for ScriptedAdvisor {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn suggest(
        &self,
        _timeline: &Timeline,
        _now: DateTime<Utc>,
        _context: Option<&str>,
    ) -> Result<RecalculationSuggestion> {
        match &self.script {
            Ok(suggestion) => Ok(suggestion.clone()),
            Err(message) => bail!("{message}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure-injecting store
// ---------------------------------------------------------------------------

/// Wraps a [`MemoryStore`] and fails named operations on demand, for
/// exercising rollback paths.
pub struct FlakyStore {
    inner: MemoryStore,
    /// Operation name -> number of upcoming calls to fail.
    failures: Mutex<HashMap<&'static str, usize>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Fail the next `count` calls to `op` (a trait method name, e.g.
    /// `"insert_tasks"`).
    pub fn fail_next(&self, op: &'static str, count: usize) {
        self.failures.lock().unwrap().insert(op, count);
    }

    fn check(&self, op: &'static str) -> Result<(), StoreError> {
        let mut failures = self.failures.lock().unwrap();
        if let Some(remaining) = failures.get_mut(op) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StoreError::Unavailable(format!("injected failure in {op}")));
            }
        }
        Ok(())
    }
}

impl Default for FlakyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TimelineStore for FlakyStore {
    async fn insert_timeline(&self, timeline: &Timeline) -> Result<Timeline, StoreError> {
        self.check("insert_timeline")?;
        self.inner.insert_timeline(timeline).await
    }

    async fn insert_tasks(&self, timeline_id: Uuid, tasks: &[Task]) -> Result<Timeline, StoreError> {
        self.check("insert_tasks")?;
        self.inner.insert_tasks(timeline_id, tasks).await
    }

    async fn replace_tasks(
        &self,
        timeline_id: Uuid,
        tasks: &[Task],
    ) -> Result<Timeline, StoreError> {
        self.check("replace_tasks")?;
        self.inner.replace_tasks(timeline_id, tasks).await
    }

    async fn delete_timeline(&self, timeline_id: Uuid) -> Result<(), StoreError> {
        self.check("delete_timeline")?;
        self.inner.delete_timeline(timeline_id).await
    }

    async fn get(&self, timeline_id: Uuid) -> Result<Option<Timeline>, StoreError> {
        self.check("get")?;
        self.inner.get(timeline_id).await
    }

    async fn get_by_meal(&self, meal_id: Uuid) -> Result<Option<Timeline>, StoreError> {
        self.check("get_by_meal")?;
        self.inner.get_by_meal(meal_id).await
    }

    async fn update_timeline(
        &self,
        timeline_id: Uuid,
        patch: &TimelinePatch,
    ) -> Result<Timeline, StoreError> {
        self.check("update_timeline")?;
        self.inner.update_timeline(timeline_id, patch).await
    }

    async fn update_task(
        &self,
        timeline_id: Uuid,
        task_id: Uuid,
        patch: &TaskPatch,
    ) -> Result<Timeline, StoreError> {
        self.check("update_task")?;
        self.inner.update_task(timeline_id, task_id, patch).await
    }

    async fn delete_task(&self, timeline_id: Uuid, task_id: Uuid) -> Result<Timeline, StoreError> {
        self.check("delete_task")?;
        self.inner.delete_task(timeline_id, task_id).await
    }

    async fn reorder_tasks(
        &self,
        timeline_id: Uuid,
        ordered: &[Uuid],
    ) -> Result<Timeline, StoreError> {
        self.check("reorder_tasks")?;
        self.inner.reorder_tasks(timeline_id, ordered).await
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// A meal served one hour from now, with the given recipes.
pub fn meal_with_recipes(recipes: Vec<Recipe>) -> Meal {
    Meal {
        id: Uuid::new_v4(),
        name: "Test dinner".to_string(),
        serve_at: Utc::now() + Duration::hours(1),
        guest_count: 4,
        recipes,
    }
}

/// A recipe with simple timed steps: `(text, duration_minutes)`.
pub fn recipe(name: &str, steps: &[(&str, i32)]) -> Recipe {
    Recipe {
        id: Uuid::new_v4(),
        name: name.to_string(),
        scale_factor: 1.0,
        steps: steps
            .iter()
            .map(|(text, duration)| RecipeStep {
                id: Uuid::new_v4(),
                text: text.to_string(),
                duration_minutes: *duration,
                requires_oven: false,
                oven_temp: None,
            })
            .collect(),
    }
}

/// A raw generator task with no oven needs and no dependencies.
pub fn raw_task(title: &str, start: i32, duration: i32) -> RawTask {
    RawTask {
        title: title.to_string(),
        description: None,
        start_minutes: start,
        duration_minutes: duration,
        requires_oven: None,
        oven_temp: None,
        depends_on: vec![],
        recipe: None,
        step_index: None,
    }
}

/// A pending task for ad-hoc timelines.
pub fn pending_task(meal_id: Uuid, title: &str, start: i32, duration: i32) -> Task {
    Task::new(meal_id, Uuid::new_v4(), title, start, duration)
}

/// Build and persist a timeline (serving one hour from now) with the
/// given tasks. Returns the stored copy.
pub async fn seed_timeline(store: &dyn TimelineStore, tasks: Vec<Task>) -> Timeline {
    let meal_id = tasks
        .first()
        .map(|t| t.meal_id)
        .unwrap_or_else(Uuid::new_v4);
    let mut timeline = Timeline::new(meal_id, Utc::now() + Duration::hours(1));
    timeline.tasks = tasks;
    store
        .insert_timeline(&timeline)
        .await
        .expect("seed timeline should insert")
}
