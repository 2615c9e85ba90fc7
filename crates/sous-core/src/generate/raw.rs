//! The `TaskGenerator` trait and its untrusted output types.
//!
//! The generator is an external collaborator (typically a model-backed
//! planning service). Its output is advisory: recipe references may be
//! names or synthetic ids, optional fields may be missing, and dependency
//! references are indices into its own list. Everything is normalized
//! before it touches a timeline.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sous_store::models::{Meal, Recipe};

/// Request handed to the generation collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub meal_id: Uuid,
    pub serve_at: DateTime<Utc>,
    pub guest_count: u32,
    pub recipes: Vec<Recipe>,
}

impl GenerateRequest {
    pub fn from_meal(meal: &Meal) -> Self {
        Self {
            meal_id: meal.id,
            serve_at: meal.serve_at,
            guest_count: meal.guest_count,
            recipes: meal.recipes.clone(),
        }
    }
}

/// One task as emitted by the generator, before normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_minutes: i32,
    pub duration_minutes: i32,
    #[serde(default)]
    pub requires_oven: Option<bool>,
    #[serde(default)]
    pub oven_temp: Option<i32>,
    /// Indices into the raw task list -- the generator does not know
    /// real task ids.
    #[serde(default)]
    pub depends_on: Vec<usize>,
    /// Advisory recipe reference: a name or a synthetic id. Resolved by
    /// case-insensitive name match; unresolved references fall back to
    /// the meal's first recipe.
    #[serde(default)]
    pub recipe: Option<String>,
    /// Index of the recipe step this task came from, if any.
    #[serde(default)]
    pub step_index: Option<usize>,
}

/// Adapter interface for task-generation services.
///
/// Object-safe so the orchestrator can hold `Arc<dyn TaskGenerator>`.
#[async_trait]
pub trait TaskGenerator: Send + Sync {
    /// Human-readable name for this generator (e.g. "heuristic").
    fn name(&self) -> &str;

    /// Produce a raw task list for the meal. Errors mean the service was
    /// unreachable or returned unparseable output.
    async fn generate(&self, request: &GenerateRequest) -> Result<Vec<RawTask>>;
}

// Compile-time assertion: TaskGenerator must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn TaskGenerator) {}
};
