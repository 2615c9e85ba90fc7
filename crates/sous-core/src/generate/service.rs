//! Generation orchestrator: meal -> persisted, validated timeline.
//!
//! Delegates task production to a [`TaskGenerator`] collaborator, treats
//! its output as untrusted, validates the normalized result, and persists
//! it. Conflicts are surfaced on the timeline, never fatal; a generator
//! failure is fatal and persists nothing; a task-insert failure after a
//! fresh timeline row was created rolls the row back so no empty orphan
//! survives.

use uuid::Uuid;

use sous_store::models::{Meal, Timeline, TimelinePatch};
use sous_store::TimelineStore;

use crate::error::SessionError;
use crate::validate;

use super::normalize::normalize;
use super::raw::{GenerateRequest, TaskGenerator};

/// Generate (or regenerate) the timeline for a meal.
///
/// Preconditions are checked before the collaborator is contacted: the
/// meal must have a non-nil id and at least one recipe. On regeneration
/// the existing timeline keeps its identity and run state; its task set
/// is fully replaced, never merged.
pub async fn generate_timeline(
    store: &dyn TimelineStore,
    generator: &dyn TaskGenerator,
    meal: &Meal,
) -> Result<Timeline, SessionError> {
    if meal.id == Uuid::nil() {
        return Err(SessionError::Validation("meal id is missing".to_string()));
    }
    if meal.recipes.is_empty() {
        return Err(SessionError::Validation(
            "meal has no recipes to plan".to_string(),
        ));
    }

    tracing::info!(
        meal_id = %meal.id,
        generator = generator.name(),
        recipes = meal.recipes.len(),
        "generating timeline"
    );

    let request = GenerateRequest::from_meal(meal);
    let raw_tasks = generator
        .generate(&request)
        .await
        .map_err(SessionError::Collaborator)?;

    let mut tasks = normalize(meal, &raw_tasks);
    let report = validate::validate_and_annotate(&mut tasks);
    if !report.conflicts.is_empty() {
        tracing::warn!(
            meal_id = %meal.id,
            conflicts = report.conflicts.len(),
            "generated timeline has conflicts"
        );
    }

    let conflict_patch = TimelinePatch {
        serve_at: Some(meal.serve_at),
        conflicts: Some(report.conflicts),
        ..Default::default()
    };

    match store.get_by_meal(meal.id).await? {
        Some(existing) => {
            // Regeneration: replace the full task set, refresh conflicts
            // and the serve anchor.
            store.replace_tasks(existing.id, &tasks).await?;
            let refreshed = store.update_timeline(existing.id, &conflict_patch).await?;
            Ok(refreshed)
        }
        None => {
            let timeline = Timeline::new(meal.id, meal.serve_at);
            let timeline_id = timeline.id;
            store.insert_timeline(&timeline).await?;

            // A failure from here on would leave an empty orphaned
            // timeline row; delete it before surfacing the error.
            if let Err(e) = store.insert_tasks(timeline_id, &tasks).await {
                tracing::warn!(
                    meal_id = %meal.id,
                    timeline_id = %timeline_id,
                    error = %e,
                    "task insert failed; rolling back timeline row"
                );
                let _ = store.delete_timeline(timeline_id).await;
                return Err(e.into());
            }

            match store.update_timeline(timeline_id, &conflict_patch).await {
                Ok(refreshed) => Ok(refreshed),
                Err(e) => {
                    let _ = store.delete_timeline(timeline_id).await;
                    Err(e.into())
                }
            }
        }
    }
}
