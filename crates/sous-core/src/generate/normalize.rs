//! Normalization of untrusted generator output into well-formed tasks.
//!
//! The generator's identifiers are a hint, not authoritative: recipe
//! references resolve by case-insensitive name (or id) match and fall
//! back to the meal's first recipe; dependency indices out of range are
//! dropped; missing optional fields get explicit defaults; and
//! `end_minutes` is always forced to `start + duration`.

use uuid::Uuid;

use sous_store::models::{Meal, Task, TaskStatus};

use super::raw::RawTask;

/// Turn raw generator output into tasks for `meal`.
///
/// Never fails: malformed pieces are defaulted or dropped, and whatever
/// remains questionable (zero durations, impossible timing) is left for
/// the validator to flag.
pub fn normalize(meal: &Meal, raw_tasks: &[RawTask]) -> Vec<Task> {
    // Mint ids up front so dependency indices can be mapped in one pass.
    let ids: Vec<Uuid> = raw_tasks.iter().map(|_| Uuid::new_v4()).collect();

    raw_tasks
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let recipe = resolve_recipe(meal, raw.recipe.as_deref());
            let instruction_id = raw
                .step_index
                .and_then(|idx| recipe_step_id(meal, recipe, idx));

            let depends_on: Vec<Uuid> = raw
                .depends_on
                .iter()
                .filter(|&&dep| dep < raw_tasks.len() && dep != i)
                .map(|&dep| ids[dep])
                .collect();

            Task {
                id: ids[i],
                meal_id: meal.id,
                recipe_id: recipe,
                instruction_id,
                title: raw.title.clone(),
                description: raw.description.clone(),
                start_minutes: raw.start_minutes,
                duration_minutes: raw.duration_minutes,
                end_minutes: raw.start_minutes + raw.duration_minutes,
                requires_oven: raw.requires_oven.unwrap_or(false),
                oven_temp: raw.oven_temp,
                depends_on,
                status: TaskStatus::Pending,
                completed_at: None,
                notes: None,
                is_valid: true,
                validation_errors: Vec::new(),
            }
        })
        .collect()
}

/// Resolve an advisory recipe reference to a real recipe id.
///
/// Matches a real id first, then a case-insensitive name. Anything else
/// (including a missing reference) defaults to the meal's first recipe
/// rather than failing the whole generation.
fn resolve_recipe(meal: &Meal, reference: Option<&str>) -> Uuid {
    let fallback = meal.recipes.first().map(|r| r.id).unwrap_or(Uuid::nil());
    let Some(reference) = reference else {
        return fallback;
    };

    if let Ok(id) = reference.parse::<Uuid>() {
        if meal.recipes.iter().any(|r| r.id == id) {
            return id;
        }
    }

    meal.recipes
        .iter()
        .find(|r| r.name.eq_ignore_ascii_case(reference.trim()))
        .map(|r| r.id)
        .unwrap_or(fallback)
}

fn recipe_step_id(meal: &Meal, recipe_id: Uuid, step_index: usize) -> Option<Uuid> {
    meal.recipes
        .iter()
        .find(|r| r.id == recipe_id)
        .and_then(|r| r.steps.get(step_index))
        .map(|s| s.id)
}
