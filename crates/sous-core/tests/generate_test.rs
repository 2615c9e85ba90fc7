//! Integration tests for the generation orchestrator: preconditions,
//! normalization of untrusted output, conflict surfacing, regeneration,
//! and the rollback of orphaned timeline rows.

use uuid::Uuid;

use sous_core::error::SessionError;
use sous_core::generate::{generate_timeline, HeuristicGenerator};
use sous_store::models::{ConflictKind, Meal, TaskStatus};
use sous_store::{MemoryStore, TimelineStore};
use sous_test_utils::{meal_with_recipes, raw_task, recipe, FlakyStore, ScriptedGenerator};

fn simple_meal() -> Meal {
    meal_with_recipes(vec![recipe(
        "Mushroom Risotto",
        &[("Prep stock", 10), ("Stir rice", 30), ("Rest", 5)],
    )])
}

#[tokio::test]
async fn rejects_meal_with_no_recipes() {
    let store = MemoryStore::new();
    // A generator that would blow up if contacted.
    let generator = ScriptedGenerator::failing("must not be called");
    let meal = meal_with_recipes(vec![]);

    let result = generate_timeline(&store, &generator, &meal).await;
    assert!(
        matches!(result, Err(SessionError::Validation(_))),
        "zero recipes must be rejected before any collaborator call"
    );
}

#[tokio::test]
async fn rejects_nil_meal_id() {
    let store = MemoryStore::new();
    let generator = ScriptedGenerator::failing("must not be called");
    let mut meal = simple_meal();
    meal.id = Uuid::nil();

    let result = generate_timeline(&store, &generator, &meal).await;
    assert!(matches!(result, Err(SessionError::Validation(_))));
}

#[tokio::test]
async fn generator_failure_is_collaborator_error_and_persists_nothing() {
    let store = MemoryStore::new();
    let generator = ScriptedGenerator::failing("service unreachable");
    let meal = simple_meal();

    let result = generate_timeline(&store, &generator, &meal).await;
    assert!(matches!(result, Err(SessionError::Collaborator(_))));
    assert!(store.get_by_meal(meal.id).await.unwrap().is_none());
}

#[tokio::test]
async fn generated_timeline_is_persisted_and_normalized() {
    let store = MemoryStore::new();
    let mut roast = raw_task("Roast", -90, 60);
    roast.recipe = Some("mushroom risotto".to_string());
    let mut rest = raw_task("Rest", -30, 30);
    rest.depends_on = vec![0];
    let generator = ScriptedGenerator::ok(vec![roast, rest]);
    let meal = simple_meal();

    let timeline = generate_timeline(&store, &generator, &meal).await.unwrap();
    assert_eq!(timeline.meal_id, meal.id);
    assert_eq!(timeline.serve_at, meal.serve_at);
    assert_eq!(timeline.tasks.len(), 2);
    for task in &timeline.tasks {
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.end_minutes, task.start_minutes + task.duration_minutes);
        assert_eq!(task.recipe_id, meal.recipes[0].id);
    }
    assert_eq!(timeline.tasks[1].depends_on, vec![timeline.tasks[0].id]);

    let stored = store.get_by_meal(meal.id).await.unwrap().unwrap();
    assert_eq!(stored.id, timeline.id);
}

#[tokio::test]
async fn conflicts_are_surfaced_but_not_fatal() {
    let store = MemoryStore::new();
    let mut turkey = raw_task("Roast turkey", -180, 180);
    turkey.requires_oven = Some(true);
    turkey.oven_temp = Some(350);
    let mut pie = raw_task("Bake pie", -60, 45);
    pie.requires_oven = Some(true);
    pie.oven_temp = Some(400);
    let generator = ScriptedGenerator::ok(vec![turkey, pie]);
    let meal = simple_meal();

    let timeline = generate_timeline(&store, &generator, &meal).await.unwrap();
    assert!(timeline.has_conflicts);
    assert_eq!(timeline.conflicts.len(), 1);
    assert_eq!(timeline.conflicts[0].kind, ConflictKind::OvenOverlap);
}

#[tokio::test]
async fn regeneration_replaces_tasks_but_keeps_identity() {
    let store = MemoryStore::new();
    let meal = simple_meal();

    let first_gen = ScriptedGenerator::ok(vec![raw_task("Old task", -60, 30)]);
    let first = generate_timeline(&store, &first_gen, &meal).await.unwrap();

    let second_gen = ScriptedGenerator::ok(vec![
        raw_task("New A", -45, 15),
        raw_task("New B", -30, 30),
    ]);
    let second = generate_timeline(&store, &second_gen, &meal).await.unwrap();

    assert_eq!(second.id, first.id, "regeneration keeps the timeline row");
    assert_eq!(second.tasks.len(), 2);
    assert!(second.tasks.iter().all(|t| t.title.starts_with("New")));
}

#[tokio::test]
async fn task_insert_failure_rolls_back_fresh_timeline() {
    let store = FlakyStore::new();
    store.fail_next("insert_tasks", 1);
    let generator = ScriptedGenerator::ok(vec![raw_task("Roast", -90, 60)]);
    let meal = simple_meal();

    let result = generate_timeline(&store, &generator, &meal).await;
    assert!(matches!(result, Err(SessionError::Storage(_))));
    assert!(
        store.get_by_meal(meal.id).await.unwrap().is_none(),
        "orphaned timeline row must be rolled back"
    );
}

#[tokio::test]
async fn heuristic_generator_end_to_end() {
    let store = MemoryStore::new();
    let generator = HeuristicGenerator::new();
    let meal = simple_meal();

    let timeline = generate_timeline(&store, &generator, &meal).await.unwrap();
    assert_eq!(timeline.tasks.len(), 3);
    assert!(!timeline.has_conflicts, "{:?}", timeline.conflicts);
    // Steps chain, so the last one ends exactly at serve.
    let last = timeline
        .tasks
        .iter()
        .max_by_key(|t| t.end_minutes)
        .unwrap();
    assert_eq!(last.end_minutes, 0);
}
