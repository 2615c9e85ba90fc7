//! Integration tests for the in-memory store: the full CRUD contract,
//! including the refreshed-timeline return value on every mutation.

use chrono::Utc;
use uuid::Uuid;

use sous_store::models::{Task, TaskPatch, TaskStatus, Timeline, TimelinePatch};
use sous_store::store::StoreError;
use sous_store::{MemoryStore, TimelineStore};

fn task(meal_id: Uuid, title: &str, start: i32, duration: i32) -> Task {
    Task::new(meal_id, Uuid::new_v4(), title, start, duration)
}

fn timeline_with_tasks(titles: &[(&str, i32, i32)]) -> Timeline {
    let meal_id = Uuid::new_v4();
    let mut timeline = Timeline::new(meal_id, Utc::now());
    timeline.tasks = titles
        .iter()
        .map(|(title, start, duration)| task(meal_id, title, *start, *duration))
        .collect();
    timeline
}

#[tokio::test]
async fn insert_and_get_timeline() {
    let store = MemoryStore::new();
    let timeline = timeline_with_tasks(&[("Roast turkey", -180, 180)]);

    let stored = store.insert_timeline(&timeline).await.unwrap();
    assert_eq!(stored.id, timeline.id);

    let fetched = store.get(timeline.id).await.unwrap().expect("should exist");
    assert_eq!(fetched.tasks.len(), 1);
    assert_eq!(fetched.tasks[0].title, "Roast turkey");
}

#[tokio::test]
async fn get_by_meal_finds_timeline() {
    let store = MemoryStore::new();
    let timeline = timeline_with_tasks(&[("Bake pie", -60, 45)]);
    store.insert_timeline(&timeline).await.unwrap();

    let fetched = store
        .get_by_meal(timeline.meal_id)
        .await
        .unwrap()
        .expect("should exist");
    assert_eq!(fetched.id, timeline.id);
}

#[tokio::test]
async fn get_missing_timeline_is_none() {
    let store = MemoryStore::new();
    assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    assert!(store.get_by_meal(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn second_timeline_for_same_meal_is_rejected() {
    let store = MemoryStore::new();
    let timeline = timeline_with_tasks(&[]);
    store.insert_timeline(&timeline).await.unwrap();

    let mut duplicate = Timeline::new(timeline.meal_id, Utc::now());
    duplicate.meal_id = timeline.meal_id;
    let result = store.insert_timeline(&duplicate).await;
    assert!(matches!(result, Err(StoreError::Unavailable(_))));
}

#[tokio::test]
async fn insert_tasks_appends_and_returns_refreshed() {
    let store = MemoryStore::new();
    let timeline = timeline_with_tasks(&[("Brine", -300, 60)]);
    store.insert_timeline(&timeline).await.unwrap();

    let extra = task(timeline.meal_id, "Rest", -20, 20);
    let refreshed = store.insert_tasks(timeline.id, &[extra]).await.unwrap();
    assert_eq!(refreshed.tasks.len(), 2);
}

#[tokio::test]
async fn replace_tasks_is_full_swap() {
    let store = MemoryStore::new();
    let timeline = timeline_with_tasks(&[("Old A", -60, 10), ("Old B", -50, 10)]);
    store.insert_timeline(&timeline).await.unwrap();

    let fresh = vec![task(timeline.meal_id, "New", -30, 15)];
    let refreshed = store.replace_tasks(timeline.id, &fresh).await.unwrap();
    assert_eq!(refreshed.tasks.len(), 1);
    assert_eq!(refreshed.tasks[0].title, "New");
}

#[tokio::test]
async fn delete_timeline_removes_meal_mapping() {
    let store = MemoryStore::new();
    let timeline = timeline_with_tasks(&[]);
    store.insert_timeline(&timeline).await.unwrap();

    store.delete_timeline(timeline.id).await.unwrap();
    assert!(store.get(timeline.id).await.unwrap().is_none());
    assert!(store.get_by_meal(timeline.meal_id).await.unwrap().is_none());

    let again = store.delete_timeline(timeline.id).await;
    assert!(matches!(again, Err(StoreError::TimelineNotFound(_))));
}

#[tokio::test]
async fn update_task_applies_patch_and_recomputes_end() {
    let store = MemoryStore::new();
    let timeline = timeline_with_tasks(&[("Bake pie", -60, 45)]);
    store.insert_timeline(&timeline).await.unwrap();
    let task_id = timeline.tasks[0].id;

    let patch = TaskPatch {
        start_minutes: Some(-90),
        ..Default::default()
    };
    let refreshed = store.update_task(timeline.id, task_id, &patch).await.unwrap();
    let updated = refreshed.task(task_id).unwrap();
    assert_eq!(updated.start_minutes, -90);
    assert_eq!(updated.end_minutes, -45);
}

#[tokio::test]
async fn update_missing_task_errors() {
    let store = MemoryStore::new();
    let timeline = timeline_with_tasks(&[]);
    store.insert_timeline(&timeline).await.unwrap();

    let result = store
        .update_task(timeline.id, Uuid::new_v4(), &TaskPatch::default())
        .await;
    assert!(matches!(result, Err(StoreError::TaskNotFound { .. })));
}

#[tokio::test]
async fn delete_task_scrubs_dependencies() {
    let store = MemoryStore::new();
    let meal_id = Uuid::new_v4();
    let mut timeline = Timeline::new(meal_id, Utc::now());
    let a = task(meal_id, "Brine", -300, 60);
    let mut b = task(meal_id, "Roast", -180, 180);
    b.depends_on = vec![a.id];
    let a_id = a.id;
    timeline.tasks = vec![a, b];
    store.insert_timeline(&timeline).await.unwrap();

    let refreshed = store.delete_task(timeline.id, a_id).await.unwrap();
    assert_eq!(refreshed.tasks.len(), 1);
    assert!(refreshed.tasks[0].depends_on.is_empty());
}

#[tokio::test]
async fn reorder_tasks_persists_display_order() {
    let store = MemoryStore::new();
    let timeline = timeline_with_tasks(&[("a", -60, 10), ("b", -50, 10)]);
    store.insert_timeline(&timeline).await.unwrap();
    let (a_id, b_id) = (timeline.tasks[0].id, timeline.tasks[1].id);

    let refreshed = store.reorder_tasks(timeline.id, &[b_id, a_id]).await.unwrap();
    let order: Vec<Uuid> = refreshed.tasks.iter().map(|t| t.id).collect();
    assert_eq!(order, vec![b_id, a_id]);
}

#[tokio::test]
async fn update_timeline_patch_sets_status_fields() {
    let store = MemoryStore::new();
    let timeline = timeline_with_tasks(&[("a", -60, 10)]);
    store.insert_timeline(&timeline).await.unwrap();
    let task_id = timeline.tasks[0].id;

    let patch = TimelinePatch {
        run_state: Some(sous_store::models::RunState::Running),
        started_at: Some(chrono::Utc::now()),
        current_task_id: Some(Some(task_id)),
        ..Default::default()
    };
    let refreshed = store.update_timeline(timeline.id, &patch).await.unwrap();
    assert!(refreshed.is_running());
    assert_eq!(refreshed.current_task_id, Some(task_id));
    assert!(refreshed.started_at.is_some());
}

#[tokio::test]
async fn status_patch_reaches_task() {
    let store = MemoryStore::new();
    let timeline = timeline_with_tasks(&[("a", -60, 10)]);
    store.insert_timeline(&timeline).await.unwrap();
    let task_id = timeline.tasks[0].id;

    let patch = TaskPatch {
        status: Some(TaskStatus::Completed),
        completed_at: Some(Some(chrono::Utc::now())),
        ..Default::default()
    };
    let refreshed = store.update_task(timeline.id, task_id, &patch).await.unwrap();
    let updated = refreshed.task(task_id).unwrap();
    assert_eq!(updated.status, TaskStatus::Completed);
    assert!(updated.completed_at.is_some());
}
