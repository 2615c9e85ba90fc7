use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use sous_core::error::SessionError;
use sous_core::generate::{generate_timeline, TaskGenerator};
use sous_core::recalc::{
    apply_suggestion, shift_pending, RecalcAdvisor, RecalcSession, RecalculationSuggestion,
};
use sous_core::session::service;
use sous_store::models::{Meal, TaskPatch, Timeline, TimelinePatch};
use sous_store::TimelineStore;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Shared state behind the request surface.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TimelineStore>,
    pub generator: Arc<dyn TaskGenerator>,
    pub advisor: Arc<dyn RecalcAdvisor>,
    /// Per-timeline behind-schedule episodes: suggestion requests are
    /// bounded per episode, and accepting a suggestion (or shifting)
    /// starts a fresh one.
    episodes: Arc<Mutex<HashMap<Uuid, RecalcSession>>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn TimelineStore>,
        generator: Arc<dyn TaskGenerator>,
        advisor: Arc<dyn RecalcAdvisor>,
    ) -> Self {
        Self {
            store,
            generator,
            advisor,
            episodes: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        let status = match &e {
            SessionError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SessionError::NotFound(_) | SessionError::TaskNotFound { .. } => StatusCode::NOT_FOUND,
            SessionError::InvalidTaskTransition { .. }
            | SessionError::InvalidRunTransition { .. } => StatusCode::CONFLICT,
            SessionError::UndoExpired { .. } => StatusCode::GONE,
            SessionError::Collaborator(_) => StatusCode::BAD_GATEWAY,
            SessionError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl AppError {
    fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TaskEditRequest {
    title: Option<String>,
    description: Option<String>,
    start_minutes: Option<i32>,
    duration_minutes: Option<i32>,
    requires_oven: Option<bool>,
    oven_temp: Option<i32>,
    depends_on: Option<Vec<Uuid>>,
    notes: Option<String>,
}

impl TaskEditRequest {
    fn into_patch(self) -> TaskPatch {
        TaskPatch {
            title: self.title,
            description: self.description.map(Some),
            start_minutes: self.start_minutes,
            duration_minutes: self.duration_minutes,
            requires_oven: self.requires_oven,
            oven_temp: self.oven_temp.map(Some),
            depends_on: self.depends_on,
            notes: self.notes.map(Some),
            status: None,
            completed_at: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TimelineEditRequest {
    /// New serve time. Task minutes are serve-relative, so this shifts
    /// the whole plan without touching any task.
    serve_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
struct ReorderRequest {
    task_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum StatusAction {
    Checkoff,
    Undo,
    Skip,
}

#[derive(Debug, Deserialize)]
struct StatusRequest {
    action: StatusAction,
}

#[derive(Debug, Default, Deserialize)]
struct RecalculateRequest {
    #[serde(default)]
    context: Option<String>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route(
            "/api/meals/{meal_id}/timeline",
            post(generate_handler).get(get_by_meal),
        )
        .route(
            "/api/timelines/{id}",
            get(get_timeline)
                .patch(edit_timeline)
                .delete(delete_timeline),
        )
        .route(
            "/api/timelines/{id}/tasks/{task_id}",
            patch(edit_task).delete(delete_task),
        )
        .route("/api/timelines/{id}/tasks/reorder", post(reorder_tasks))
        .route("/api/timelines/{id}/start", post(start_cooking))
        .route("/api/timelines/{id}/finish", post(finish_cooking))
        .route(
            "/api/timelines/{id}/tasks/{task_id}/status",
            post(update_status),
        )
        .route("/api/timelines/{id}/recalculate", post(recalculate))
        .route(
            "/api/timelines/{id}/recalculate/accept",
            post(accept_recalculation),
        )
        .route("/api/timelines/{id}/shift", post(shift))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(state: AppState, bind: &str, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("sous serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("sous serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "sous",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn generate_handler(
    State(state): State<AppState>,
    Path(meal_id): Path<Uuid>,
    Json(meal): Json<Meal>,
) -> Result<Json<Timeline>, AppError> {
    if meal.id != meal_id {
        return Err(SessionError::Validation(format!(
            "meal id in path ({meal_id}) does not match body ({})",
            meal.id
        ))
        .into());
    }
    let timeline =
        generate_timeline(state.store.as_ref(), state.generator.as_ref(), &meal).await?;
    Ok(Json(timeline))
}

async fn get_by_meal(
    State(state): State<AppState>,
    Path(meal_id): Path<Uuid>,
) -> Result<Json<Timeline>, AppError> {
    let timeline = state
        .store
        .get_by_meal(meal_id)
        .await
        .map_err(SessionError::from)?
        .ok_or_else(|| AppError::not_found(format!("no timeline for meal {meal_id}")))?;
    Ok(Json(timeline))
}

async fn get_timeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Timeline>, AppError> {
    let timeline = service::load(state.store.as_ref(), id).await?;
    Ok(Json(timeline))
}

/// Edit the serve anchor. Task times stay serve-relative, so the whole
/// plan shifts with it.
async fn edit_timeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<TimelineEditRequest>,
) -> Result<Json<Timeline>, AppError> {
    service::load(state.store.as_ref(), id).await?;
    let timeline = state
        .store
        .update_timeline(
            id,
            &TimelinePatch {
                serve_at: Some(request.serve_at),
                ..Default::default()
            },
        )
        .await
        .map_err(SessionError::from)?;
    Ok(Json(timeline))
}

async fn delete_timeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service::delete_timeline(state.store.as_ref(), id).await?;
    state.episodes.lock().await.remove(&id);
    Ok(StatusCode::NO_CONTENT)
}

async fn edit_task(
    State(state): State<AppState>,
    Path((id, task_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<TaskEditRequest>,
) -> Result<Json<Timeline>, AppError> {
    let patch = request.into_patch();
    let timeline = service::edit(state.store.as_ref(), id, task_id, &patch).await?;
    Ok(Json(timeline))
}

async fn delete_task(
    State(state): State<AppState>,
    Path((id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Timeline>, AppError> {
    let timeline = service::delete_task(state.store.as_ref(), id, task_id).await?;
    Ok(Json(timeline))
}

async fn reorder_tasks(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReorderRequest>,
) -> Result<Json<Timeline>, AppError> {
    let timeline = service::reorder(state.store.as_ref(), id, &request.task_ids).await?;
    Ok(Json(timeline))
}

async fn start_cooking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Timeline>, AppError> {
    let timeline = service::start(state.store.as_ref(), id, Utc::now()).await?;
    Ok(Json(timeline))
}

async fn finish_cooking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Timeline>, AppError> {
    let timeline = service::finish(state.store.as_ref(), id).await?;
    state.episodes.lock().await.remove(&id);
    Ok(Json(timeline))
}

/// Checkoff, undo, and skip. The undo deadline is checked here against
/// the server's clock; a timestamp in the request body would not be
/// trusted, so none is accepted.
async fn update_status(
    State(state): State<AppState>,
    Path((id, task_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<Timeline>, AppError> {
    let store = state.store.as_ref();
    let timeline = match request.action {
        StatusAction::Checkoff => service::checkoff(store, id, task_id, Utc::now()).await?,
        StatusAction::Undo => service::undo(store, id, task_id, Utc::now()).await?,
        StatusAction::Skip => service::skip(store, id, task_id).await?,
    };
    Ok(Json(timeline))
}

async fn recalculate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RecalculateRequest>,
) -> Result<Json<RecalculationSuggestion>, AppError> {
    let timeline = service::load(state.store.as_ref(), id).await?;

    let mut episodes = state.episodes.lock().await;
    let episode = episodes.entry(id).or_default();
    let suggestion = episode
        .suggest(
            state.advisor.as_ref(),
            &timeline,
            Utc::now(),
            request.context.as_deref(),
        )
        .await?;
    Ok(Json(suggestion))
}

async fn accept_recalculation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(suggestion): Json<RecalculationSuggestion>,
) -> Result<Json<Timeline>, AppError> {
    let timeline = apply_suggestion(state.store.as_ref(), id, &suggestion).await?;
    // Accepting means the cook is back on plan: start a fresh episode.
    state.episodes.lock().await.remove(&id);
    Ok(Json(timeline))
}

/// Replay arm of the offline fallback: uniformly shift pending tasks,
/// last-write-wins.
async fn shift(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Timeline>, AppError> {
    let timeline = shift_pending(state.store.as_ref(), id).await?;
    state.episodes.lock().await.remove(&id);
    Ok(Json(timeline))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Duration;
    use tower::ServiceExt;

    use sous_core::generate::HeuristicGenerator;
    use sous_core::recalc::LocalAdvisor;
    use sous_store::models::TaskStatus;
    use sous_store::{MemoryStore, TimelineStore};
    use sous_test_utils::{meal_with_recipes, pending_task, recipe, seed_timeline};

    fn test_state() -> (AppState, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(
            store.clone(),
            Arc::new(HeuristicGenerator::new()),
            Arc::new(LocalAdvisor::new()),
        );
        (state, store)
    }

    async fn send(
        state: AppState,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> axum::response::Response {
        let app = build_router(state);
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.oneshot(request).await.unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn index_reports_service_name() {
        let (state, _) = test_state();
        let resp = send(state, "GET", "/", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["name"], "sous");
    }

    #[tokio::test]
    async fn generate_creates_timeline() {
        let (state, _) = test_state();
        let meal = meal_with_recipes(vec![recipe("Soup", &[("Chop", 15), ("Simmer", 45)])]);
        let resp = send(
            state,
            "POST",
            &format!("/api/meals/{}/timeline", meal.id),
            Some(serde_json::to_value(&meal).unwrap()),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["meal_id"], meal.id.to_string());
        assert_eq!(json["tasks"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn generate_with_no_recipes_is_422() {
        let (state, _) = test_state();
        let meal = meal_with_recipes(vec![]);
        let resp = send(
            state,
            "POST",
            &format!("/api/meals/{}/timeline", meal.id),
            Some(serde_json::to_value(&meal).unwrap()),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn generate_with_mismatched_path_id_is_422() {
        let (state, _) = test_state();
        let meal = meal_with_recipes(vec![recipe("Soup", &[("Chop", 15)])]);
        let resp = send(
            state,
            "POST",
            &format!("/api/meals/{}/timeline", Uuid::new_v4()),
            Some(serde_json::to_value(&meal).unwrap()),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn get_missing_timeline_is_404() {
        let (state, _) = test_state();
        let resp = send(
            state,
            "GET",
            &format!("/api/timelines/{}", Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn start_and_checkoff_flow() {
        let (state, store) = test_state();
        let meal_id = Uuid::new_v4();
        let timeline = seed_timeline(
            store.as_ref(),
            vec![
                pending_task(meal_id, "Brine", -300, 60),
                pending_task(meal_id, "Roast", -180, 170),
            ],
        )
        .await;
        let brine_id = timeline.tasks[0].id;

        let resp = send(
            state.clone(),
            "POST",
            &format!("/api/timelines/{}/start", timeline.id),
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(
            state,
            "POST",
            &format!("/api/timelines/{}/tasks/{}/status", timeline.id, brine_id),
            Some(serde_json::json!({ "action": "checkoff" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        let brine = json["tasks"]
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["id"] == brine_id.to_string())
            .unwrap();
        assert_eq!(brine["status"], "completed");
    }

    #[tokio::test]
    async fn double_checkoff_is_409() {
        let (state, store) = test_state();
        let meal_id = Uuid::new_v4();
        let timeline =
            seed_timeline(store.as_ref(), vec![pending_task(meal_id, "Brine", -300, 60)]).await;
        let brine_id = timeline.tasks[0].id;
        let uri = format!("/api/timelines/{}/tasks/{}/status", timeline.id, brine_id);
        let body = serde_json::json!({ "action": "checkoff" });

        let resp = send(state.clone(), "POST", &uri, Some(body.clone())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let resp = send(state, "POST", &uri, Some(body)).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn expired_undo_is_410() {
        let (state, store) = test_state();
        let meal_id = Uuid::new_v4();
        let timeline =
            seed_timeline(store.as_ref(), vec![pending_task(meal_id, "Brine", -300, 60)]).await;
        let brine_id = timeline.tasks[0].id;

        send(
            state.clone(),
            "POST",
            &format!("/api/timelines/{}/tasks/{}/status", timeline.id, brine_id),
            Some(serde_json::json!({ "action": "checkoff" })),
        )
        .await;

        // Backdate the completion past the window.
        store
            .update_task(
                timeline.id,
                brine_id,
                &TaskPatch {
                    completed_at: Some(Some(Utc::now() - Duration::seconds(45))),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let resp = send(
            state,
            "POST",
            &format!("/api/timelines/{}/tasks/{}/status", timeline.id, brine_id),
            Some(serde_json::json!({ "action": "undo" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::GONE);
    }

    #[tokio::test]
    async fn edit_task_applies_patch() {
        let (state, store) = test_state();
        let meal_id = Uuid::new_v4();
        let timeline =
            seed_timeline(store.as_ref(), vec![pending_task(meal_id, "Brine", -300, 60)]).await;
        let brine_id = timeline.tasks[0].id;

        let resp = send(
            state,
            "PATCH",
            &format!("/api/timelines/{}/tasks/{}", timeline.id, brine_id),
            Some(serde_json::json!({ "start_minutes": -240, "notes": "start late" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        let task = &json["tasks"].as_array().unwrap()[0];
        assert_eq!(task["start_minutes"], -240);
        assert_eq!(task["end_minutes"], -180);
        assert_eq!(task["notes"], "start late");
    }

    #[tokio::test]
    async fn delete_task_returns_refreshed_timeline() {
        let (state, store) = test_state();
        let meal_id = Uuid::new_v4();
        let a = pending_task(meal_id, "A", -60, 10);
        let mut b = pending_task(meal_id, "B", -40, 10);
        b.depends_on = vec![a.id];
        let a_id = a.id;
        let timeline = seed_timeline(store.as_ref(), vec![a, b]).await;

        let resp = send(
            state,
            "DELETE",
            &format!("/api/timelines/{}/tasks/{}", timeline.id, a_id),
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        let tasks = json["tasks"].as_array().unwrap();
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0]["depends_on"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn reorder_changes_display_order() {
        let (state, store) = test_state();
        let meal_id = Uuid::new_v4();
        let timeline = seed_timeline(
            store.as_ref(),
            vec![
                pending_task(meal_id, "A", -60, 10),
                pending_task(meal_id, "B", -40, 10),
            ],
        )
        .await;
        let (a_id, b_id) = (timeline.tasks[0].id, timeline.tasks[1].id);

        let resp = send(
            state,
            "POST",
            &format!("/api/timelines/{}/tasks/reorder", timeline.id),
            Some(serde_json::json!({ "task_ids": [b_id, a_id] })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        let tasks = json["tasks"].as_array().unwrap();
        assert_eq!(tasks[0]["id"], b_id.to_string());
    }

    #[tokio::test]
    async fn recalculate_limits_one_episode_to_three_requests() {
        let (state, store) = test_state();
        let meal_id = Uuid::new_v4();
        // Serve an hour from now; a task that should have started 90
        // minutes before serve is overdue.
        let timeline =
            seed_timeline(store.as_ref(), vec![pending_task(meal_id, "Simmer", -90, 30)]).await;
        let uri = format!("/api/timelines/{}/recalculate", timeline.id);

        for _ in 0..3 {
            let resp = send(state.clone(), "POST", &uri, Some(serde_json::json!({}))).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }
        let resp = send(state, "POST", &uri, Some(serde_json::json!({}))).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn accept_applies_suggestion_and_resets_episode() {
        let (state, store) = test_state();
        let meal_id = Uuid::new_v4();
        let timeline =
            seed_timeline(store.as_ref(), vec![pending_task(meal_id, "Simmer", -90, 30)]).await;
        let simmer_id = timeline.tasks[0].id;

        let resp = send(
            state.clone(),
            "POST",
            &format!("/api/timelines/{}/recalculate", timeline.id),
            Some(serde_json::json!({ "context": "running 30 late" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let suggestion = body_json(resp).await;
        assert_eq!(suggestion["task_id"], simmer_id.to_string());

        let resp = send(
            state,
            "POST",
            &format!("/api/timelines/{}/recalculate/accept", timeline.id),
            Some(suggestion.clone()),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(
            json["tasks"][0]["start_minutes"],
            suggestion["new_start_minutes"]
        );
    }

    #[tokio::test]
    async fn shift_adds_fifteen_minutes_to_pending() {
        let (state, store) = test_state();
        let meal_id = Uuid::new_v4();
        let timeline =
            seed_timeline(store.as_ref(), vec![pending_task(meal_id, "Simmer", -90, 30)]).await;

        let resp = send(
            state,
            "POST",
            &format!("/api/timelines/{}/shift", timeline.id),
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["tasks"][0]["start_minutes"], -75);
    }

    #[tokio::test]
    async fn edit_serve_time_shifts_the_anchor_not_the_tasks() {
        let (state, store) = test_state();
        let meal_id = Uuid::new_v4();
        let timeline =
            seed_timeline(store.as_ref(), vec![pending_task(meal_id, "Simmer", -90, 30)]).await;
        let new_serve = Utc::now() + Duration::hours(3);

        let resp = send(
            state,
            "PATCH",
            &format!("/api/timelines/{}", timeline.id),
            Some(serde_json::json!({ "serve_at": new_serve })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        // Relative task times are untouched; only the anchor moved.
        assert_eq!(json["tasks"][0]["start_minutes"], -90);
        let stored = store.get(timeline.id).await.unwrap().unwrap();
        assert_eq!(stored.serve_at, new_serve);
    }

    #[tokio::test]
    async fn delete_timeline_then_get_is_404() {
        let (state, store) = test_state();
        let meal_id = Uuid::new_v4();
        let timeline =
            seed_timeline(store.as_ref(), vec![pending_task(meal_id, "Simmer", -90, 30)]).await;

        let resp = send(
            state.clone(),
            "DELETE",
            &format!("/api/timelines/{}", timeline.id),
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = send(
            state,
            "GET",
            &format!("/api/timelines/{}", timeline.id),
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn finish_ends_run_and_skip_marks_task() {
        let (state, store) = test_state();
        let meal_id = Uuid::new_v4();
        let timeline = seed_timeline(
            store.as_ref(),
            vec![
                pending_task(meal_id, "Brine", -300, 60),
                pending_task(meal_id, "Roast", -180, 170),
            ],
        )
        .await;
        let brine_id = timeline.tasks[0].id;

        send(
            state.clone(),
            "POST",
            &format!("/api/timelines/{}/start", timeline.id),
            None,
        )
        .await;

        let resp = send(
            state.clone(),
            "POST",
            &format!("/api/timelines/{}/tasks/{}/status", timeline.id, brine_id),
            Some(serde_json::json!({ "action": "skip" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        let brine = json["tasks"]
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["id"] == brine_id.to_string())
            .unwrap();
        assert_eq!(brine["status"], "skipped");

        let resp = send(
            state,
            "POST",
            &format!("/api/timelines/{}/finish", timeline.id),
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["run_state"], "ended");
    }

    #[tokio::test]
    async fn task_status_matches_wire_format() {
        // The wire format is snake_case throughout.
        assert_eq!(
            serde_json::to_value(TaskStatus::InProgress).unwrap(),
            serde_json::json!("in_progress")
        );
    }
}
