//! In-memory imitation of the ClickUp v2 API for tests.
//!
//! Serves a single workspace under `/api/v2`: workspace listing, task CRUD
//! on lists, and a paged workspace task listing. Every request is checked
//! against a fixed token and counted against a rate-limit window; the
//! `X-RateLimit-*` headers go on every response.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Length of the rate-limit window, in seconds.
const RATE_WINDOW_SECS: u64 = 60;

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub members: Vec<serde_json::Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Status {
    pub status: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub orderindex: u32,
}

impl Status {
    fn named(name: &str) -> Self {
        let (kind, orderindex) = match name {
            "to do" | "open" => ("open", 0),
            "complete" | "closed" => ("closed", 2),
            _ => ("custom", 1),
        };
        Self {
            status: name.to_string(),
            kind: kind.to_string(),
            orderindex,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListRef {
    pub id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: Status,
    pub tags: Vec<serde_json::Value>,
    pub list: ListRef,
    pub team_id: String,
    pub url: String,
}

#[derive(Deserialize)]
pub struct CreateTask {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateTask {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: u32,
}

/// Error body in the service's `{"err", "ECODE"}` shape.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub err: &'static str,
    #[serde(rename = "ECODE")]
    pub code: &'static str,
}

impl ApiError {
    pub fn new(status: StatusCode, err: &'static str, code: &'static str) -> Self {
        Self { status, err, code }
    }

    fn task_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Task not found", "ITEM_013")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(&self)).into_response()
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Knobs for a server instance.
#[derive(Clone, Debug)]
pub struct MockConfig {
    /// Accepted as `Authorization: <token>` or `Authorization: Bearer <token>`.
    pub token: String,
    pub team_id: String,
    /// Items per page on `team/{id}/task`.
    pub page_size: usize,
    /// Pages of `team/{id}/task` that answer 500.
    pub failing_pages: Vec<u32>,
    /// Requests allowed per window before answering 403. The count starts
    /// over once the advertised reset time has passed.
    pub rate_limit: u32,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            token: "pk_mock_token".to_string(),
            team_id: "9001".to_string(),
            page_size: 100,
            failing_pages: Vec::new(),
            rate_limit: 100,
        }
    }
}

pub type Db = Arc<RwLock<Vec<Task>>>;

/// Requests served in the current rate-limit window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Quota {
    served: u32,
    /// Unix seconds at which the window resets.
    reset_at: u64,
}

impl Quota {
    fn starting_at(now: u64) -> Self {
        Self {
            served: 0,
            reset_at: now + RATE_WINDOW_SECS,
        }
    }

    /// Count one request at `now`, opening a new window if the old one ended.
    fn take(&mut self, now: u64) -> (u32, u64) {
        if now >= self.reset_at {
            *self = Self::starting_at(now);
        }
        self.served = self.served.saturating_add(1);
        (self.served, self.reset_at)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[derive(Clone)]
pub struct AppState {
    config: Arc<MockConfig>,
    db: Db,
    quota: Arc<Mutex<Quota>>,
}

impl AppState {
    fn new(config: MockConfig) -> Self {
        Self {
            config: Arc::new(config),
            db: Arc::new(RwLock::new(Vec::new())),
            quota: Arc::new(Mutex::new(Quota::starting_at(unix_now()))),
        }
    }
}

pub fn app() -> Router {
    app_with(MockConfig::default())
}

pub fn app_with(config: MockConfig) -> Router {
    let state = AppState::new(config);
    let api = Router::new()
        .route("/team", get(list_workspaces))
        .route("/team/{team_id}/task", get(team_tasks))
        .route("/list/{list_id}/task", get(list_tasks).post(create_task))
        .route("/task/{id}", get(get_task).put(update_task).delete(delete_task))
        .layer(middleware::from_fn_with_state(state.clone(), guard))
        .with_state(state);
    Router::new().nest("/api/v2", api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, MockConfig::default()).await
}

pub async fn run_with(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(config)).await
}

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

/// Count the request, enforce quota and token, and stamp rate headers.
async fn guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let (served, reset_at) = state
        .quota
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take(unix_now());
    let limit = state.config.rate_limit;

    let mut response = if served > limit {
        debug!(served, limit, "rate limit reached");
        ApiError::new(StatusCode::FORBIDDEN, "Rate limit reached", "APP_002").into_response()
    } else if !authorized(&state.config.token, request.headers()) {
        debug!(uri = %request.uri(), "rejecting request with bad token");
        ApiError::new(StatusCode::UNAUTHORIZED, "Token invalid", "OAUTH_025").into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(limit.saturating_sub(served)));
    headers.insert("x-ratelimit-reset", HeaderValue::from(reset_at));
    response
}

fn authorized(token: &str, headers: &HeaderMap) -> bool {
    let Some(value) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    value == token || value.strip_prefix("Bearer ") == Some(token)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn list_workspaces(State(state): State<AppState>) -> Json<serde_json::Value> {
    let team = Workspace {
        id: state.config.team_id.clone(),
        name: "Mock Workspace".to_string(),
        members: Vec::new(),
    };
    Json(serde_json::json!({ "teams": [team] }))
}

async fn team_tasks(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if team_id != state.config.team_id {
        return Err(ApiError::new(
            StatusCode::UNAUTHORIZED,
            "Team not authorized",
            "OAUTH_027",
        ));
    }
    if state.config.failing_pages.contains(&query.page) {
        return Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            "APP_500",
        ));
    }

    let tasks = state.db.read().await;
    let size = state.config.page_size.max(1);
    let start = (query.page as usize).saturating_mul(size);
    let page: Vec<Task> = tasks.iter().skip(start).take(size).cloned().collect();
    let last_page = start.saturating_add(size) >= tasks.len();
    Ok(Json(serde_json::json!({ "tasks": page, "last_page": last_page })))
}

async fn list_tasks(
    State(state): State<AppState>,
    Path(list_id): Path<String>,
) -> Json<serde_json::Value> {
    let tasks = state.db.read().await;
    let in_list: Vec<&Task> = tasks.iter().filter(|t| t.list.id == list_id).collect();
    Json(serde_json::json!({ "tasks": in_list }))
}

async fn create_task(
    State(state): State<AppState>,
    Path(list_id): Path<String>,
    Json(input): Json<CreateTask>,
) -> Result<Json<Task>, ApiError> {
    if input.name.trim().is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Task name invalid",
            "INPUT_005",
        ));
    }

    let id = Uuid::new_v4().simple().to_string();
    let task = Task {
        url: format!("https://app.clickup.com/t/{id}"),
        id,
        name: input.name,
        description: input.description,
        status: Status::named(input.status.as_deref().unwrap_or("to do")),
        tags: Vec::new(),
        list: ListRef { id: list_id },
        team_id: state.config.team_id.clone(),
    };
    info!(id = %task.id, list = %task.list.id, "task created");
    state.db.write().await.push(task.clone());
    Ok(Json(task))
}

async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let tasks = state.db.read().await;
    tasks
        .iter()
        .find(|t| t.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(ApiError::task_not_found)
}

async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateTask>,
) -> Result<Json<Task>, ApiError> {
    let mut tasks = state.db.write().await;
    let task = tasks
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or_else(ApiError::task_not_found)?;
    if let Some(name) = input.name {
        task.name = name;
    }
    if let Some(description) = input.description {
        task.description = description;
    }
    if let Some(status) = input.status {
        task.status = Status::named(&status);
    }
    Ok(Json(task.clone()))
}

async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut tasks = state.db.write().await;
    let index = tasks
        .iter()
        .position(|t| t.id == id)
        .ok_or_else(ApiError::task_not_found)?;
    tasks.remove(index);
    info!(%id, "task deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_serializes_service_shape() {
        let err = ApiError::new(StatusCode::UNAUTHORIZED, "Token invalid", "OAUTH_025");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json, serde_json::json!({"err": "Token invalid", "ECODE": "OAUTH_025"}));
    }

    #[test]
    fn token_accepted_raw_or_as_bearer() {
        let mut headers = HeaderMap::new();
        assert!(!authorized("pk_1", &headers));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("pk_1"));
        assert!(authorized("pk_1", &headers));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer pk_1"));
        assert!(authorized("pk_1", &headers));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("pk_2"));
        assert!(!authorized("pk_1", &headers));
    }

    #[test]
    fn quota_starts_over_after_reset() {
        let mut quota = Quota::starting_at(1_000);
        assert_eq!(quota.take(1_000), (1, 1_060));
        assert_eq!(quota.take(1_059), (2, 1_060));
        assert_eq!(quota.take(1_060), (1, 1_120));
        assert_eq!(quota.take(1_200), (1, 1_260));
    }

    #[test]
    fn status_names_map_to_types() {
        assert_eq!(Status::named("to do").kind, "open");
        assert_eq!(Status::named("complete").kind, "closed");
        assert_eq!(Status::named("in review").kind, "custom");
    }

    #[test]
    fn create_task_defaults_missing_fields() {
        let input: CreateTask = serde_json::from_str(r#"{"name":"Buy milk"}"#).unwrap();
        assert_eq!(input.name, "Buy milk");
        assert!(input.description.is_empty());
        assert!(input.status.is_none());
    }

    #[test]
    fn update_task_all_fields_optional() {
        let input: UpdateTask = serde_json::from_str("{}").unwrap();
        assert!(input.name.is_none());
        assert!(input.description.is_none());
        assert!(input.status.is_none());
    }
}
