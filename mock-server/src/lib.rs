use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::{Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const DEFAULT_API_KEY: &str = "test-key";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub instance_handle: String,
    pub instance_type_id: String,
    pub parent_id: Option<String>,
    pub platform_id: String,
    pub platform_name: String,
    pub region_id: String,
    pub region_name: String,
    pub settings: BTreeMap<String, String>,
    pub pooler_enabled: bool,
    pub current_state: String,
    pub pending_state: Option<String>,
    pub deleted: bool,
    pub size: i64,
    pub max_project_size: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Deserialize)]
pub struct CreateAttributes {
    pub instance_handle: String,
    pub name: String,
    pub platform_id: String,
    pub region_id: String,
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

#[derive(Deserialize)]
pub struct UpdateAttributes {
    pub instance_type_id: Option<String>,
    pub name: Option<String>,
    pub pooler_enabled: Option<bool>,
    pub settings: Option<BTreeMap<String, String>>,
}

#[derive(Deserialize)]
pub struct Envelope<T> {
    pub project: T,
}

/// Shared state behind the router: the project store, the accepted API key
/// and the number of requests still to be failed with a bare 503.
#[derive(Clone)]
pub struct MockState {
    inner: Arc<Inner>,
}

struct Inner {
    projects: RwLock<HashMap<String, Project>>,
    api_key: String,
    unavailable: AtomicU32,
}

impl MockState {
    pub fn new(api_key: &str) -> Self {
        Self {
            inner: Arc::new(Inner {
                projects: RwLock::new(HashMap::new()),
                api_key: api_key.to_string(),
                unavailable: AtomicU32::new(0),
            }),
        }
    }

    /// Answer the next `n` requests with a plain-text 503.
    pub fn fail_next(&self, n: u32) {
        self.inner.unavailable.store(n, Ordering::SeqCst);
    }

    pub async fn project(&self, id: &str) -> Option<Project> {
        self.inner.projects.read().await.get(id).cloned()
    }

    pub async fn project_count(&self) -> usize {
        self.inner.projects.read().await.len()
    }

    fn take_failure(&self) -> bool {
        self.inner
            .unavailable
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for MockState {
    fn default() -> Self {
        Self::new(DEFAULT_API_KEY)
    }
}

pub fn app() -> Router {
    app_with_state(MockState::default())
}

pub fn app_with_state(state: MockState) -> Router {
    Router::new()
        .route("/api/v1/projects", post(create_project))
        .route("/api/v1/projects/{id}", get(get_project).patch(update_project))
        .route("/api/v1/projects/{id}/delete", post(delete_project))
        .route("/api/v1/projects/{id}/branches", post(create_branch))
        .layer(middleware::from_fn_with_state(state.clone(), guard))
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

fn api_error(status: StatusCode, code: &str, message: &str) -> Response {
    (status, Json(json!({ "code": code, "message": message }))).into_response()
}

fn not_found(id: &str) -> Response {
    api_error(
        StatusCode::NOT_FOUND,
        "not_found",
        &format!("project {id} not found"),
    )
}

fn timestamp() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    secs.to_string()
}

/// Fault injection first, then bearer auth.
async fn guard(State(state): State<MockState>, request: Request, next: Next) -> Response {
    if state.take_failure() {
        return (StatusCode::SERVICE_UNAVAILABLE, "upstream unavailable").into_response();
    }
    let expected = format!("Bearer {}", state.inner.api_key);
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorized {
        return api_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid API key",
        );
    }
    next.run(request).await
}

async fn create_project(
    State(state): State<MockState>,
    Json(input): Json<Envelope<CreateAttributes>>,
) -> Response {
    let input = input.project;
    let now = timestamp();
    let project = Project {
        id: Uuid::new_v4().to_string(),
        name: input.name,
        instance_handle: input.instance_handle,
        instance_type_id: "1".to_string(),
        parent_id: None,
        platform_name: input.platform_id.to_uppercase(),
        region_id: format!("{}-{}", input.platform_id, input.region_id),
        region_name: input.region_id,
        platform_id: input.platform_id,
        settings: input.settings,
        pooler_enabled: false,
        current_state: "idle".to_string(),
        pending_state: None,
        deleted: false,
        size: 0,
        max_project_size: 10240,
        created_at: now.clone(),
        updated_at: now,
    };
    state
        .inner
        .projects
        .write()
        .await
        .insert(project.id.clone(), project.clone());
    (StatusCode::CREATED, Json(project)).into_response()
}

async fn get_project(State(state): State<MockState>, Path(id): Path<String>) -> Response {
    match state.project(&id).await {
        Some(project) => Json(project).into_response(),
        None => not_found(&id),
    }
}

async fn update_project(
    State(state): State<MockState>,
    Path(id): Path<String>,
    Json(input): Json<Envelope<UpdateAttributes>>,
) -> Response {
    let input = input.project;
    let mut projects = state.inner.projects.write().await;
    let Some(project) = projects.get_mut(&id) else {
        return not_found(&id);
    };
    if let Some(name) = input.name {
        project.name = name;
    }
    if let Some(instance_type_id) = input.instance_type_id {
        project.instance_type_id = instance_type_id;
    }
    if let Some(pooler_enabled) = input.pooler_enabled {
        project.pooler_enabled = pooler_enabled;
    }
    if let Some(settings) = input.settings {
        project.settings = settings;
    }
    project.updated_at = timestamp();
    Json(project.clone()).into_response()
}

async fn delete_project(State(state): State<MockState>, Path(id): Path<String>) -> Response {
    match state.inner.projects.write().await.remove(&id) {
        Some(mut project) => {
            project.deleted = true;
            Json(project).into_response()
        }
        None => not_found(&id),
    }
}

async fn create_branch(State(state): State<MockState>, Path(id): Path<String>) -> Response {
    let mut projects = state.inner.projects.write().await;
    let Some(parent) = projects.get(&id).cloned() else {
        return not_found(&id);
    };
    let now = timestamp();
    let branch = Project {
        id: Uuid::new_v4().to_string(),
        name: format!("{} branch", parent.name),
        parent_id: Some(parent.id.clone()),
        current_state: "provisioning".to_string(),
        pending_state: Some("idle".to_string()),
        created_at: now.clone(),
        updated_at: now,
        ..parent
    };
    projects.insert(branch.id.clone(), branch.clone());
    (StatusCode::CREATED, Json(branch)).into_response()
}
