//! Mock platform API served on a local port

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const TOKEN: &str = "tok-alice";

type ApiError = (StatusCode, Json<Value>);
type ApiResult = Result<Json<Value>, ApiError>;

/// What the mock knows and what it has seen
pub struct PlatformState {
    revoked: AtomicBool,
    reject_delay_ms: AtomicU64,
    next_id: AtomicI64,
    projects: Mutex<Vec<Value>>,
    deployments: Mutex<Vec<Value>>,
    alerts: Mutex<Vec<Value>>,
    hits: Mutex<HashMap<String, usize>>,
    auth_headers: Mutex<HashMap<String, Option<String>>>,
}

impl PlatformState {
    fn seeded() -> Self {
        Self {
            revoked: AtomicBool::new(false),
            reject_delay_ms: AtomicU64::new(0),
            next_id: AtomicI64::new(100),
            projects: Mutex::new(vec![json!({
                "id": 7, "name": "web", "slug": "web", "organization_id": 1, "is_active": true
            })]),
            deployments: Mutex::new(vec![json!({
                "id": 1, "project_id": 7, "environment": "staging",
                "version": "v1.0.0", "status": "success"
            })]),
            alerts: Mutex::new(vec![json!({
                "id": 3, "title": "Disk full", "severity": "critical",
                "status": "active", "organization_id": 1
            })]),
            hits: Mutex::new(HashMap::new()),
            auth_headers: Mutex::new(HashMap::new()),
        }
    }

    /// Every credential stops working, rejections answered after `delay`
    pub fn revoke(&self, delay: Duration) {
        self.reject_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
        self.revoked.store(true, Ordering::SeqCst);
    }

    /// Number of requests seen for `route` (e.g. "GET /projects")
    pub fn hits(&self, route: &str) -> usize {
        self.hits.lock().unwrap().get(route).copied().unwrap_or(0)
    }

    /// Authorization header of the last request for `route`
    pub fn last_auth_header(&self, route: &str) -> Option<String> {
        self.auth_headers.lock().unwrap().get(route).cloned().flatten()
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    async fn authorize(&self, route: &str, headers: &HeaderMap) -> Result<(), ApiError> {
        let header = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        *self.hits.lock().unwrap().entry(route.to_string()).or_default() += 1;
        self.auth_headers
            .lock()
            .unwrap()
            .insert(route.to_string(), header.clone());

        let valid = header.as_deref() == Some(format!("Bearer {}", TOKEN).as_str());
        if self.revoked.load(Ordering::SeqCst) || !valid {
            let delay = self.reject_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            return Err(detail(StatusCode::UNAUTHORIZED, "Could not validate credentials"));
        }
        Ok(())
    }
}

/// A running mock platform
pub struct MockPlatform {
    pub base_url: String,
    pub state: Arc<PlatformState>,
}

pub async fn start() -> MockPlatform {
    let state = Arc::new(PlatformState::seeded());

    let app = Router::new()
        .route("/api/v1/auth/login", post(login_handler))
        .route("/api/v1/auth/register", post(register_handler))
        .route("/api/v1/users/me", get(me_handler))
        .route("/api/v1/projects", get(list_projects_handler).post(create_project_handler))
        .route("/api/v1/projects/{id}", get(get_project_handler))
        .route("/api/v1/pipelines", get(list_pipelines_handler))
        .route(
            "/api/v1/deployments",
            get(list_deployments_handler).post(create_deployment_handler),
        )
        .route("/api/v1/deployments/{id}", put(update_deployment_handler))
        .route("/api/v1/monitoring/alerts", get(list_alerts_handler))
        .route(
            "/api/v1/monitoring/alerts/{id}/acknowledge",
            post(acknowledge_alert_handler),
        )
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockPlatform {
        base_url: format!("http://{}", addr),
        state,
    }
}

fn detail(status: StatusCode, message: &str) -> ApiError {
    (status, Json(json!({ "detail": message })))
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login_handler(Form(form): Form<LoginForm>) -> ApiResult {
    if form.username == "alice" && form.password == "correct" {
        return Ok(Json(json!({ "access_token": TOKEN, "token_type": "bearer" })));
    }
    Err(detail(StatusCode::UNAUTHORIZED, "Incorrect username or password"))
}

async fn register_handler(Json(body): Json<Value>) -> ApiResult {
    if body["username"] == "alice" {
        return Err(detail(StatusCode::BAD_REQUEST, "Username already registered"));
    }
    Ok(Json(json!({
        "id": 2,
        "username": body["username"],
        "email": body["email"],
        "is_active": true
    })))
}

async fn me_handler(State(state): State<Arc<PlatformState>>, headers: HeaderMap) -> ApiResult {
    state.authorize("GET /users/me", &headers).await?;
    Ok(Json(json!({
        "id": 1, "username": "alice", "email": "alice@example.com", "is_active": true
    })))
}

async fn list_projects_handler(State(state): State<Arc<PlatformState>>, headers: HeaderMap) -> ApiResult {
    state.authorize("GET /projects", &headers).await?;
    Ok(Json(Value::Array(state.projects.lock().unwrap().clone())))
}

async fn create_project_handler(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult {
    state.authorize("POST /projects", &headers).await?;
    let name = body["name"].as_str().unwrap_or_default();
    if name.trim().is_empty() {
        return Err(detail(StatusCode::BAD_REQUEST, "name is required"));
    }
    let project = json!({
        "id": state.next_id(),
        "name": name,
        "slug": name.to_lowercase(),
        "organization_id": body["organization_id"],
        "is_active": true
    });
    state.projects.lock().unwrap().push(project.clone());
    Ok(Json(project))
}

async fn get_project_handler(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult {
    state.authorize("GET /projects/{id}", &headers).await?;
    state
        .projects
        .lock()
        .unwrap()
        .iter()
        .find(|p| p["id"] == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| detail(StatusCode::NOT_FOUND, "Project not found"))
}

async fn list_pipelines_handler(State(state): State<Arc<PlatformState>>, headers: HeaderMap) -> ApiResult {
    state.authorize("GET /pipelines", &headers).await?;
    Ok(Json(json!([])))
}

async fn list_deployments_handler(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Query(filters): Query<HashMap<String, String>>,
) -> ApiResult {
    state.authorize("GET /deployments", &headers).await?;
    let deployments = state
        .deployments
        .lock()
        .unwrap()
        .iter()
        .filter(|d| {
            filters.iter().all(|(name, value)| match &d[name.as_str()] {
                Value::Number(n) => n.to_string() == *value,
                Value::String(s) => s == value,
                _ => false,
            })
        })
        .cloned()
        .collect();
    Ok(Json(Value::Array(deployments)))
}

async fn create_deployment_handler(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult {
    state.authorize("POST /deployments", &headers).await?;
    if body["version"].as_str().unwrap_or_default().is_empty() {
        return Err(detail(StatusCode::UNPROCESSABLE_ENTITY, "version is required"));
    }
    let deployment = json!({
        "id": state.next_id(),
        "project_id": body["project_id"],
        "environment": body["environment"],
        "version": body["version"],
        "status": "pending"
    });
    state.deployments.lock().unwrap().push(deployment.clone());
    Ok(Json(deployment))
}

async fn update_deployment_handler(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> ApiResult {
    state.authorize("PUT /deployments/{id}", &headers).await?;
    let mut deployments = state.deployments.lock().unwrap();
    let deployment = deployments
        .iter_mut()
        .find(|d| d["id"] == id)
        .ok_or_else(|| detail(StatusCode::NOT_FOUND, "Deployment not found"))?;
    for field in ["status", "notes"] {
        if !body[field].is_null() {
            deployment[field] = body[field].clone();
        }
    }
    Ok(Json(deployment.clone()))
}

async fn list_alerts_handler(State(state): State<Arc<PlatformState>>, headers: HeaderMap) -> ApiResult {
    state.authorize("GET /monitoring/alerts", &headers).await?;
    Ok(Json(Value::Array(state.alerts.lock().unwrap().clone())))
}

async fn acknowledge_alert_handler(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult {
    state
        .authorize("POST /monitoring/alerts/{id}/acknowledge", &headers)
        .await?;
    let mut alerts = state.alerts.lock().unwrap();
    let alert = alerts
        .iter_mut()
        .find(|a| a["id"] == id)
        .ok_or_else(|| detail(StatusCode::NOT_FOUND, "Alert not found"))?;
    alert["status"] = json!("acknowledged");
    Ok(Json(alert.clone()))
}
