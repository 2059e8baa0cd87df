#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::task::JoinHandle;

use opsgate::config::ApiConfig;
use opsgate::session::SqliteSessionStorage;
use opsgate::{db, ApiClient, SessionStore};

pub const TOKEN: &str = "stub-token";
pub const PASSWORD: &str = "secret";

type Reply = (StatusCode, Json<Value>);

/// In-memory stand-in for the manufacturing backend.
#[derive(Default)]
pub struct Backend {
    pub plans: BTreeMap<i64, Value>,
    pub calls: Vec<String>,
    pub fail_logout: bool,
}

impl Backend {
    pub fn with_plan(mut self, plan: Value) -> Self {
        let id = plan["id"].as_i64().unwrap_or_default();
        self.plans.insert(id, plan);
        self
    }
}

pub type Shared = Arc<Mutex<Backend>>;

pub struct StubServer {
    pub base_url: String,
    pub state: Shared,
    handle: JoinHandle<()>,
}

impl StubServer {
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn plan_status(&self, id: i64) -> Option<String> {
        self.state.lock().unwrap().plans.get(&id)?["status"]
            .as_str()
            .map(str::to_string)
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn(backend: Backend) -> Result<StubServer> {
    let state: Shared = Arc::new(Mutex::new(backend));

    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/profile", get(profile))
        .route("/machines", get(machines))
        .route("/google-sheets/part-name/:order", get(part_name))
        .route("/pem-operation-plans", get(list_plans))
        .route("/pem-operation-plans/pending-approvals", get(pending_approvals))
        .route("/pem-operation-plans/:id", get(get_plan))
        .route("/pem-operation-plans/:id/submit", post(submit_plan))
        .route("/pem-operation-plans/:id/approve", post(approve_plan))
        .route("/pem-operation-plans/:id/reject", post(reject_plan))
        .with_state(state.clone());
    let app = Router::new().nest("/api/v1", api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(StubServer {
        base_url: format!("http://{}/api/v1", addr),
        state,
        handle,
    })
}

/// A client with a fresh SQLite-backed session under `dir`.
pub async fn client_for(server: &StubServer, dir: &TempDir) -> Result<ApiClient> {
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("session.db").display());
    let pool = db::connect(&url).await?;
    let session = Arc::new(SessionStore::open(Arc::new(SqliteSessionStorage::new(pool))).await?);
    let config = ApiConfig {
        base_url: server.base_url.clone(),
        ..ApiConfig::default()
    };
    Ok(ApiClient::new(&config, session)?)
}

pub fn user_json(user_id: &str, role: &str) -> Value {
    json!({
        "user_id": user_id,
        "username": "TESTER",
        "role": role,
        "operator": "",
        "is_active": true
    })
}

pub fn plan(id: i64, status: &str, approvals: &[(&str, &str)]) -> Value {
    let approvals: Vec<Value> = approvals
        .iter()
        .enumerate()
        .map(|(index, (role, status))| {
            json!({
                "id": index as i64 + 1,
                "operation_plan_id": id,
                "approver_role": role,
                "approver_id": 20 + index as i64,
                "status": status,
                "comments": "",
                "updated_at": "2025-03-01T08:00:00Z"
            })
        })
        .collect();

    json!({
        "id": id,
        "form_number": format!("OP-2025-{:03}", id),
        "part_name": "Spindle housing",
        "material": "SUS304",
        "status": status,
        "created_by": 4,
        "steps": [],
        "approvals": approvals,
        "created_at": "2025-03-01T08:00:00Z",
        "updated_at": "2025-03-01T08:00:00Z"
    })
}

fn ok(data: Value) -> Reply {
    (StatusCode::OK, Json(json!({ "success": true, "data": data })))
}

fn message(text: &str) -> Reply {
    (StatusCode::OK, Json(json!({ "success": true, "message": text })))
}

fn failure(status: StatusCode, error: &str, details: &str) -> Reply {
    (status, Json(json!({ "error": error, "details": details })))
}

fn authorized(headers: &HeaderMap) -> Result<(), Reply> {
    let expected = format!("Bearer {}", TOKEN);
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(failure(StatusCode::UNAUTHORIZED, "Unauthorized", "invalid or expired token")),
    }
}

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Reply {
    let user_id = body["user_id"].as_str().unwrap_or_default().to_string();
    state.lock().unwrap().calls.push(format!("login {}", user_id));

    if body["password"] != PASSWORD {
        return failure(StatusCode::UNAUTHORIZED, "Invalid credentials", "wrong user id or password");
    }

    let role = if user_id.starts_with("QC") { "QC" } else { "PEM" };
    ok(json!({ "token": TOKEN, "user": user_json(&user_id, role) }))
}

async fn logout(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let mut backend = state.lock().unwrap();
    backend.calls.push("logout".to_string());
    if backend.fail_logout {
        return failure(StatusCode::INTERNAL_SERVER_ERROR, "Logout failed", "session store down");
    }
    if let Err(reply) = authorized(&headers) {
        return reply;
    }
    message("Logged out successfully")
}

async fn profile(headers: HeaderMap) -> Reply {
    if let Err(reply) = authorized(&headers) {
        return reply;
    }
    ok(user_json("PEM01", "PEM"))
}

async fn machines(headers: HeaderMap) -> Reply {
    if let Err(reply) = authorized(&headers) {
        return reply;
    }
    ok(json!([{
        "id": 1,
        "machine_code": "MC-01",
        "machine_name": "Makino V33",
        "machine_type": "CNC",
        "location": "Bay 2",
        "status": "active",
        "created_at": "2025-01-01T00:00:00Z",
        "updated_at": "2025-01-01T00:00:00Z"
    }]))
}

async fn part_name(headers: HeaderMap, Path(order): Path<String>) -> Reply {
    if let Err(reply) = authorized(&headers) {
        return reply;
    }
    ok(json!({ "order_number": order, "part_name": "Spindle housing" }))
}

async fn list_plans(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Reply {
    if let Err(reply) = authorized(&headers) {
        return reply;
    }
    let mut backend = state.lock().unwrap();
    let mut call = "list".to_string();
    if let Some(status) = query.get("status") {
        call.push_str(&format!(" status={}", status));
    }
    backend.calls.push(call);

    let plans: Vec<Value> = backend
        .plans
        .values()
        .filter(|plan| match query.get("status") {
            Some(status) => plan["status"] == status.as_str(),
            None => true,
        })
        .cloned()
        .collect();
    ok(Value::Array(plans))
}

async fn pending_approvals(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    if let Err(reply) = authorized(&headers) {
        return reply;
    }
    let backend = state.lock().unwrap();
    let plans: Vec<Value> = backend
        .plans
        .values()
        .filter(|plan| plan["status"] == "pending_approval")
        .cloned()
        .collect();
    ok(Value::Array(plans))
}

async fn get_plan(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Reply {
    if let Err(reply) = authorized(&headers) {
        return reply;
    }
    match state.lock().unwrap().plans.get(&id) {
        Some(plan) => ok(plan.clone()),
        None => failure(StatusCode::NOT_FOUND, "Plan not found", "no such plan"),
    }
}

async fn submit_plan(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Reply {
    if let Err(reply) = authorized(&headers) {
        return reply;
    }
    let mut backend = state.lock().unwrap();
    backend.calls.push(format!("submit {}", id));

    let Some(plan) = backend.plans.get_mut(&id) else {
        return failure(StatusCode::NOT_FOUND, "Plan not found", "no such plan");
    };
    if plan["status"] != "draft" {
        return failure(
            StatusCode::BAD_REQUEST,
            "Failed to submit plan",
            "only draft plans can be submitted for approval",
        );
    }
    plan["status"] = json!("pending_approval");
    message("Plan submitted for approval successfully")
}

async fn approve_plan(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Reply {
    decide(state, headers, id, query, body, "approved")
}

async fn reject_plan(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Reply {
    decide(state, headers, id, query, body, "rejected")
}

fn decide(
    state: Shared,
    headers: HeaderMap,
    id: i64,
    query: HashMap<String, String>,
    body: Value,
    outcome: &str,
) -> Reply {
    if let Err(reply) = authorized(&headers) {
        return reply;
    }
    let role = query.get("role").cloned().unwrap_or_default();
    let comments = body["comments"].as_str().unwrap_or_default().to_string();

    let mut backend = state.lock().unwrap();
    backend
        .calls
        .push(format!("{} {} role={} comments={}", outcome, id, role, comments));

    let Some(plan) = backend.plans.get_mut(&id) else {
        return failure(StatusCode::NOT_FOUND, "Plan not found", "no such plan");
    };
    if plan["status"] != "pending_approval" {
        return failure(
            StatusCode::BAD_REQUEST,
            "Failed to record decision",
            "only plans pending approval can be decided",
        );
    }

    let Some(approvals) = plan["approvals"].as_array_mut() else {
        return failure(StatusCode::INTERNAL_SERVER_ERROR, "Broken plan", "no approvals");
    };
    let Some(slot) = approvals.iter_mut().find(|a| a["approver_role"] == role.as_str()) else {
        return failure(StatusCode::FORBIDDEN, "Forbidden", "not an approver for this plan");
    };
    slot["status"] = json!(outcome);
    slot["comments"] = json!(comments);
    slot["approved_at"] = json!("2025-03-02T09:30:00Z");

    let rejected = approvals.iter().any(|a| a["status"] == "rejected");
    let all_approved = approvals.iter().all(|a| a["status"] == "approved");
    if rejected {
        plan["status"] = json!("rejected");
    } else if all_approved {
        plan["status"] = json!("approved");
    }

    message("Decision recorded")
}
