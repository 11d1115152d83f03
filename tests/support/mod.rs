#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
};
use serde::Serialize;
use serde_json::json;

use schoolhub::api::{AssignmentScope, MemorySchoolApi, SchoolApi};
use schoolhub::error::AppError;
use schoolhub::models::{
    LoginRequest, NewAssignmentRequest, RegisterRequest, SubmitRequest, UpdateAssignmentRequest,
};

type Shared = Arc<MemorySchoolApi>;

/// Serves the school API over HTTP on an ephemeral port, backed by `api`.
/// Returns the base URL.
pub async fn spawn_school_server(api: Shared) -> String {
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/assignments", get(list_own).post(create))
        .route("/api/assignments/admin", get(list_all))
        .route("/api/assignments/teachers", get(list_courses))
        .route("/api/assignments/{id}", put(update).delete(remove))
        .route("/api/submissions/{assignment_id}/submit", post(submit))
        .route(
            "/api/submissions/{assignment_id}/grade/{submission_id}",
            patch(grade),
        )
        .with_state(api);
    serve(app).await
}

/// Answers every request with the same status, content type and body.
pub async fn spawn_canned(status: u16, content_type: &'static str, body: &'static str) -> String {
    let app = Router::new().fallback(move || async move {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, [(header::CONTENT_TYPE, content_type)], body)
    });
    serve(app).await
}

/// Accepts only requests that carry `Bearer <token>` and a request id.
pub async fn spawn_header_check(token: &'static str) -> String {
    let app = Router::new().fallback(move |headers: HeaderMap| async move {
        let auth_ok = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {}", token));
        let request_id_ok = headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| uuid::Uuid::parse_str(v).is_ok());
        if auth_ok && request_id_ok {
            Json(json!([])).into_response()
        } else {
            StatusCode::UNAUTHORIZED.into_response()
        }
    });
    serve(app).await
}

/// One request as the server saw it.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: Method,
    pub path: String,
    pub body: String,
}

/// Records every request and answers `200 {}`.
pub async fn spawn_capture() -> (String, Arc<Mutex<Vec<Captured>>>) {
    let seen: Arc<Mutex<Vec<Captured>>> = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let app = Router::new().fallback(move |method: Method, uri: Uri, body: String| {
        let log = log.clone();
        async move {
            log.lock().expect("capture log poisoned").push(Captured {
                method,
                path: uri.path().to_string(),
                body,
            });
            Json(json!({}))
        }
    });
    (serve(app).await, seen)
}

/// A base URL nothing listens on.
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to read address");
    drop(listener);
    format!("http://{}", addr)
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to read address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });
    format!("http://{}", addr)
}

fn bearer(headers: &HeaderMap) -> String {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default()
        .to_string()
}

fn error_response(err: AppError) -> Response {
    let (status, message) = match err {
        AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        AppError::Forbidden(message) => (StatusCode::FORBIDDEN, message),
        AppError::Api { status, message } => (
            StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            message.unwrap_or_default(),
        ),
        other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    };
    (status, Json(json!({ "message": message }))).into_response()
}

fn reply<T: Serialize>(result: Result<T, AppError>) -> Response {
    match result {
        Ok(value) => Json(value).into_response(),
        Err(e) => error_response(e),
    }
}

fn acknowledge(result: Result<(), AppError>, status: StatusCode, message: &str) -> Response {
    match result {
        Ok(()) => (status, Json(json!({ "message": message }))).into_response(),
        Err(e) => error_response(e),
    }
}

async fn login(State(api): State<Shared>, Json(req): Json<LoginRequest>) -> Response {
    reply(api.login(&req).await)
}

async fn register(State(api): State<Shared>, Json(req): Json<RegisterRequest>) -> Response {
    acknowledge(api.register(&req).await, StatusCode::CREATED, "User registered")
}

async fn list_own(State(api): State<Shared>, headers: HeaderMap) -> Response {
    reply(api.list_assignments(&bearer(&headers), AssignmentScope::Caller).await)
}

async fn list_all(State(api): State<Shared>, headers: HeaderMap) -> Response {
    reply(api.list_assignments(&bearer(&headers), AssignmentScope::All).await)
}

async fn list_courses(State(api): State<Shared>, headers: HeaderMap) -> Response {
    reply(api.list_courses(&bearer(&headers)).await)
}

async fn create(
    State(api): State<Shared>,
    headers: HeaderMap,
    Json(req): Json<NewAssignmentRequest>,
) -> Response {
    acknowledge(
        api.create_assignment(&bearer(&headers), &req).await,
        StatusCode::CREATED,
        "Assignment created",
    )
}

async fn update(
    State(api): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<UpdateAssignmentRequest>,
) -> Response {
    acknowledge(
        api.update_assignment(&bearer(&headers), id, &req).await,
        StatusCode::OK,
        "Assignment updated",
    )
}

async fn remove(State(api): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    match api.delete_assignment(&bearer(&headers), id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

async fn submit(
    State(api): State<Shared>,
    headers: HeaderMap,
    Path(assignment_id): Path<i64>,
    Json(req): Json<SubmitRequest>,
) -> Response {
    reply(api.submit(&bearer(&headers), assignment_id, &req).await)
}

async fn grade(
    State(api): State<Shared>,
    headers: HeaderMap,
    Path((assignment_id, submission_id)): Path<(i64, i64)>,
    Json(grade): Json<f64>,
) -> Response {
    reply(
        api.grade(&bearer(&headers), assignment_id, submission_id, grade)
            .await,
    )
}
