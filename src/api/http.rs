use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::dto::{self, AssignmentScope, ErrorBody};
use crate::api::SchoolApi;
use crate::config::ClientConfig;
use crate::error::AppError;
use crate::models::{
    Assignment, Course, LoginRequest, LoginResponse, NewAssignmentRequest, RegisterRequest,
    Submission, SubmitRequest, SubmitResponse, UpdateAssignmentRequest,
};

const JSON: &str = "application/json";
const REQUEST_ID_HEADER: &str = "X-Request-Id";
const FORBIDDEN_FALLBACK: &str = "You do not have permission to perform this action.";

pub struct HttpSchoolApi {
    client: Client,
    config: ClientConfig,
}

impl HttpSchoolApi {
    pub fn new(config: ClientConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, self.config.url(path))
            .header(ACCEPT, JSON)
            .header(CONTENT_TYPE, JSON);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        builder
    }

    /// Sends and classifies. Every call goes through here.
    async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<String>,
    ) -> Result<Option<Value>, AppError> {
        let request_id = Uuid::new_v4();
        let mut builder = self
            .request(method.clone(), path, token)
            .header(REQUEST_ID_HEADER, request_id.to_string());
        if let Some(body) = body {
            builder = builder.body(body);
        }

        debug!("[{}] {} {}", request_id, method, path);
        let response = builder.send().await.map_err(|e| {
            warn!("[{}] {} {} failed: {}", request_id, method, path, e);
            AppError::Transport(e)
        })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response.text().await?;
        debug!("[{}] {} {} -> {}", request_id, method, path, status);

        let classified = classify(status, content_type.as_deref(), text);
        if let Err(e) = &classified {
            warn!("[{}] {} {} rejected: {}", request_id, method, path, e);
        }
        classified
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T, AppError> {
        let value = self.send(Method::GET, path, Some(token), None).await?;
        decode(value)
    }
}

/// Maps a finished HTTP exchange onto the client's outcome taxonomy.
pub fn classify(
    status: StatusCode,
    content_type: Option<&str>,
    body: String,
) -> Result<Option<Value>, AppError> {
    if status == StatusCode::UNAUTHORIZED {
        return Err(AppError::Unauthorized);
    }
    if status == StatusCode::FORBIDDEN {
        let message = error_message(content_type, &body)
            .unwrap_or_else(|| FORBIDDEN_FALLBACK.to_string());
        return Err(AppError::Forbidden(message));
    }
    if !status.is_success() {
        return Err(AppError::Api {
            status,
            message: error_message(content_type, &body),
        });
    }
    if body.trim().is_empty() {
        return Ok(None);
    }
    if !is_json(content_type) {
        return Err(AppError::Malformed { raw: body });
    }
    match serde_json::from_str::<Value>(&body) {
        Ok(value) => Ok(Some(value)),
        Err(_) => Err(AppError::Malformed { raw: body }),
    }
}

fn is_json(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| {
        let ct = ct.to_ascii_lowercase();
        ct.contains(JSON) || ct.contains("+json")
    })
}

fn error_message(content_type: Option<&str>, body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(trimmed) {
        return parsed.into_message();
    }
    if let Ok(Value::String(s)) = serde_json::from_str::<Value>(trimmed) {
        return Some(s);
    }
    // Plain-text errors are shown as-is; HTML error pages are not.
    if is_json(content_type) || trimmed.starts_with('<') {
        return None;
    }
    Some(trimmed.to_string())
}

fn decode<T: DeserializeOwned>(value: Option<Value>) -> Result<T, AppError> {
    let value = value.ok_or_else(|| AppError::Malformed {
        raw: String::new(),
    })?;
    serde_json::from_value(value.clone()).map_err(|_| AppError::Malformed {
        raw: value.to_string(),
    })
}

fn json_body<T: Serialize + ?Sized>(body: &T) -> Result<Option<String>, AppError> {
    Ok(Some(serde_json::to_string(body)?))
}

/// Whole grades go out as JSON integers (`85`, not `85.0`).
fn grade_value(grade: f64) -> Value {
    if grade.fract() == 0.0 && grade.abs() < i64::MAX as f64 {
        Value::from(grade as i64)
    } else {
        serde_json::Number::from_f64(grade)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// Decodes an optional acknowledgement body, logging what could not be read.
fn decode_optional<T: DeserializeOwned>(value: Option<Value>, what: &str) -> Option<T> {
    let value = value?;
    match serde_json::from_value::<T>(value.clone()) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            debug!("ignoring unreadable {} body {}: {}", what, value, e);
            None
        }
    }
}

#[async_trait]
impl SchoolApi for HttpSchoolApi {
    async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, AppError> {
        let value = self.send(Method::POST, dto::LOGIN_PATH, None, json_body(req)?).await?;
        decode(value)
    }

    async fn register(&self, req: &RegisterRequest) -> Result<(), AppError> {
        self.send(Method::POST, dto::REGISTER_PATH, None, json_body(req)?).await?;
        Ok(())
    }

    async fn list_assignments(
        &self,
        token: &str,
        scope: AssignmentScope,
    ) -> Result<Vec<Assignment>, AppError> {
        self.get_json(scope.path(), token).await
    }

    async fn list_courses(&self, token: &str) -> Result<Vec<Course>, AppError> {
        self.get_json(dto::COURSES_PATH, token).await
    }

    async fn create_assignment(
        &self,
        token: &str,
        req: &NewAssignmentRequest,
    ) -> Result<(), AppError> {
        self.send(Method::POST, dto::ASSIGNMENTS_PATH, Some(token), json_body(req)?)
            .await?;
        Ok(())
    }

    async fn update_assignment(
        &self,
        token: &str,
        id: i64,
        req: &UpdateAssignmentRequest,
    ) -> Result<(), AppError> {
        self.send(Method::PUT, &dto::assignment_path(id), Some(token), json_body(req)?)
            .await?;
        Ok(())
    }

    async fn delete_assignment(&self, token: &str, id: i64) -> Result<(), AppError> {
        self.send(Method::DELETE, &dto::assignment_path(id), Some(token), None)
            .await?;
        Ok(())
    }

    async fn submit(
        &self,
        token: &str,
        assignment_id: i64,
        req: &SubmitRequest,
    ) -> Result<SubmitResponse, AppError> {
        let value = self
            .send(Method::POST, &dto::submit_path(assignment_id), Some(token), json_body(req)?)
            .await?;
        // The acknowledgement body is informational only.
        Ok(decode_optional::<SubmitResponse>(value, "submit").unwrap_or_default())
    }

    async fn grade(
        &self,
        token: &str,
        assignment_id: i64,
        submission_id: i64,
        grade: f64,
    ) -> Result<Option<Submission>, AppError> {
        let value = self
            .send(
                Method::PATCH,
                &dto::grade_path(assignment_id, submission_id),
                Some(token),
                json_body(&grade_value(grade))?,
            )
            .await?;
        Ok(decode_optional::<Submission>(value, "grade"))
    }
}
