use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("You must be logged in")]
    SignedOut,

    #[error("You are not authorized. Please login again.")]
    Unauthorized,

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("HTTP {status}: {}", message.as_deref().unwrap_or("request failed"))]
    Api {
        status: StatusCode,
        message: Option<String>,
    },

    #[error("Unexpected response format: {raw}")]
    Malformed { raw: String },

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Storage migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found")]
    NotFound,

    #[error("View is no longer mounted")]
    Detached,
}

/// Where an error sits in the client's error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Authentication,
    Authorization,
    Application,
    Transport,
    Internal,
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::SignedOut | AppError::Unauthorized => ErrorKind::Authentication,
            AppError::Forbidden(_) => ErrorKind::Authorization,
            AppError::Api { .. } | AppError::NotFound => ErrorKind::Application,
            AppError::Malformed { .. } | AppError::Transport(_) | AppError::Json(_) => {
                ErrorKind::Transport
            }
            AppError::Storage(_)
            | AppError::Migrate(_)
            | AppError::Config(_)
            | AppError::Detached => ErrorKind::Internal,
        }
    }

    /// Text for the view banner. `fallback` replaces an absent server message.
    pub fn banner_text(&self, fallback: &str) -> String {
        match self {
            AppError::Api { message, .. } => match message {
                Some(msg) if !msg.trim().is_empty() => msg.clone(),
                _ => fallback.to_string(),
            },
            AppError::NotFound => fallback.to_string(),
            AppError::Storage(e) => {
                error!("storage error: {}", e);
                "Local storage error occurred".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Forces the session to be dropped by the caller.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, AppError::Unauthorized)
    }
}
