use std::env;
use std::time::Duration;

use crate::error::AppError;

const DEFAULT_STORAGE_URL: &str = "sqlite://schoolhub.db?mode=rwc";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_url: String,
    pub storage_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: normalize_base_url(&api_url.into()),
            storage_url: DEFAULT_STORAGE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn new_from_env() -> Result<Self, AppError> {
        let api_url = env::var("SCHOOL_API_URL")
            .map_err(|_| AppError::Config("SCHOOL_API_URL is not set".to_string()))?;
        if api_url.trim().is_empty() {
            return Err(AppError::Config("SCHOOL_API_URL is empty".to_string()));
        }

        let storage_url =
            env::var("SCHOOL_STORAGE_URL").unwrap_or_else(|_| DEFAULT_STORAGE_URL.to_string());

        let timeout_secs = match env::var("SCHOOL_HTTP_TIMEOUT_SECS") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|_| {
                AppError::Config(format!("SCHOOL_HTTP_TIMEOUT_SECS is not a number: {}", raw))
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            api_url: normalize_base_url(&api_url),
            storage_url,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
