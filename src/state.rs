use std::sync::Arc;

use crate::api::{HttpSchoolApi, SchoolApi};
use crate::config::ClientConfig;
use crate::db::LocalStorage;
use crate::error::AppError;
use crate::session::SessionStore;

/// Everything a view needs from the outside world. Built once by the
/// composition root and handed to each view.
#[derive(Clone)]
pub struct AppState {
    pub session: SessionStore,
    pub api: Arc<dyn SchoolApi>,
}

impl AppState {
    pub fn new(session: SessionStore, api: Arc<dyn SchoolApi>) -> Self {
        Self { session, api }
    }

    pub async fn from_config(config: &ClientConfig) -> Result<Self, AppError> {
        let storage = LocalStorage::connect(&config.storage_url).await?;
        let session = SessionStore::restore(storage).await;
        let api = Arc::new(HttpSchoolApi::new(config.clone())?);
        Ok(Self::new(session, api))
    }
}
