use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::db::LocalStorage;
use crate::error::AppError;
use crate::models::{Capabilities, Session, User};

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

/// The signed-in identity, shared by every view. Cloning is cheap and all
/// clones observe the same session.
#[derive(Clone)]
pub struct SessionStore {
    storage: LocalStorage,
    state: Arc<watch::Sender<Option<Session>>>,
}

impl SessionStore {
    pub fn new(storage: LocalStorage) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            storage,
            state: Arc::new(tx),
        }
    }

    /// Loads the persisted session. Missing or corrupt data leaves the store
    /// signed out and removes whatever was left behind.
    pub async fn restore(storage: LocalStorage) -> Self {
        let store = Self::new(storage);
        match store.read_persisted().await {
            Ok(Some(session)) => {
                info!("restored session for user {}", session.user.id);
                store.state.send_replace(Some(session));
            }
            Ok(None) => debug!("no persisted session"),
            Err(e) => {
                warn!("discarding persisted session: {}", e);
                if let Err(e) = store.clear_persisted().await {
                    warn!("failed to clear persisted session: {}", e);
                }
            }
        }
        store
    }

    async fn read_persisted(&self) -> Result<Option<Session>, AppError> {
        let token = self.storage.get_item(TOKEN_KEY).await?;
        let user = self.storage.get_item(USER_KEY).await?;

        match (token, user) {
            (Some(token), Some(user)) if !token.is_empty() => {
                let user: User = serde_json::from_str(&user)?;
                Ok(Some(Session { token, user }))
            }
            (None, None) => Ok(None),
            _ => Err(AppError::validation("token and user must be stored together")),
        }
    }

    async fn clear_persisted(&self) -> Result<(), AppError> {
        self.storage.remove_item(TOKEN_KEY).await?;
        self.storage.remove_item(USER_KEY).await?;
        Ok(())
    }

    pub async fn sign_in(&self, token: impl Into<String>, user: User) -> Result<(), AppError> {
        let token = token.into();
        if token.is_empty() {
            return Err(AppError::validation("Sign-in returned an empty token"));
        }
        let user_json = serde_json::to_string(&user)?;
        self.storage.set_item(TOKEN_KEY, &token).await?;
        self.storage.set_item(USER_KEY, &user_json).await?;

        info!("signed in as {} ({})", user.id, user.role);
        self.state.send_replace(Some(Session { token, user }));
        Ok(())
    }

    pub async fn sign_out(&self) -> Result<(), AppError> {
        if self.state.send_replace(None).is_some() {
            info!("signed out");
        }
        self.clear_persisted().await
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_some()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().as_ref().map(|s| s.user.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().as_ref().map(|s| s.token.clone())
    }

    pub fn capabilities(&self) -> Capabilities {
        self.state
            .borrow()
            .as_ref()
            .map(|s| s.user.role.capabilities())
            .unwrap_or(Capabilities::NONE)
    }

    /// Notified on every sign-in and sign-out.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.state.subscribe()
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }
}
