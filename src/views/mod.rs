//! Resource views: a local cache of one server collection plus the actions
//! that mutate it.
//!
//! Every view follows the same cycle: fetch, validate, mutate, reconcile, and
//! report through a dismissible banner. The shared pieces live here.

pub mod assignments;
pub mod course_assignments;
pub mod courses;
pub mod lifetime;
pub mod submissions;

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::SchoolApi;
use crate::error::AppError;
use crate::models::{Capabilities, Role};
use crate::session::SessionStore;
use crate::state::AppState;

pub use assignments::{AssignmentsView, BatchDeleteOutcome, BatchStatus, PendingDelete};
pub use course_assignments::CourseAssignmentsView;
pub use courses::CoursesView;
pub use lifetime::ViewLifetime;
pub use submissions::SubmissionsView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Idle,
    Loading,
    Ready,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub severity: Severity,
    pub text: String,
}

impl Banner {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Session, API and lifetime handle for one view.
#[derive(Clone)]
pub struct ViewContext {
    session: SessionStore,
    api: Arc<dyn SchoolApi>,
    lifetime: ViewLifetime,
}

impl ViewContext {
    pub fn new(state: &AppState) -> Self {
        Self {
            session: state.session.clone(),
            api: state.api.clone(),
            lifetime: ViewLifetime::new(),
        }
    }

    /// Same session and API under a fresh lifetime, for a view opened from
    /// this one.
    pub fn fork(&self) -> Self {
        Self {
            session: self.session.clone(),
            api: self.api.clone(),
            lifetime: ViewLifetime::new(),
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn api(&self) -> Arc<dyn SchoolApi> {
        self.api.clone()
    }

    pub fn lifetime(&self) -> &ViewLifetime {
        &self.lifetime
    }

    pub fn role(&self) -> Option<Role> {
        self.session.current_user().map(|u| u.role)
    }

    pub fn capabilities(&self) -> Capabilities {
        self.session.capabilities()
    }

    pub fn token(&self) -> Result<String, AppError> {
        self.session.token().ok_or(AppError::SignedOut)
    }

    /// Runs one authenticated call bound to the view's lifetime. A 401 drops
    /// the session.
    pub async fn call<T, F, Fut>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(Arc<dyn SchoolApi>, String) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let token = self.token()?;
        let result = self
            .lifetime
            .guard(f(self.api.clone(), token))
            .await
            .ok_or(AppError::Detached)?;
        if let Err(e) = &result {
            self.handle_auth_failure(e).await;
        }
        result
    }

    pub async fn handle_auth_failure(&self, err: &AppError) {
        if err.is_auth_failure() {
            warn!("session rejected by server, signing out");
            if let Err(e) = self.session.sign_out().await {
                warn!("failed to clear session: {}", e);
            }
        }
    }
}

/// Local copy of a server collection with the view's status around it.
#[derive(Debug, Clone)]
pub struct ListState<T> {
    state: ViewState,
    items: Vec<T>,
    banner: Option<Banner>,
    submitting: bool,
    loaded: bool,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self {
            state: ViewState::Idle,
            items: Vec::new(),
            banner: None,
            submitting: false,
            loaded: false,
        }
    }
}

impl<T> ListState<T> {
    pub fn ready_with(items: Vec<T>) -> Self {
        Self {
            state: ViewState::Ready,
            items,
            banner: None,
            submitting: false,
            loaded: true,
        }
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut Vec<T> {
        &mut self.items
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Loaded successfully and nothing to show.
    pub fn is_empty_state(&self) -> bool {
        self.state == ViewState::Ready && self.items.is_empty()
    }

    pub fn begin_load(&mut self) {
        self.state = ViewState::Loading;
    }

    /// A failed refetch keeps the stale rows; a failed first load leaves the
    /// view in `Error` with nothing.
    pub fn finish_load(&mut self, result: Result<Vec<T>, AppError>, fallback: &str) {
        match result {
            Ok(items) => {
                self.items = items;
                self.state = ViewState::Ready;
                self.loaded = true;
            }
            Err(AppError::Detached) => {
                debug!("load result dropped, view unmounted");
                self.state = if self.loaded { ViewState::Ready } else { ViewState::Idle };
            }
            Err(e) => {
                self.show_error(&e, fallback);
                if self.loaded {
                    self.state = ViewState::Ready;
                } else {
                    self.items.clear();
                    self.state = ViewState::Error;
                }
            }
        }
    }

    pub fn set_submitting(&mut self, submitting: bool) {
        self.submitting = submitting;
    }

    pub fn show_error(&mut self, err: &AppError, fallback: &str) {
        if matches!(err, AppError::Detached) {
            return;
        }
        self.banner = Some(Banner {
            severity: Severity::Error,
            text: err.banner_text(fallback),
        });
    }

    /// An error banner with text the view composed itself.
    pub fn show_error_text(&mut self, text: impl Into<String>) {
        self.banner = Some(Banner {
            severity: Severity::Error,
            text: text.into(),
        });
    }

    pub fn show_success(&mut self, text: impl Into<String>) {
        self.banner = Some(Banner {
            severity: Severity::Success,
            text: text.into(),
        });
    }

    pub fn show_info(&mut self, text: impl Into<String>) {
        self.banner = Some(Banner {
            severity: Severity::Info,
            text: text.into(),
        });
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    /// Back to the pre-load state, e.g. after sign-out.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn server_error() -> AppError {
        AppError::Api {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: None,
        }
    }

    #[test]
    fn test_failed_first_load_is_error_with_no_rows() {
        let mut list: ListState<i32> = ListState::default();
        list.begin_load();
        assert_eq!(list.state(), ViewState::Loading);

        list.finish_load(Err(server_error()), "Failed to load");
        assert_eq!(list.state(), ViewState::Error);
        assert!(list.items().is_empty());
        assert_eq!(list.banner().unwrap().text, "Failed to load");
    }

    #[test]
    fn test_failed_refetch_keeps_stale_rows() {
        let mut list = ListState::default();
        list.begin_load();
        list.finish_load(Ok(vec![1, 2]), "Failed to load");

        list.begin_load();
        list.finish_load(Err(server_error()), "Failed to load");
        assert_eq!(list.state(), ViewState::Ready);
        assert_eq!(list.items(), &[1, 2]);
        assert!(list.banner().unwrap().is_error());
    }

    #[test]
    fn test_empty_result_is_empty_state_not_error() {
        let mut list: ListState<i32> = ListState::default();
        list.begin_load();
        list.finish_load(Ok(Vec::new()), "Failed to load");
        assert!(list.is_empty_state());
        assert!(list.banner().is_none());
    }

    #[test]
    fn test_detached_result_leaves_state_untouched() {
        let mut list = ListState::ready_with(vec![1]);
        list.begin_load();
        list.finish_load(Err(AppError::Detached), "Failed to load");
        assert_eq!(list.state(), ViewState::Ready);
        assert_eq!(list.items(), &[1]);
        assert!(list.banner().is_none());
    }

    #[test]
    fn test_error_text_banner_is_shown_as_given() {
        let mut list = ListState::ready_with(vec![1, 2]);
        list.show_error_text("Deleted 1 of 2 assignment(s). Failed to delete: 2");
        let banner = list.banner().unwrap();
        assert!(banner.is_error());
        assert_eq!(banner.text, "Deleted 1 of 2 assignment(s). Failed to delete: 2");
        assert_eq!(list.state(), ViewState::Ready);
    }
}
