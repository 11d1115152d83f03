use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::api::AssignmentScope;
use crate::dialogs::{AssignmentForm, ConfirmDialog, FormDialog};
use crate::error::AppError;
use crate::models::assignment::deadline_label;
use crate::models::{Assignment, NewAssignmentRequest, UpdateAssignmentRequest};
use crate::table::{Column, DataTable};
use crate::views::{ListState, SubmissionsView, ViewContext};

const LOAD_FAILED: &str = "Failed to load assignments";
const CREATE_FAILED: &str = "Failed to create assignment";
const UPDATE_FAILED: &str = "Failed to update assignment";
const DELETE_FAILED: &str = "Failed to delete assignment";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    AllSucceeded,
    Partial,
    AllFailed,
}

/// Per-id result of one batch delete.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchDeleteOutcome {
    pub requested: usize,
    pub deleted: Vec<i64>,
    pub failed: Vec<(i64, String)>,
}

impl BatchDeleteOutcome {
    pub fn status(&self) -> BatchStatus {
        if self.failed.is_empty() {
            BatchStatus::AllSucceeded
        } else if self.deleted.is_empty() {
            BatchStatus::AllFailed
        } else {
            BatchStatus::Partial
        }
    }

    fn summary(&self) -> String {
        match self.status() {
            BatchStatus::AllSucceeded => {
                format!("Successfully deleted {} assignment(s).", self.deleted.len())
            }
            BatchStatus::Partial => {
                let ids: Vec<String> = self.failed.iter().map(|(id, _)| id.to_string()).collect();
                format!(
                    "Deleted {} of {} assignment(s). Failed to delete: {}",
                    self.deleted.len(),
                    self.requested,
                    ids.join(", ")
                )
            }
            BatchStatus::AllFailed => "No assignments were deleted.".to_string(),
        }
    }
}

/// Ids waiting for the user to confirm their deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelete {
    pub ids: Vec<i64>,
}

impl PendingDelete {
    pub fn prompt(&self) -> String {
        format!(
            "Are you sure you want to delete {} selected assignment(s)?",
            self.ids.len()
        )
    }
}

/// The assignments table: Admin sees every assignment, a Teacher their own.
pub struct AssignmentsView {
    ctx: ViewContext,
    list: ListState<Assignment>,
    add_dialog: FormDialog<AssignmentForm>,
    update_dialog: FormDialog<AssignmentForm>,
    update_target: Option<i64>,
    delete_dialog: ConfirmDialog<PendingDelete>,
}

impl AssignmentsView {
    pub fn new(ctx: ViewContext) -> Self {
        Self {
            ctx,
            list: ListState::default(),
            add_dialog: FormDialog::new(),
            update_dialog: FormDialog::new(),
            update_target: None,
            delete_dialog: ConfirmDialog::default(),
        }
    }

    pub fn list(&self) -> &ListState<Assignment> {
        &self.list
    }

    pub fn context(&self) -> &ViewContext {
        &self.ctx
    }

    pub fn add_dialog(&self) -> &FormDialog<AssignmentForm> {
        &self.add_dialog
    }

    pub fn add_dialog_mut(&mut self) -> &mut FormDialog<AssignmentForm> {
        &mut self.add_dialog
    }

    pub fn update_dialog(&self) -> &FormDialog<AssignmentForm> {
        &self.update_dialog
    }

    pub fn update_dialog_mut(&mut self) -> &mut FormDialog<AssignmentForm> {
        &mut self.update_dialog
    }

    pub fn delete_dialog(&self) -> &ConfirmDialog<PendingDelete> {
        &self.delete_dialog
    }

    pub fn dismiss_banner(&mut self) {
        self.list.dismiss_banner();
    }

    pub fn scope(&self) -> AssignmentScope {
        AssignmentScope::for_role(self.ctx.role())
    }

    /// Whether the "Add New Assignment" action is offered.
    pub fn can_add(&self) -> bool {
        self.ctx.capabilities().can_create
    }

    pub async fn mount(&mut self) {
        self.ctx.lifetime().remount();
        if self.ctx.session().is_authenticated() {
            self.load().await;
        }
    }

    pub fn unmount(&self) {
        self.ctx.lifetime().unmount();
    }

    /// Loads on sign-in, clears on sign-out.
    pub async fn on_session_changed(&mut self) {
        if self.ctx.session().is_authenticated() {
            self.load().await;
        } else {
            self.list.reset();
            self.add_dialog.reset();
            self.update_dialog.reset();
            self.update_target = None;
            self.delete_dialog.cancel();
        }
    }

    pub async fn load(&mut self) {
        let scope = self.scope();
        self.list.begin_load();
        let result = self
            .ctx
            .call(|api, token| async move { api.list_assignments(&token, scope).await })
            .await;
        self.list.finish_load(result, LOAD_FAILED);
    }

    pub fn open_add_dialog(&mut self) -> bool {
        if !self.can_add() {
            return false;
        }
        self.add_dialog.open();
        true
    }

    pub async fn submit_add_dialog(&mut self) -> Result<(), AppError> {
        let form = match self.add_dialog.submit() {
            Ok(form) => form,
            Err(e) => {
                self.list.show_error(&e, CREATE_FAILED);
                return Err(e);
            }
        };
        self.create(form).await
    }

    /// On failure the dialog keeps what the user typed.
    pub async fn create(&mut self, form: AssignmentForm) -> Result<(), AppError> {
        self.list.set_submitting(true);
        let result = self.send_create(&form).await;
        self.list.set_submitting(false);

        match result {
            Ok(()) => {
                info!("Created assignment {:?} in {}", form.title, form.course_name);
                self.list.show_success("Assignment added successfully");
                self.add_dialog.reset();
                self.load().await;
                Ok(())
            }
            Err(e) => {
                self.list.show_error(&e, CREATE_FAILED);
                Err(e)
            }
        }
    }

    async fn send_create(&self, form: &AssignmentForm) -> Result<(), AppError> {
        if !self.can_add() {
            return Err(AppError::Forbidden("Only teachers can create assignments.".to_string()));
        }
        if form.title.trim().is_empty() || form.description.trim().is_empty() {
            return Err(AppError::validation("Title and Description are required"));
        }
        if form.course_name.trim().is_empty() {
            return Err(AppError::validation("Course name is required"));
        }
        let req = NewAssignmentRequest {
            title: form.title.trim().to_string(),
            description: form.description.trim().to_string(),
            deadline: form.parsed_deadline()?,
            course_name: form.course_name.trim().to_string(),
        };
        self.ctx
            .call(|api, token| async move { api.create_assignment(&token, &req).await })
            .await
    }

    /// Opens the update dialog pre-filled from the row with `id`.
    pub fn open_update_dialog(&mut self, id: i64) -> bool {
        if !self.ctx.capabilities().can_update {
            return false;
        }
        let Some(assignment) = self.list.items().iter().find(|a| a.id == id) else {
            return false;
        };
        self.update_dialog.open_with(AssignmentForm::from_assignment(assignment));
        self.update_target = Some(id);
        true
    }

    pub async fn submit_update_dialog(&mut self) -> Result<(), AppError> {
        let submitted = self.update_dialog.submit().and_then(|form| {
            self.update_target
                .map(|id| (id, form))
                .ok_or_else(|| AppError::validation("No assignment selected"))
        });
        match submitted {
            Ok((id, form)) => self.update(id, form).await,
            Err(e) => {
                self.list.show_error(&e, UPDATE_FAILED);
                Err(e)
            }
        }
    }

    pub async fn update(&mut self, id: i64, form: AssignmentForm) -> Result<(), AppError> {
        self.list.set_submitting(true);
        let result = self.send_update(id, &form).await;
        self.list.set_submitting(false);

        match result {
            Ok(()) => {
                info!("Updated assignment {}", id);
                self.list.show_success("Assignment updated successfully.");
                self.update_dialog.reset();
                self.update_target = None;
                self.load().await;
                Ok(())
            }
            Err(e) => {
                self.list.show_error(&e, UPDATE_FAILED);
                Err(e)
            }
        }
    }

    async fn send_update(&self, id: i64, form: &AssignmentForm) -> Result<(), AppError> {
        if !self.ctx.capabilities().can_update {
            return Err(AppError::Forbidden("You cannot edit assignments.".to_string()));
        }
        if form.title.trim().is_empty() || form.description.trim().is_empty() {
            return Err(AppError::validation("Title and Description are required"));
        }
        let req = UpdateAssignmentRequest {
            title: form.title.trim().to_string(),
            description: form.description.trim().to_string(),
            deadline: form.parsed_deadline()?,
        };
        self.ctx
            .call(|api, token| async move { api.update_assignment(&token, id, &req).await })
            .await
    }

    /// Opens the delete confirmation for the selected ids. Nothing is sent
    /// until `confirm_delete`.
    pub fn request_delete(&mut self, ids: &[i64]) -> Result<(), AppError> {
        let ids = dedup(ids);
        if !self.ctx.capabilities().can_delete {
            let err = AppError::Forbidden("You cannot delete assignments.".to_string());
            self.list.show_error(&err, DELETE_FAILED);
            return Err(err);
        }
        if ids.is_empty() {
            return Err(AppError::validation("Select at least one assignment to delete."));
        }
        self.delete_dialog.open(PendingDelete { ids });
        Ok(())
    }

    pub fn cancel_delete(&mut self) {
        self.delete_dialog.cancel();
    }

    /// Runs the batch the user confirmed. `None` when no confirmation was open.
    pub async fn confirm_delete(&mut self) -> Result<Option<BatchDeleteOutcome>, AppError> {
        let Some(pending) = self.delete_dialog.confirm() else {
            return Ok(None);
        };
        self.delete(&pending.ids).await.map(Some)
    }

    /// Deletes every id concurrently and waits for all of them. Exactly the
    /// ids the server confirmed leave the local list.
    pub async fn delete(&mut self, ids: &[i64]) -> Result<BatchDeleteOutcome, AppError> {
        let unique = dedup(ids);
        if unique.is_empty() {
            return Ok(BatchDeleteOutcome::default());
        }
        if !self.ctx.capabilities().can_delete {
            let err = AppError::Forbidden("You cannot delete assignments.".to_string());
            self.list.show_error(&err, DELETE_FAILED);
            return Err(err);
        }
        let token = match self.ctx.token() {
            Ok(token) => token,
            Err(e) => {
                self.list.show_error(&e, DELETE_FAILED);
                return Err(e);
            }
        };

        self.list.set_submitting(true);
        let api = self.ctx.api();
        let batch = unique.clone();
        let settled = self
            .ctx
            .lifetime()
            .guard(async move {
                let mut tasks = JoinSet::new();
                for id in batch {
                    let api = api.clone();
                    let token = token.clone();
                    tasks.spawn(async move { (id, api.delete_assignment(&token, id).await) });
                }
                let mut settled = Vec::new();
                while let Some(joined) = tasks.join_next().await {
                    match joined {
                        Ok(result) => settled.push(result),
                        Err(e) => warn!("delete task did not finish: {}", e),
                    }
                }
                settled
            })
            .await;
        self.list.set_submitting(false);

        let Some(settled) = settled else {
            return Err(AppError::Detached);
        };

        let mut outcome = BatchDeleteOutcome {
            requested: unique.len(),
            ..Default::default()
        };
        let mut auth_failure = None;
        for id in &unique {
            match settled.iter().find(|(settled_id, _)| settled_id == id) {
                Some((_, Ok(()))) => outcome.deleted.push(*id),
                Some((_, Err(e))) => {
                    warn!("Failed to delete assignment {}: {}", id, e);
                    if e.is_auth_failure() {
                        auth_failure = Some(AppError::Unauthorized);
                    }
                    outcome.failed.push((*id, e.banner_text(DELETE_FAILED)));
                }
                None => outcome.failed.push((*id, DELETE_FAILED.to_string())),
            }
        }
        if let Some(e) = auth_failure {
            self.ctx.handle_auth_failure(&e).await;
        }

        info!(
            "Batch delete: {} requested, {} deleted, {} failed",
            outcome.requested,
            outcome.deleted.len(),
            outcome.failed.len()
        );

        self.list
            .items_mut()
            .retain(|a| !outcome.deleted.contains(&a.id));
        match outcome.status() {
            BatchStatus::AllSucceeded => self.list.show_success(outcome.summary()),
            _ => self.list.show_error_text(outcome.summary()),
        }

        if !self.list.items().is_empty() && self.ctx.session().is_authenticated() {
            self.load().await;
        }
        Ok(outcome)
    }

    /// The submissions page for one of the listed assignments.
    pub fn submissions_view(&self, id: i64) -> Result<SubmissionsView, AppError> {
        let assignment = self
            .list
            .items()
            .iter()
            .find(|a| a.id == id)
            .ok_or(AppError::NotFound)?;
        Ok(SubmissionsView::from_assignment(self.ctx.fork(), assignment))
    }

    pub fn table(&self) -> DataTable<Assignment> {
        DataTable::new(
            vec![
                Column::new("ID", |a: &Assignment| a.id.to_string()),
                Column::new("Title", |a: &Assignment| a.title.clone()),
                Column::new("Description", |a: &Assignment| a.description.clone()),
                Column::new("Course", |a: &Assignment| a.course_name.clone()),
                Column::new("Deadline", |a: &Assignment| deadline_label(a.deadline, Utc::now())),
                Column::new("Submissions", |a: &Assignment| a.submissions_label()),
            ],
            self.ctx.capabilities(),
        )
    }
}

fn dedup(ids: &[i64]) -> Vec<i64> {
    let mut unique: Vec<i64> = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(id) {
            unique.push(*id);
        }
    }
    unique
}
