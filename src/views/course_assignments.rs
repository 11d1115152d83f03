use chrono::Utc;
use tracing::{debug, info};

use crate::dialogs::{FormDialog, SubmissionForm};
use crate::error::AppError;
use crate::models::assignment::{deadline_label, grade_label};
use crate::models::{CourseAssignment, SubmitAvailability, SubmitRequest};
use crate::table::{Column, DataTable};
use crate::views::{ListState, ViewContext};

const LOAD_FAILED: &str = "Failed to load assignments";
const SUBMIT_FAILED: &str = "Submission failed";

/// One course's assignments as a student sees them, with the submit flow.
pub struct CourseAssignmentsView {
    ctx: ViewContext,
    teacher_id: String,
    course_name: String,
    list: ListState<CourseAssignment>,
    submit_dialog: FormDialog<SubmissionForm>,
}

impl CourseAssignmentsView {
    pub fn new(ctx: ViewContext, teacher_id: impl Into<String>, course_name: impl Into<String>) -> Self {
        Self {
            ctx,
            teacher_id: teacher_id.into(),
            course_name: course_name.into(),
            list: ListState::default(),
            submit_dialog: FormDialog::new(),
        }
    }

    pub fn heading(&self) -> String {
        format!("Assignments for Course: {}", self.course_name)
    }

    pub fn teacher_id(&self) -> &str {
        &self.teacher_id
    }

    pub fn course_name(&self) -> &str {
        &self.course_name
    }

    pub fn list(&self) -> &ListState<CourseAssignment> {
        &self.list
    }

    pub fn submit_dialog(&self) -> &FormDialog<SubmissionForm> {
        &self.submit_dialog
    }

    pub fn submit_dialog_mut(&mut self) -> &mut FormDialog<SubmissionForm> {
        &mut self.submit_dialog
    }

    pub fn dismiss_banner(&mut self) {
        self.list.dismiss_banner();
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

    /// Fetches the course groups and keeps this course's rows. A course the
    /// server no longer lists shows as empty.
    pub async fn load(&mut self) {
        self.list.begin_load();
        let result = self
            .ctx
            .call(|api, token| async move { api.list_courses(&token).await })
            .await
            .map(|courses| {
                courses
                    .into_iter()
                    .find(|c| c.matches(&self.teacher_id, &self.course_name))
                    .map(|c| c.assignments)
                    .unwrap_or_else(|| {
                        debug!("course {}/{} not listed", self.teacher_id, self.course_name);
                        Vec::new()
                    })
            });
        self.list.finish_load(result, LOAD_FAILED);
    }

    pub fn availability(&self, assignment_id: i64) -> Option<SubmitAvailability> {
        self.list
            .items()
            .iter()
            .find(|a| a.id == assignment_id)
            .map(|a| a.submit_availability(Utc::now()))
    }

    /// Opens the submit dialog with empty content. Refused when the row's
    /// submit button would be disabled.
    pub fn open_submit_dialog(&mut self, assignment_id: i64) -> Result<(), AppError> {
        let checked = self.check_submittable(assignment_id);
        if let Err(e) = &checked {
            self.list.show_error(e, SUBMIT_FAILED);
            return checked;
        }
        self.submit_dialog.open_with(SubmissionForm {
            assignment_id,
            content: String::new(),
        });
        Ok(())
    }

    fn check_submittable(&self, assignment_id: i64) -> Result<(), AppError> {
        if !self.ctx.capabilities().can_submit {
            return Err(AppError::Forbidden("Only students can submit assignments.".to_string()));
        }
        match self.availability(assignment_id) {
            None => Err(AppError::validation("Assignment not found")),
            Some(SubmitAvailability::Open) => Ok(()),
            Some(SubmitAvailability::Submitted) => Err(AppError::validation(
                "You have already submitted this assignment.",
            )),
            Some(SubmitAvailability::DeadlinePassed) => Err(AppError::validation(
                "The deadline for this assignment has passed.",
            )),
        }
    }

    pub async fn submit_dialog_confirm(&mut self) -> Result<(), AppError> {
        let form = match self.submit_dialog.submit() {
            Ok(form) => form,
            Err(e) => {
                self.list.show_error(&e, SUBMIT_FAILED);
                return Err(e);
            }
        };
        self.submit(form.assignment_id, &form.content).await
    }

    /// Checks run locally first; nothing is sent for an empty answer, a
    /// passed deadline or an existing submission.
    pub async fn submit(&mut self, assignment_id: i64, content: &str) -> Result<(), AppError> {
        self.list.set_submitting(true);
        let result = self.send_submit(assignment_id, content).await;
        self.list.set_submitting(false);

        match result {
            Ok(message) => {
                info!("Submitted assignment {}", assignment_id);
                self.list.show_success(message);
                self.submit_dialog.reset();
                self.load().await;
                Ok(())
            }
            Err(e) => {
                self.list.show_error(&e, SUBMIT_FAILED);
                Err(e)
            }
        }
    }

    async fn send_submit(&self, assignment_id: i64, content: &str) -> Result<String, AppError> {
        self.check_submittable(assignment_id)?;
        if content.trim().is_empty() {
            return Err(AppError::validation("Submission content can't be empty"));
        }
        let req = SubmitRequest {
            content: content.to_string(),
        };
        let res = self
            .ctx
            .call(|api, token| async move { api.submit(&token, assignment_id, &req).await })
            .await?;
        Ok(res
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "Submission received".to_string()))
    }

    pub fn table(&self) -> DataTable<CourseAssignment> {
        DataTable::new(
            vec![
                Column::new("ID", |a: &CourseAssignment| a.id.to_string()),
                Column::new("Title", |a: &CourseAssignment| a.title.clone()),
                Column::new("Description", |a: &CourseAssignment| a.description.clone()),
                Column::new("Deadline", |a: &CourseAssignment| {
                    deadline_label(a.deadline, Utc::now())
                }),
                Column::new("Submission", |a: &CourseAssignment| a.content_label().to_string()),
                Column::new("Grade", |a: &CourseAssignment| grade_label(a.grade)),
                Column::new("Action", |a: &CourseAssignment| {
                    a.submit_availability(Utc::now()).label().to_string()
                }),
            ],
            self.ctx.capabilities(),
        )
    }
}
