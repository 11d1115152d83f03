use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::api::AssignmentScope;
use crate::dialogs::ConfirmDialog;
use crate::error::AppError;
use crate::models::assignment::{deadline_passed, format_grade};
use crate::models::{Assignment, Capabilities, Submission};
use crate::table::{Column, DataTable};
use crate::views::{ListState, ViewContext};

const LOAD_FAILED: &str = "Failed to load submissions";
const GRADE_FAILED: &str = "Failed to grade submission.";
const GRADE_RANGE: &str = "Please enter a valid grade between 60 and 100.";

/// Grade waiting for the teacher's confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingGrade {
    pub submission_id: i64,
    pub student_name: String,
    pub grade: f64,
}

impl PendingGrade {
    pub fn prompt(&self) -> String {
        format!(
            "Are you sure you want to assign a grade of {} to {} (submission #{})?",
            format_grade(self.grade),
            self.student_name,
            self.submission_id
        )
    }
}

/// Grade text to a number in [60, 100]. No rounding.
pub fn parse_grade(input: &str) -> Result<f64, AppError> {
    let grade: f64 = input
        .trim()
        .parse()
        .map_err(|_| AppError::validation(GRADE_RANGE))?;
    if !grade.is_finite() || !(60.0..=100.0).contains(&grade) {
        return Err(AppError::validation(GRADE_RANGE));
    }
    Ok(grade)
}

/// Submissions of one assignment, graded by its teacher.
pub struct SubmissionsView {
    ctx: ViewContext,
    assignment_id: i64,
    title: Option<String>,
    deadline: Option<DateTime<Utc>>,
    list: ListState<Submission>,
    grade_inputs: HashMap<i64, String>,
    confirm: ConfirmDialog<PendingGrade>,
}

impl SubmissionsView {
    /// Opened by id alone; call `refresh` to fetch.
    pub fn new(ctx: ViewContext, assignment_id: i64) -> Self {
        Self {
            ctx,
            assignment_id,
            title: None,
            deadline: None,
            list: ListState::default(),
            grade_inputs: HashMap::new(),
            confirm: ConfirmDialog::default(),
        }
    }

    /// Opened from the assignments table, seeded with the row it already has.
    pub fn from_assignment(ctx: ViewContext, assignment: &Assignment) -> Self {
        Self {
            ctx,
            assignment_id: assignment.id,
            title: Some(assignment.title.clone()),
            deadline: assignment.deadline,
            list: ListState::ready_with(assignment.submissions.clone()),
            grade_inputs: HashMap::new(),
            confirm: ConfirmDialog::default(),
        }
    }

    pub fn assignment_id(&self) -> i64 {
        self.assignment_id
    }

    pub fn heading(&self) -> String {
        match &self.title {
            Some(title) => format!("Submissions for Assignment #{} ({})", self.assignment_id, title),
            None => format!("Submissions for Assignment #{}", self.assignment_id),
        }
    }

    pub fn list(&self) -> &ListState<Submission> {
        &self.list
    }

    pub fn confirm_dialog(&self) -> &ConfirmDialog<PendingGrade> {
        &self.confirm
    }

    pub fn grade_input(&self, submission_id: i64) -> &str {
        self.grade_inputs
            .get(&submission_id)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn dismiss_banner(&mut self) {
        self.list.dismiss_banner();
    }

    /// Fetches when signed in; a view seeded from the table is refreshed too.
    pub async fn mount(&mut self) {
        self.ctx.lifetime().remount();
        if self.ctx.session().is_authenticated() {
            self.refresh().await;
        }
    }

    pub fn unmount(&self) {
        self.ctx.lifetime().unmount();
    }

    /// Refetches on sign-in, drops rows and typed grades on sign-out.
    pub async fn on_session_changed(&mut self) {
        if self.ctx.session().is_authenticated() {
            self.refresh().await;
        } else {
            self.list.reset();
            self.grade_inputs.clear();
            self.confirm.cancel();
        }
    }

    /// Refetches the assignment and takes its submissions.
    pub async fn refresh(&mut self) {
        let scope = AssignmentScope::for_role(self.ctx.role());
        let id = self.assignment_id;
        self.list.begin_load();
        let result = self
            .ctx
            .call(|api, token| async move { api.list_assignments(&token, scope).await })
            .await
            .and_then(|all| {
                all.into_iter()
                    .find(|a| a.id == id)
                    .ok_or_else(|| AppError::validation("Assignment not found"))
            });
        let result = result.map(|assignment| {
            self.title = Some(assignment.title);
            self.deadline = assignment.deadline;
            assignment.submissions
        });
        self.list.finish_load(result, LOAD_FAILED);
    }

    pub fn set_grade_input(&mut self, submission_id: i64, value: &str) {
        self.grade_inputs.insert(submission_id, value.to_string());
    }

    /// Whether the grade control of a row is enabled.
    pub fn can_grade_row(&self, submission_id: i64) -> bool {
        self.ctx.capabilities().can_grade
            && !deadline_passed(self.deadline, Utc::now())
            && self
                .list
                .items()
                .iter()
                .any(|s| s.id == submission_id && !s.is_graded())
    }

    /// Validates the typed grade and opens the confirmation.
    pub fn request_grade(&mut self, submission_id: i64) -> Result<(), AppError> {
        let pending = self.pending_grade(submission_id);
        match pending {
            Ok(pending) => {
                self.confirm.open(pending);
                Ok(())
            }
            Err(e) => {
                self.list.show_error(&e, GRADE_FAILED);
                Err(e)
            }
        }
    }

    fn pending_grade(&self, submission_id: i64) -> Result<PendingGrade, AppError> {
        if !self.ctx.capabilities().can_grade {
            return Err(AppError::Forbidden("Only teachers can grade submissions.".to_string()));
        }
        let submission = self
            .list
            .items()
            .iter()
            .find(|s| s.id == submission_id)
            .ok_or_else(|| AppError::validation("Submission not found"))?;
        if submission.is_graded() {
            return Err(AppError::validation("This submission has already been graded."));
        }
        if deadline_passed(self.deadline, Utc::now()) {
            return Err(AppError::validation("The deadline has passed. Grading is closed."));
        }
        let grade = parse_grade(self.grade_input(submission_id))?;
        Ok(PendingGrade {
            submission_id,
            student_name: submission
                .student_name
                .clone()
                .unwrap_or_else(|| "Student".to_string()),
            grade,
        })
    }

    pub fn cancel_grade(&mut self) {
        self.confirm.cancel();
    }

    /// Sends the confirmed grade and patches that one row.
    pub async fn confirm_grade(&mut self) -> Result<(), AppError> {
        let Some(pending) = self.confirm.confirm() else {
            return Ok(());
        };
        let assignment_id = self.assignment_id;
        let PendingGrade {
            submission_id,
            grade,
            ..
        } = pending;

        self.list.set_submitting(true);
        let result = self
            .ctx
            .call(|api, token| async move {
                api.grade(&token, assignment_id, submission_id, grade).await
            })
            .await;
        self.list.set_submitting(false);

        match result {
            Ok(echoed) => {
                info!("Graded submission {} of assignment {}: {}", submission_id, assignment_id, grade);
                if let Some(row) = self
                    .list
                    .items_mut()
                    .iter_mut()
                    .find(|s| s.id == submission_id)
                {
                    match echoed {
                        Some(updated) if updated.id == submission_id => *row = updated,
                        _ => row.grade = Some(grade),
                    }
                }
                self.grade_inputs.insert(submission_id, String::new());
                self.list.show_success(format!(
                    "Submission {} graded: {}",
                    submission_id,
                    format_grade(grade)
                ));
                Ok(())
            }
            Err(e) => {
                self.list.show_error(&e, GRADE_FAILED);
                Err(e)
            }
        }
    }

    pub fn table(&self) -> DataTable<Submission> {
        DataTable::new(
            vec![
                Column::new("ID", |s: &Submission| s.id.to_string()),
                Column::new("Student ID", |s: &Submission| s.student_id.to_string()),
                Column::new("Student Name", |s: &Submission| {
                    s.student_name.clone().unwrap_or_else(|| "N/A".to_string())
                }),
                Column::new("Content", |s: &Submission| s.content.clone()),
                Column::new("Grade", |s: &Submission| s.grade_label()),
            ],
            // Grading is per row; no bulk actions here.
            Capabilities::NONE,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::api::{MemorySchoolApi, SchoolApi};
    use crate::db::LocalStorage;
    use crate::models::{LoginRequest, NewAssignmentRequest, Role, SubmitRequest};
    use crate::session::SessionStore;
    use crate::state::AppState;

    #[test]
    fn test_parse_grade_bounds() {
        assert!(parse_grade("59").is_err());
        assert_eq!(parse_grade("60").unwrap(), 60.0);
        assert_eq!(parse_grade(" 85.5 ").unwrap(), 85.5);
        assert_eq!(parse_grade("100").unwrap(), 100.0);
        assert!(parse_grade("100.5").is_err());
        assert!(parse_grade("abc").is_err());
        assert!(parse_grade("").is_err());
        assert!(parse_grade("NaN").is_err());

        let err = parse_grade("59").unwrap_err();
        assert_eq!(err.to_string(), "Please enter a valid grade between 60 and 100.");
    }

    async fn login(api: &MemorySchoolApi, email: &str) -> (String, crate::models::User) {
        let res = api
            .login(&LoginRequest {
                email: email.to_string(),
                password: "pw".to_string(),
            })
            .await
            .expect("Failed to login");
        (res.token, res.user)
    }

    /// A teacher-owned assignment with one ungraded submission, viewed by
    /// the teacher.
    async fn graded_setup() -> (Arc<MemorySchoolApi>, SubmissionsView, i64) {
        let api = Arc::new(MemorySchoolApi::new());
        api.seed_user("t@school.test", "pw", "Avi Cohen", Role::Teacher);
        api.seed_user("s@school.test", "pw", "Noa Levi", Role::Student);

        let (teacher_token, teacher) = login(&api, "t@school.test").await;
        api.create_assignment(
            &teacher_token,
            &NewAssignmentRequest {
                title: "HW1".to_string(),
                description: "desc".to_string(),
                deadline: None,
                course_name: "CS101".to_string(),
            },
        )
        .await
        .unwrap();
        let (student_token, _) = login(&api, "s@school.test").await;
        api.submit(
            &student_token,
            1,
            &SubmitRequest {
                content: "answer".to_string(),
            },
        )
        .await
        .unwrap();

        let storage = LocalStorage::in_memory().await.unwrap();
        let session = SessionStore::new(storage);
        session.sign_in(teacher_token, teacher).await.unwrap();
        let state = AppState::new(session, api.clone());

        let mut view = SubmissionsView::new(ViewContext::new(&state), 1);
        view.mount().await;
        let submission_id = view.list().items()[0].id;
        (api, view, submission_id)
    }

    #[tokio::test]
    async fn test_grade_flow_patches_row() {
        let (api, mut view, sid) = graded_setup().await;
        assert!(view.can_grade_row(sid));
        assert_eq!(view.list().items()[0].grade_label(), "No Grade Given");

        view.set_grade_input(sid, "85");
        view.request_grade(sid).unwrap();
        let prompt = view.confirm_dialog().pending().unwrap().prompt();
        assert!(prompt.contains("Noa Levi"));

        view.confirm_grade().await.unwrap();
        assert_eq!(view.list().items()[0].grade, Some(85.0));
        assert_eq!(view.grade_input(sid), "");
        assert_eq!(
            view.list().banner().unwrap().text,
            format!("Submission {} graded: 85", sid)
        );
        assert!(!view.can_grade_row(sid));
        assert_eq!(api.assignment(1).unwrap().submissions[0].grade, Some(85.0));
    }

    #[tokio::test]
    async fn test_out_of_range_grade_never_opens_dialog() {
        let (api, mut view, sid) = graded_setup().await;
        let before = api.request_count();

        view.set_grade_input(sid, "59");
        assert!(view.request_grade(sid).is_err());
        assert!(!view.confirm_dialog().is_open());
        assert_eq!(view.list().banner().unwrap().text, GRADE_RANGE);
        assert_eq!(api.request_count(), before);
    }

    #[tokio::test]
    async fn test_graded_row_is_write_once() {
        let (_api, mut view, sid) = graded_setup().await;
        view.set_grade_input(sid, "90");
        view.request_grade(sid).unwrap();
        view.confirm_grade().await.unwrap();

        view.set_grade_input(sid, "95");
        let err = view.request_grade(sid).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(view.list().items()[0].grade, Some(90.0));
    }

    #[tokio::test]
    async fn test_cancel_sends_nothing() {
        let (api, mut view, sid) = graded_setup().await;
        view.set_grade_input(sid, "70");
        view.request_grade(sid).unwrap();
        view.cancel_grade();
        let before = api.request_count();
        view.confirm_grade().await.unwrap();
        assert_eq!(api.request_count(), before);
        assert_eq!(view.list().items()[0].grade, None);
    }

    #[tokio::test]
    async fn test_session_change_resets_then_refetches() {
        let (api, mut view, sid) = graded_setup().await;
        view.set_grade_input(sid, "75");
        view.request_grade(sid).unwrap();

        let session = view.ctx.session().clone();
        let teacher = session.current_user().unwrap();
        session.sign_out().await.unwrap();
        view.on_session_changed().await;
        assert!(view.list().items().is_empty());
        assert!(!view.confirm_dialog().is_open());
        assert_eq!(view.grade_input(sid), "");

        let (token, _) = login(&api, "t@school.test").await;
        session.sign_in(token, teacher).await.unwrap();
        view.on_session_changed().await;
        assert_eq!(view.list().items().len(), 1);
        assert_eq!(view.heading(), "Submissions for Assignment #1 (HW1)");
    }
}
