use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use tracing::debug;
use uuid::Uuid;

use crate::api::{AssignmentScope, SchoolApi};
use crate::error::AppError;
use crate::models::assignment::deadline_passed;
use crate::models::{
    Assignment, Course, CourseAssignment, Id, LoginRequest, LoginResponse, NewAssignmentRequest,
    RegisterRequest, Role, Submission, SubmitRequest, SubmitResponse, UpdateAssignmentRequest,
    User,
};

/// In-process school API with the server's observable rules. Used by the
/// test suites and for offline runs of the client.
#[derive(Default)]
pub struct MemorySchoolApi {
    inner: Mutex<Inner>,
    requests: AtomicUsize,
}

#[derive(Default)]
struct Inner {
    accounts: Vec<Account>,
    tokens: HashMap<String, usize>,
    assignments: Vec<StoredAssignment>,
    next_user_id: i64,
    next_assignment_id: i64,
    next_submission_id: i64,
    failing_deletes: HashSet<i64>,
    delete_delays: HashMap<i64, Duration>,
}

struct Account {
    user: User,
    email: String,
    password: String,
}

struct StoredAssignment {
    id: i64,
    teacher: User,
    title: String,
    description: String,
    deadline: Option<DateTime<Utc>>,
    course_name: String,
    submissions: Vec<Submission>,
}

impl StoredAssignment {
    fn to_assignment(&self) -> Assignment {
        Assignment {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            deadline: self.deadline,
            course_name: self.course_name.clone(),
            teacher_name: self.teacher.full_name.clone(),
            submissions: self.submissions.clone(),
        }
    }

    fn owned_by(&self, user: &User) -> bool {
        self.teacher.id == user.id
    }
}

fn api_error(status: StatusCode, message: &str) -> AppError {
    AppError::Api {
        status,
        message: Some(message.to_string()),
    }
}

fn not_found(what: &str) -> AppError {
    api_error(StatusCode::NOT_FOUND, &format!("{} not found", what))
}

impl MemorySchoolApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an account directly, bypassing registration.
    pub fn seed_user(&self, email: &str, password: &str, full_name: &str, role: Role) -> User {
        let mut inner = self.lock();
        inner.add_account(email, password, full_name, role)
    }

    /// Makes every DELETE of these ids fail with a server error.
    pub fn fail_deletes_for(&self, ids: impl IntoIterator<Item = i64>) {
        self.lock().failing_deletes.extend(ids);
    }

    /// Holds the DELETE of `id` for `delay` before it settles.
    pub fn delay_delete(&self, id: i64, delay: Duration) {
        self.lock().delete_delays.insert(id, delay);
    }

    /// Number of API calls received so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn assignment(&self, id: i64) -> Option<Assignment> {
        self.lock()
            .assignments
            .iter()
            .find(|a| a.id == id)
            .map(StoredAssignment::to_assignment)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means a test thread panicked mid-call.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn count(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

impl Inner {
    fn add_account(&mut self, email: &str, password: &str, full_name: &str, role: Role) -> User {
        self.next_user_id += 1;
        let user = User {
            id: Id::Text(format!("user-{}", self.next_user_id)),
            full_name: Some(full_name.to_string()),
            email: Some(email.to_string()),
            role,
        };
        self.accounts.push(Account {
            user: user.clone(),
            email: email.to_string(),
            password: password.to_string(),
        });
        user
    }

    fn caller(&self, token: &str) -> Result<User, AppError> {
        self.tokens
            .get(token)
            .and_then(|idx| self.accounts.get(*idx))
            .map(|a| a.user.clone())
            .ok_or(AppError::Unauthorized)
    }

    fn assignment_mut(&mut self, id: i64) -> Result<&mut StoredAssignment, AppError> {
        self.assignments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| not_found("Assignment"))
    }
}

#[async_trait]
impl SchoolApi for MemorySchoolApi {
    async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, AppError> {
        self.count();
        let mut inner = self.lock();
        let idx = inner
            .accounts
            .iter()
            .position(|a| a.email.eq_ignore_ascii_case(&req.email) && a.password == req.password)
            .ok_or(AppError::Unauthorized)?;
        let token = Uuid::new_v4().to_string();
        inner.tokens.insert(token.clone(), idx);
        let user = inner.accounts[idx].user.clone();
        debug!("memory api: login {}", user.id);
        Ok(LoginResponse { token, user })
    }

    async fn register(&self, req: &RegisterRequest) -> Result<(), AppError> {
        self.count();
        let mut inner = self.lock();
        if inner
            .accounts
            .iter()
            .any(|a| a.email.eq_ignore_ascii_case(&req.email))
        {
            return Err(AppError::Api {
                status: StatusCode::BAD_REQUEST,
                message: Some("Email is already registered".to_string()),
            });
        }
        inner.add_account(&req.email, &req.password, &req.full_name, req.role);
        Ok(())
    }

    async fn list_assignments(
        &self,
        token: &str,
        scope: AssignmentScope,
    ) -> Result<Vec<Assignment>, AppError> {
        self.count();
        let inner = self.lock();
        let caller = inner.caller(token)?;
        let visible = inner.assignments.iter().filter(|a| match (scope, caller.role) {
            (AssignmentScope::Caller, Role::Teacher) => a.owned_by(&caller),
            _ => true,
        });
        if scope == AssignmentScope::All && caller.role != Role::Admin {
            return Err(AppError::Forbidden("Only admins can list all assignments.".to_string()));
        }
        Ok(visible.map(StoredAssignment::to_assignment).collect())
    }

    async fn list_courses(&self, token: &str) -> Result<Vec<Course>, AppError> {
        self.count();
        let inner = self.lock();
        let caller = inner.caller(token)?;

        let mut courses: Vec<Course> = Vec::new();
        for stored in &inner.assignments {
            let own = stored
                .submissions
                .iter()
                .find(|s| caller.role == Role::Student && s.student_id == caller.id);
            let row = CourseAssignment {
                id: stored.id,
                title: stored.title.clone(),
                description: stored.description.clone(),
                deadline: stored.deadline,
                content: own.map(|s| s.content.clone()),
                grade: own.and_then(|s| s.grade),
            };
            match courses
                .iter_mut()
                .find(|c| c.teacher_id == stored.teacher.id && c.course_name == stored.course_name)
            {
                Some(course) => course.assignments.push(row),
                None => courses.push(Course {
                    teacher_id: stored.teacher.id.clone(),
                    teacher_name: stored.teacher.full_name.clone().unwrap_or_default(),
                    course_name: stored.course_name.clone(),
                    assignments: vec![row],
                }),
            }
        }
        Ok(courses)
    }

    async fn create_assignment(
        &self,
        token: &str,
        req: &NewAssignmentRequest,
    ) -> Result<(), AppError> {
        self.count();
        let mut inner = self.lock();
        let caller = inner.caller(token)?;
        if caller.role != Role::Teacher {
            return Err(AppError::Forbidden("Only teachers can create assignments.".to_string()));
        }
        if req.title.trim().is_empty() || req.description.trim().is_empty() {
            return Err(api_error(StatusCode::BAD_REQUEST, "Title and Description are required"));
        }
        if req.course_name.trim().is_empty() {
            return Err(api_error(StatusCode::BAD_REQUEST, "Course name is required"));
        }
        inner.next_assignment_id += 1;
        let id = inner.next_assignment_id;
        inner.assignments.push(StoredAssignment {
            id,
            teacher: caller,
            title: req.title.clone(),
            description: req.description.clone(),
            deadline: req.deadline,
            course_name: req.course_name.clone(),
            submissions: Vec::new(),
        });
        Ok(())
    }

    async fn update_assignment(
        &self,
        token: &str,
        id: i64,
        req: &UpdateAssignmentRequest,
    ) -> Result<(), AppError> {
        self.count();
        let mut inner = self.lock();
        let caller = inner.caller(token)?;
        let stored = inner.assignment_mut(id)?;
        if !(stored.owned_by(&caller) || caller.role == Role::Admin) {
            return Err(AppError::Forbidden("You can only edit your own assignments.".to_string()));
        }
        stored.title = req.title.clone();
        stored.description = req.description.clone();
        stored.deadline = req.deadline;
        Ok(())
    }

    async fn delete_assignment(&self, token: &str, id: i64) -> Result<(), AppError> {
        self.count();
        let delay = self.lock().delete_delays.get(&id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.lock();
        let caller = inner.caller(token)?;
        if inner.failing_deletes.contains(&id) {
            return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete assignment"));
        }
        let idx = inner
            .assignments
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| not_found("Assignment"))?;
        if !(inner.assignments[idx].owned_by(&caller) || caller.role == Role::Admin) {
            return Err(AppError::Forbidden("You can only delete your own assignments.".to_string()));
        }
        inner.assignments.remove(idx);
        Ok(())
    }

    async fn submit(
        &self,
        token: &str,
        assignment_id: i64,
        req: &SubmitRequest,
    ) -> Result<SubmitResponse, AppError> {
        self.count();
        let mut inner = self.lock();
        let caller = inner.caller(token)?;
        if caller.role != Role::Student {
            return Err(AppError::Forbidden("Only students can submit assignments.".to_string()));
        }
        inner.next_submission_id += 1;
        let submission_id = inner.next_submission_id;
        let stored = inner.assignment_mut(assignment_id)?;
        if deadline_passed(stored.deadline, Utc::now()) {
            return Err(api_error(StatusCode::BAD_REQUEST, "The deadline for this assignment has passed."));
        }
        if stored.submissions.iter().any(|s| s.student_id == caller.id) {
            return Err(api_error(StatusCode::BAD_REQUEST, "You have already submitted this assignment."));
        }
        if req.content.trim().is_empty() {
            return Err(api_error(StatusCode::BAD_REQUEST, "Submission content can't be empty"));
        }
        stored.submissions.push(Submission {
            id: submission_id,
            student_id: caller.id.clone(),
            student_name: caller.full_name.clone(),
            content: req.content.clone(),
            grade: None,
        });
        Ok(SubmitResponse {
            message: Some("Submission received".to_string()),
        })
    }

    async fn grade(
        &self,
        token: &str,
        assignment_id: i64,
        submission_id: i64,
        grade: f64,
    ) -> Result<Option<Submission>, AppError> {
        self.count();
        let mut inner = self.lock();
        let caller = inner.caller(token)?;
        let stored = inner.assignment_mut(assignment_id)?;
        if caller.role != Role::Teacher || !stored.owned_by(&caller) {
            return Err(AppError::Forbidden("Only the assignment's teacher can grade it.".to_string()));
        }
        if !(60.0..=100.0).contains(&grade) {
            return Err(api_error(StatusCode::BAD_REQUEST, "Grade must be between 60 and 100."));
        }
        let submission = stored
            .submissions
            .iter_mut()
            .find(|s| s.id == submission_id)
            .ok_or_else(|| not_found("Submission"))?;
        if submission.grade.is_some() {
            return Err(api_error(StatusCode::BAD_REQUEST, "Submission already graded."));
        }
        submission.grade = Some(grade);
        Ok(Some(submission.clone()))
    }
}
