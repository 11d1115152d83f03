pub mod dto;
pub mod http;
pub mod memory;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{
    Assignment, Course, LoginRequest, LoginResponse, NewAssignmentRequest, RegisterRequest,
    Submission, SubmitRequest, SubmitResponse, UpdateAssignmentRequest,
};

pub use dto::AssignmentScope;
pub use http::HttpSchoolApi;
pub use memory::MemorySchoolApi;

/// The school REST API as the client consumes it. Authenticated calls take
/// the bearer token explicitly; the caller owns the session.
#[async_trait]
pub trait SchoolApi: Send + Sync {
    async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, AppError>;

    async fn register(&self, req: &RegisterRequest) -> Result<(), AppError>;

    async fn list_assignments(
        &self,
        token: &str,
        scope: AssignmentScope,
    ) -> Result<Vec<Assignment>, AppError>;

    async fn list_courses(&self, token: &str) -> Result<Vec<Course>, AppError>;

    async fn create_assignment(
        &self,
        token: &str,
        req: &NewAssignmentRequest,
    ) -> Result<(), AppError>;

    async fn update_assignment(
        &self,
        token: &str,
        id: i64,
        req: &UpdateAssignmentRequest,
    ) -> Result<(), AppError>;

    async fn delete_assignment(&self, token: &str, id: i64) -> Result<(), AppError>;

    async fn submit(
        &self,
        token: &str,
        assignment_id: i64,
        req: &SubmitRequest,
    ) -> Result<SubmitResponse, AppError>;

    /// Returns the updated submission when the server echoes it back.
    async fn grade(
        &self,
        token: &str,
        assignment_id: i64,
        submission_id: i64,
        grade: f64,
    ) -> Result<Option<Submission>, AppError>;
}
