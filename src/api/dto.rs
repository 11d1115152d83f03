use serde::Deserialize;

use crate::models::Role;

/// Which assignment collection to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentScope {
    /// Assignments visible to the caller (own for teachers).
    Caller,
    /// Every assignment. Admin only.
    All,
}

impl AssignmentScope {
    pub fn for_role(role: Option<Role>) -> Self {
        match role {
            Some(Role::Admin) => AssignmentScope::All,
            _ => AssignmentScope::Caller,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            AssignmentScope::Caller => "/api/assignments",
            AssignmentScope::All => "/api/assignments/admin",
        }
    }
}

/// Error payloads the API is known to send. Any of the fields may carry the
/// human-readable message.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        [self.message, self.error, self.title]
            .into_iter()
            .flatten()
            .find(|m| !m.trim().is_empty())
    }
}

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REGISTER_PATH: &str = "/api/auth/register";
pub const COURSES_PATH: &str = "/api/assignments/teachers";
pub const ASSIGNMENTS_PATH: &str = "/api/assignments";

pub fn assignment_path(id: i64) -> String {
    format!("{}/{}", ASSIGNMENTS_PATH, id)
}

pub fn submit_path(assignment_id: i64) -> String {
    format!("/api/submissions/{}/submit", assignment_id)
}

pub fn grade_path(assignment_id: i64, submission_id: i64) -> String {
    format!("/api/submissions/{}/grade/{}", assignment_id, submission_id)
}
