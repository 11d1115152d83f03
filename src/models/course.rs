use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::assignment::deadline_passed;
use crate::models::timestamp;
use crate::models::user::Id;

/// Assignments grouped by teacher and course name. Computed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub teacher_id: Id,
    #[serde(default)]
    pub teacher_name: String,
    pub course_name: String,
    #[serde(default)]
    pub assignments: Vec<CourseAssignment>,
}

impl Course {
    pub fn assignments_label(&self) -> String {
        let count = self.assignments.len();
        format!("{} assignment{}", count, if count == 1 { "" } else { "s" })
    }

    pub fn matches(&self, teacher_id: &str, course_name: &str) -> bool {
        self.teacher_id.to_string() == teacher_id && self.course_name == course_name
    }
}

/// An assignment inside a course group. For a student caller the server
/// attaches that student's own submission content and grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseAssignment {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, with = "timestamp::option")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub grade: Option<f64>,
}

/// State of the per-row submit button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitAvailability {
    Open,
    Submitted,
    DeadlinePassed,
}

impl SubmitAvailability {
    pub fn label(&self) -> &'static str {
        match self {
            SubmitAvailability::Open => "Submit",
            SubmitAvailability::Submitted => "Submitted",
            SubmitAvailability::DeadlinePassed => "Deadline Passed",
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, SubmitAvailability::Open)
    }
}

impl CourseAssignment {
    pub fn has_submission(&self) -> bool {
        self.grade.is_some() || self.content.as_deref().is_some_and(|c| !c.is_empty())
    }

    pub fn submit_availability(&self, now: DateTime<Utc>) -> SubmitAvailability {
        if self.has_submission() {
            SubmitAvailability::Submitted
        } else if deadline_passed(self.deadline, now) {
            SubmitAvailability::DeadlinePassed
        } else {
            SubmitAvailability::Open
        }
    }

    pub fn content_label(&self) -> &str {
        match self.content.as_deref() {
            Some(c) if !c.is_empty() => c,
            _ => "No Submission",
        }
    }
}
