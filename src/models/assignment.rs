use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::timestamp;
use crate::models::user::Id;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, with = "timestamp::option")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub course_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_name: Option<String>,
    #[serde(default)]
    pub submissions: Vec<Submission>,
}

impl Assignment {
    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        deadline_passed(self.deadline, now)
    }

    pub fn submissions_label(&self) -> String {
        let count = self.submissions.len();
        format!("{} {}", count, if count == 1 { "Student" } else { "Students" })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: i64,
    pub student_id: Id,
    #[serde(default)]
    pub student_name: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub grade: Option<f64>,
}

impl Submission {
    pub fn is_graded(&self) -> bool {
        self.grade.is_some()
    }

    pub fn grade_label(&self) -> String {
        grade_label(self.grade)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssignmentRequest {
    pub title: String,
    pub description: String,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub deadline: Option<DateTime<Utc>>,
    pub course_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssignmentRequest {
    pub title: String,
    pub description: String,
    #[serde(default, with = "timestamp::option")]
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Submissions and grading close once `now` is past the deadline.
pub fn deadline_passed(deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    deadline.is_some_and(|d| now > d)
}

pub fn deadline_label(deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(deadline) = deadline else {
        return "No deadline".to_string();
    };
    // The label runs out at the deadline itself.
    if deadline <= now {
        return "Deadline Passed".to_string();
    }
    let left = deadline - now;
    let days = left.num_days();
    let hours = left.num_hours() % 24;
    let minutes = left.num_minutes() % 60;
    format!("{} days {} hours {} mins left", days, hours, minutes)
}

pub fn grade_label(grade: Option<f64>) -> String {
    match grade {
        Some(g) => format_grade(g),
        None => "No Grade Given".to_string(),
    }
}

pub fn format_grade(grade: f64) -> String {
    if grade.fract() == 0.0 {
        format!("{}", grade as i64)
    } else {
        format!("{}", grade)
    }
}
