//! Modal form state. Dialogs hold field values only; every network call is
//! made by the view that owns the dialog.

use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::timestamp::{format_timestamp, parse_timestamp};
use crate::models::Assignment;

/// A set of named text fields.
pub trait Form: Clone + Default {
    /// Returns false for an unknown field name.
    fn set_field(&mut self, name: &str, value: &str) -> bool;

    /// Fields the form itself refuses to submit empty, with their labels.
    fn required_fields(&self) -> Vec<(&'static str, &str)> {
        Vec::new()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FormDialog<F> {
    open: bool,
    form: F,
}

impl<F: Form> FormDialog<F> {
    pub fn new() -> Self {
        Self {
            open: false,
            form: F::default(),
        }
    }

    pub fn open_with(&mut self, initial: F) {
        self.form = initial;
        self.open = true;
    }

    /// Reopens with whatever the user typed last time.
    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn form(&self) -> &F {
        &self.form
    }

    pub fn on_change(&mut self, name: &str, value: &str) -> Result<(), AppError> {
        if self.form.set_field(name, value) {
            Ok(())
        } else {
            Err(AppError::validation(format!("Unknown field: {}", name)))
        }
    }

    /// Cancel. Never yields a submission.
    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn reset(&mut self) {
        self.open = false;
        self.form = F::default();
    }

    /// Hands the current values to the owner. The dialog stays open; the
    /// owner closes it once the request succeeds.
    pub fn submit(&self) -> Result<F, AppError> {
        if !self.open {
            return Err(AppError::validation("Dialog is not open"));
        }
        if let Some((label, _)) = self
            .form
            .required_fields()
            .into_iter()
            .find(|(_, value)| value.trim().is_empty())
        {
            return Err(AppError::validation(format!("{} is required", label)));
        }
        Ok(self.form.clone())
    }
}

/// Yes/no confirmation carrying the pending action.
#[derive(Debug, Clone)]
pub struct ConfirmDialog<T> {
    pending: Option<T>,
}

impl<T> Default for ConfirmDialog<T> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<T> ConfirmDialog<T> {
    pub fn open(&mut self, pending: T) {
        self.pending = Some(pending);
    }

    pub fn is_open(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref()
    }

    pub fn confirm(&mut self) -> Option<T> {
        self.pending.take()
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

/// Fields of the add and update assignment dialogs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentForm {
    pub title: String,
    pub description: String,
    pub course_name: String,
    /// `datetime-local` text or an RFC 3339 timestamp; empty for none.
    pub deadline: String,
}

impl AssignmentForm {
    pub fn from_assignment(assignment: &Assignment) -> Self {
        Self {
            title: assignment.title.clone(),
            description: assignment.description.clone(),
            course_name: assignment.course_name.clone(),
            deadline: assignment
                .deadline
                .map(|d| format_timestamp(&d))
                .unwrap_or_default(),
        }
    }

    /// Canonical deadline, `None` when the field is blank.
    pub fn parsed_deadline(&self) -> Result<Option<DateTime<Utc>>, AppError> {
        let raw = self.deadline.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        parse_timestamp(raw)
            .map(Some)
            .ok_or_else(|| AppError::validation(format!("Invalid deadline: {}", raw)))
    }
}

impl Form for AssignmentForm {
    fn set_field(&mut self, name: &str, value: &str) -> bool {
        let field = match name {
            "title" => &mut self.title,
            "description" => &mut self.description,
            "courseName" | "course_name" => &mut self.course_name,
            "deadline" => &mut self.deadline,
            _ => return false,
        };
        *field = value.to_string();
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionForm {
    pub assignment_id: i64,
    pub content: String,
}

impl Form for SubmissionForm {
    fn set_field(&mut self, name: &str, value: &str) -> bool {
        match name {
            "content" => {
                self.content = value.to_string();
                true
            }
            _ => false,
        }
    }
}
