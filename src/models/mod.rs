pub mod assignment;
pub mod auth;
pub mod course;
pub mod timestamp;
pub mod user;

pub use assignment::{
    Assignment, NewAssignmentRequest, Submission, SubmitRequest, SubmitResponse,
    UpdateAssignmentRequest,
};
pub use auth::{LoginRequest, LoginResponse, RegisterRequest};
pub use course::{Course, CourseAssignment, SubmitAvailability};
pub use user::{Capabilities, Id, Role, Session, User};
