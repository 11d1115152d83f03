mod support;

use std::sync::Arc;

use schoolhub::api::{HttpSchoolApi, MemorySchoolApi, SchoolApi};
use schoolhub::auth::{AuthPanel, SignInForm};
use schoolhub::config::ClientConfig;
use schoolhub::db::LocalStorage;
use schoolhub::models::{Role, SubmitAvailability};
use schoolhub::routes::Route;
use schoolhub::session::SessionStore;
use schoolhub::state::AppState;
use schoolhub::views::{AssignmentsView, BatchStatus, CoursesView, ViewContext};

struct Harness {
    server: Arc<MemorySchoolApi>,
    http: Arc<HttpSchoolApi>,
}

impl Harness {
    async fn start() -> Self {
        let server = Arc::new(MemorySchoolApi::new());
        server.seed_user("teacher@school.test", "pw", "Avi Cohen", Role::Teacher);
        server.seed_user("student@school.test", "pw", "Noa Levi", Role::Student);
        let url = support::spawn_school_server(server.clone()).await;
        let http = Arc::new(
            HttpSchoolApi::new(ClientConfig::new(format!("{}/", url))).expect("Failed to create client"),
        );
        Self { server, http }
    }

    /// A separate client instance (own storage) signed in as `email`.
    async fn sign_in(&self, email: &str) -> AppState {
        let storage = LocalStorage::in_memory().await.expect("Failed to open storage");
        let session = SessionStore::restore(storage).await;
        let mut panel = AuthPanel::default();
        panel.sign_in = SignInForm {
            email: email.to_string(),
            password: "pw".to_string(),
        };
        panel
            .sign_in(self.http.as_ref(), &session)
            .await
            .expect("Failed to sign in");
        AppState::new(session, self.http.clone())
    }
}

#[tokio::test]
async fn test_create_submit_grade_scenario() {
    let h = Harness::start().await;
    let teacher = h.sign_in("teacher@school.test").await;
    let student = h.sign_in("student@school.test").await;

    assert_eq!(Route::resolve(Route::SignIn, &teacher.session), Route::Dashboard);
    assert_eq!(Route::resolve(Route::SignIn, &student.session), Route::Courses);

    // Teacher creates HW1 without a deadline.
    let mut assignments = AssignmentsView::new(ViewContext::new(&teacher));
    assignments.mount().await;
    assert!(assignments.list().is_empty_state());
    assert!(assignments.open_add_dialog());
    {
        let dialog = assignments.add_dialog_mut();
        dialog.on_change("title", "HW1").unwrap();
        dialog.on_change("description", "desc").unwrap();
        dialog.on_change("courseName", "CS101").unwrap();
        dialog.on_change("deadline", "").unwrap();
    }
    assignments.submit_add_dialog().await.expect("Failed to create HW1");
    let hw1 = assignments.list().items()[0].clone();
    assert_eq!(hw1.title, "HW1");
    assert_eq!(hw1.deadline, None);
    assert!(hw1.submissions.is_empty());

    // Student submits "answer".
    let mut courses = CoursesView::new(ViewContext::new(&student));
    courses.mount().await;
    assert_eq!(courses.list().items().len(), 1);
    let mut course = courses.open_course(0).await.expect("Failed to open course");
    assert_eq!(course.availability(hw1.id), Some(SubmitAvailability::Open));
    course.open_submit_dialog(hw1.id).unwrap();
    course.submit_dialog_mut().on_change("content", "answer").unwrap();
    course.submit_dialog_confirm().await.expect("Failed to submit");
    assert_eq!(course.list().banner().unwrap().text, "Submission received");

    // Teacher sees one ungraded row and grades it 85.
    assignments.load().await;
    let mut submissions = assignments
        .submissions_view(hw1.id)
        .expect("Failed to open submissions");
    assert_eq!(submissions.list().items().len(), 1);
    let row = submissions.list().items()[0].clone();
    assert_eq!(row.content, "answer");
    assert_eq!(row.grade, None);

    submissions.set_grade_input(row.id, "85");
    submissions.request_grade(row.id).unwrap();
    submissions.confirm_grade().await.expect("Failed to grade");
    assert_eq!(submissions.list().items()[0].grade, Some(85.0));
    assert_eq!(submissions.list().items()[0].grade_label(), "85");
    assert!(!submissions.can_grade_row(row.id));

    // Student's view: graded, submit disabled.
    course.load().await;
    let seen = &course.list().items()[0];
    assert_eq!(seen.grade, Some(85.0));
    assert_eq!(seen.content_label(), "answer");
    assert_eq!(course.availability(hw1.id), Some(SubmitAvailability::Submitted));
    assert!(course.open_submit_dialog(hw1.id).is_err());
}

#[tokio::test]
async fn test_partial_batch_delete_over_http() {
    let h = Harness::start().await;
    let teacher = h.sign_in("teacher@school.test").await;

    let mut view = AssignmentsView::new(ViewContext::new(&teacher));
    for title in ["A", "B", "C", "D"] {
        view.create(schoolhub::dialogs::AssignmentForm {
            title: title.to_string(),
            description: "desc".to_string(),
            course_name: "CS101".to_string(),
            deadline: String::new(),
        })
        .await
        .expect("Failed to create");
    }
    let ids: Vec<i64> = view.list().items().iter().map(|a| a.id).collect();
    h.server.fail_deletes_for([ids[0], ids[2]]);

    let outcome = view.delete(&ids).await.expect("Delete batch failed");
    assert_eq!(outcome.status(), BatchStatus::Partial);
    assert_eq!(outcome.deleted.len(), 2);

    let mut left: Vec<i64> = view.list().items().iter().map(|a| a.id).collect();
    left.sort();
    assert_eq!(left, vec![ids[0], ids[2]]);
    assert!(h.server.assignment(ids[0]).is_some());
    assert!(h.server.assignment(ids[1]).is_none());
}

#[tokio::test]
async fn test_session_survives_restart() {
    let h = Harness::start().await;
    let storage = LocalStorage::in_memory().await.expect("Failed to open storage");
    let session = SessionStore::restore(storage.clone()).await;
    let mut panel = AuthPanel::default();
    panel.sign_in = SignInForm {
        email: "teacher@school.test".to_string(),
        password: "pw".to_string(),
    };
    let user = panel
        .sign_in(h.http.as_ref(), &session)
        .await
        .expect("Failed to sign in");

    let restored = SessionStore::restore(storage).await;
    assert!(restored.is_authenticated());
    assert_eq!(restored.current_user(), Some(user));
    assert_eq!(restored.token(), session.token());

    // The restored token still works against the server.
    let token = restored.token().unwrap();
    assert!(h.http.list_courses(&token).await.is_ok());
}
