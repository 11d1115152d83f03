mod support;

use std::sync::Arc;

use reqwest::StatusCode;

use schoolhub::api::{HttpSchoolApi, SchoolApi};
use schoolhub::config::ClientConfig;
use schoolhub::db::LocalStorage;
use schoolhub::error::{AppError, ErrorKind};
use schoolhub::models::{Id, Role, User};
use schoolhub::session::SessionStore;
use schoolhub::state::AppState;
use schoolhub::views::{AssignmentsView, ViewContext, ViewState};

fn client(base_url: &str) -> HttpSchoolApi {
    HttpSchoolApi::new(ClientConfig::new(base_url)).expect("Failed to create client")
}

async fn signed_in_session(token: &str) -> SessionStore {
    let storage = LocalStorage::in_memory().await.expect("Failed to open storage");
    let session = SessionStore::new(storage);
    let user = User {
        id: Id::Num(1),
        full_name: Some("Avi Cohen".to_string()),
        email: None,
        role: Role::Teacher,
    };
    session.sign_in(token, user).await.expect("Failed to sign in");
    session
}

#[tokio::test]
async fn test_token_and_request_id_are_sent() {
    let url = support::spawn_header_check("t1").await;
    let api = client(&url);

    let courses = api.list_courses("t1").await.expect("Headers were rejected");
    assert!(courses.is_empty());

    let err = api.list_courses("other").await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));
}

#[tokio::test]
async fn test_unauthorized_signs_the_view_out() {
    let url = support::spawn_canned(401, "application/json", r#"{"message":"jwt expired"}"#).await;
    let session = signed_in_session("stale").await;
    let state = AppState::new(session.clone(), Arc::new(client(&url)));

    let mut view = AssignmentsView::new(ViewContext::new(&state));
    view.mount().await;

    assert!(!session.is_authenticated());
    assert_eq!(session.storage().get_item("token").await.unwrap(), None);
    assert_eq!(session.storage().get_item("user").await.unwrap(), None);
    assert_eq!(view.list().state(), ViewState::Error);
    assert_eq!(
        view.list().banner().unwrap().text,
        "You are not authorized. Please login again."
    );
}

#[tokio::test]
async fn test_forbidden_keeps_the_session() {
    let url = support::spawn_canned(403, "application/json", r#"{"message":"Admins only"}"#).await;
    let session = signed_in_session("t1").await;
    let state = AppState::new(session.clone(), Arc::new(client(&url)));

    let mut view = AssignmentsView::new(ViewContext::new(&state));
    view.mount().await;

    assert!(session.is_authenticated());
    assert_eq!(view.list().banner().unwrap().text, "Access denied: Admins only");
}

#[tokio::test]
async fn test_rejected_create_keeps_dialog_and_input() {
    let url = support::spawn_canned(400, "application/json", r#"{"message":"Unknown course CS999"}"#).await;
    let session = signed_in_session("t1").await;
    let state = AppState::new(session.clone(), Arc::new(client(&url)));

    let mut view = AssignmentsView::new(ViewContext::new(&state));
    assert!(view.open_add_dialog());
    let dialog = view.add_dialog_mut();
    dialog.on_change("title", "HW1").unwrap();
    dialog.on_change("description", "desc").unwrap();
    dialog.on_change("courseName", "CS999").unwrap();

    let err = view.submit_add_dialog().await.unwrap_err();
    assert!(matches!(err, AppError::Api { .. }));
    assert!(session.is_authenticated());
    assert!(view.add_dialog().is_open());
    assert_eq!(view.add_dialog().form().title, "HW1");
    assert_eq!(view.add_dialog().form().course_name, "CS999");
    assert_eq!(view.list().banner().unwrap().text, "Unknown course CS999");
}

#[tokio::test]
async fn test_server_error_message_is_shown_verbatim() {
    let url = support::spawn_canned(500, "application/json", r#"{"error":"Database is down"}"#).await;
    let err = client(&url).list_courses("t1").await.unwrap_err();
    match &err {
        AppError::Api { status, message } => {
            assert_eq!(*status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(message.as_deref(), Some("Database is down"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.banner_text("Failed to load assignments"), "Database is down");
}

#[tokio::test]
async fn test_html_error_page_uses_fallback() {
    let url = support::spawn_canned(502, "text/html", "<html><body>Bad Gateway</body></html>").await;
    let err = client(&url).list_courses("t1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Application);
    assert_eq!(err.banner_text("Failed to fetch courses"), "Failed to fetch courses");
}

#[tokio::test]
async fn test_html_success_is_malformed() {
    let url = support::spawn_canned(200, "text/html", "<html>Please sign in</html>").await;
    let err = client(&url).list_courses("t1").await.unwrap_err();
    match err {
        AppError::Malformed { raw } => assert_eq!(raw, "<html>Please sign in</html>"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_wrong_json_shape_is_malformed() {
    let url = support::spawn_canned(200, "application/json", r#"{"courses":[]}"#).await;
    let err = client(&url).list_courses("t1").await.unwrap_err();
    assert!(matches!(err, AppError::Malformed { .. }));
}

#[tokio::test]
async fn test_empty_success_for_delete() {
    let url = support::spawn_canned(204, "text/plain", "").await;
    client(&url)
        .delete_assignment("t1", 7)
        .await
        .expect("Empty 204 should be success");
}

#[tokio::test]
async fn test_grade_is_sent_as_a_plain_number() {
    let (url, seen) = support::spawn_capture().await;
    let api = client(&url);

    let echoed = api.grade("t1", 7, 3, 85.0).await.expect("Failed to grade");
    assert!(echoed.is_none());
    api.grade("t1", 7, 4, 72.5).await.expect("Failed to grade");

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].method.as_str(), "PATCH");
    assert_eq!(seen[0].path, "/api/submissions/7/grade/3");
    assert_eq!(seen[0].body, "85");
    assert_eq!(seen[1].body, "72.5");
}

#[tokio::test]
async fn test_connection_refused_is_transport() {
    let url = support::unreachable_url().await;
    let err = client(&url).list_courses("t1").await.unwrap_err();
    assert!(matches!(err, AppError::Transport(_)));
    assert_eq!(err.kind(), ErrorKind::Transport);
}
