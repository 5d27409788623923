mod common;

use axum::{
    extract::FromRequestParts,
    http::{Request, StatusCode, header, request::Parts},
    response::IntoResponse,
};
use common::test_state;
use members_portal::{
    auth::{AdminUser, AuthRejection, AuthUser, LOGIN_REQUIRED_MESSAGE},
    models::Role,
    session::{Session, SessionUser},
};
use uuid::Uuid;

// --- Helpers ---

/// Request parts as the session middleware would leave them.
fn parts_with(session: &Session) -> Parts {
    let (mut parts, _) = Request::builder()
        .uri("/admin")
        .body(())
        .unwrap()
        .into_parts();
    parts.extensions.insert(session.clone());
    parts
}

fn logged_in(id: Uuid, name: &str) -> Session {
    let session = Session::new();
    session.authenticate(SessionUser {
        id,
        name: name.to_string(),
    });
    session
}

// --- AuthUser ---

#[tokio::test]
async fn test_auth_user_from_authenticated_session() {
    let id = Uuid::new_v4();
    let session = logged_in(id, "alice");
    let mut parts = parts_with(&session);

    let user = AuthUser::from_request_parts(&mut parts, &()).await.unwrap();

    assert_eq!(user.id, id);
    assert_eq!(user.name, "alice");
}

#[tokio::test]
async fn test_auth_user_rejects_anonymous_with_login_redirect() {
    let session = Session::new();
    let mut parts = parts_with(&session);

    let rejection = AuthUser::from_request_parts(&mut parts, &())
        .await
        .unwrap_err();
    assert!(matches!(rejection, AuthRejection::LoginRequired));

    let response = rejection.into_response();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login");
    assert_eq!(session.take_flash().as_deref(), Some(LOGIN_REQUIRED_MESSAGE));
}

#[tokio::test]
async fn test_auth_user_without_session_layer_is_internal_error() {
    let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();

    let rejection = AuthUser::from_request_parts(&mut parts, &())
        .await
        .unwrap_err();

    assert!(matches!(rejection, AuthRejection::NoSession));
    assert_eq!(
        rejection.into_response().status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

// --- AdminUser ---

#[tokio::test]
async fn test_admin_user_accepts_admin() {
    let t = test_state();
    let admin = t.repo.seed("root", "root@example.com", "secret", Role::Admin);
    let mut parts = parts_with(&logged_in(admin.id, "root"));

    let AdminUser(resolved) = AdminUser::from_request_parts(&mut parts, &t.state)
        .await
        .unwrap();

    assert_eq!(resolved.id, admin.id);
}

#[tokio::test]
async fn test_admin_user_forbids_ordinary_user() {
    let t = test_state();
    let bob = t.repo.seed("bob", "bob@example.com", "secret", Role::User);
    let mut parts = parts_with(&logged_in(bob.id, "bob"));

    let rejection = AdminUser::from_request_parts(&mut parts, &t.state)
        .await
        .unwrap_err();

    assert!(matches!(rejection, AuthRejection::Forbidden));
    assert_eq!(rejection.into_response().status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_user_rejects_anonymous() {
    let t = test_state();
    let mut parts = parts_with(&Session::new());

    let rejection = AdminUser::from_request_parts(&mut parts, &t.state)
        .await
        .unwrap_err();

    assert!(matches!(rejection, AuthRejection::LoginRequired));
}

#[tokio::test]
async fn test_admin_user_sees_role_change_without_relogin() {
    let t = test_state();
    let bob = t.repo.seed("bob", "bob@example.com", "secret", Role::User);
    let session = logged_in(bob.id, "bob");

    let mut parts = parts_with(&session);
    assert!(
        AdminUser::from_request_parts(&mut parts, &t.state)
            .await
            .is_err()
    );

    use members_portal::repository::Repository;
    t.repo.set_role(bob.id, Role::Admin).await.unwrap();

    let mut parts = parts_with(&session);
    assert!(
        AdminUser::from_request_parts(&mut parts, &t.state)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_admin_user_for_deleted_account_logs_out() {
    let t = test_state();
    let session = logged_in(Uuid::new_v4(), "ghost");
    let mut parts = parts_with(&session);

    let rejection = AdminUser::from_request_parts(&mut parts, &t.state)
        .await
        .unwrap_err();

    assert!(matches!(rejection, AuthRejection::LoginRequired));
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_admin_user_store_failure_is_internal_error() {
    let t = test_state();
    t.repo.set_failing(true);
    let mut parts = parts_with(&logged_in(Uuid::new_v4(), "alice"));

    let rejection = AdminUser::from_request_parts(&mut parts, &t.state)
        .await
        .unwrap_err();

    assert!(matches!(rejection, AuthRejection::Repository(_)));
    assert_eq!(
        rejection.into_response().status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[tokio::test]
async fn test_admin_user_reuses_resolved_user_from_extensions() {
    let t = test_state();
    let admin = t.repo.seed("root", "root@example.com", "secret", Role::Admin);
    let mut parts = parts_with(&logged_in(admin.id, "root"));
    parts.extensions.insert(AdminUser(admin.clone()));

    // A broken store would fail a fresh lookup.
    t.repo.set_failing(true);
    let AdminUser(resolved) = AdminUser::from_request_parts(&mut parts, &t.state)
        .await
        .unwrap();

    assert_eq!(resolved.id, admin.id);
    assert_eq!(t.repo.get_user_calls(), 0);
}
