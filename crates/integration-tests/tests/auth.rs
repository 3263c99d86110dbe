//! Integration tests for login, signup, logout and session sync.

use std::time::Duration;

use voltparts_integration_tests::{MockBackend, PASSWORD};
use voltparts_storefront::services::{AuthError, RegisterRequest};
use voltparts_storefront::storage::LocalStorage;

async fn backend() -> MockBackend {
    MockBackend::start().await.expect("Failed to start mock backend")
}

#[tokio::test]
async fn test_login_persists_session() {
    let backend = backend().await;
    let storage = LocalStorage::in_memory();
    let storefront = backend.storefront_with(storage.clone()).expect("storefront");

    let user = storefront
        .auth()
        .login("anita@example.in", PASSWORD)
        .await
        .expect("login");
    assert_eq!(user.name, "Anita Rao");
    assert_eq!(user.first_name(), "Anita");
    assert!(storefront.auth().is_authenticated());
    assert!(!storefront.auth().is_admin());
    assert!(storage.get_item("authToken").is_some());
    assert!(storage.get_item("currentUser").is_some());

    // A new handle on the same storage starts signed in.
    let reopened = backend.storefront_with(storage).expect("storefront");
    assert_eq!(reopened.auth().current_user(), Some(user));
}

#[tokio::test]
async fn test_wrong_password_is_invalid_credentials() {
    let backend = backend().await;
    let storefront = backend.storefront().expect("storefront");

    let err = storefront
        .auth()
        .login("anita@example.in", "nope")
        .await
        .expect_err("rejected");
    assert!(matches!(err, AuthError::InvalidCredentials));
    assert!(!storefront.auth().is_authenticated());
    assert!(storefront.storage().get_item("authToken").is_none());
}

#[tokio::test]
async fn test_malformed_email_never_reaches_backend() {
    let backend = backend().await;
    let storefront = backend.storefront().expect("storefront");

    let err = storefront
        .auth()
        .login("anita.example.in", PASSWORD)
        .await
        .expect_err("rejected");
    assert!(matches!(err, AuthError::InvalidEmail(_)));
    assert_eq!(backend.total_hits(), 0);
}

#[tokio::test]
async fn test_register_validates_then_signs_in() {
    let backend = backend().await;
    let storefront = backend.storefront().expect("storefront");

    let weak = RegisterRequest {
        name: "Kabir Singh".to_string(),
        email: "kabir@example.in".to_string(),
        phone: None,
        password: "password".to_string(),
        confirm_password: "password".to_string(),
    };
    let err = storefront
        .auth()
        .register(weak.clone())
        .await
        .expect_err("weak password");
    assert!(matches!(err, AuthError::WeakPassword(_)));

    let mismatch = RegisterRequest {
        password: PASSWORD.to_string(),
        confirm_password: format!("{PASSWORD}!"),
        ..weak.clone()
    };
    let err = storefront
        .auth()
        .register(mismatch)
        .await
        .expect_err("mismatch");
    assert!(matches!(err, AuthError::PasswordMismatch));
    assert_eq!(backend.total_hits(), 0);

    let user = storefront
        .auth()
        .register(RegisterRequest {
            password: PASSWORD.to_string(),
            confirm_password: PASSWORD.to_string(),
            phone: Some("9988776655".to_string()),
            ..weak
        })
        .await
        .expect("registered");
    assert_eq!(user.email.as_str(), "kabir@example.in");
    assert_eq!(user.phone.as_deref(), Some("9988776655"));
    assert!(storefront.auth().is_authenticated());
}

#[tokio::test]
async fn test_duplicate_registration_is_api_error() {
    let backend = backend().await;
    let storefront = backend.storefront().expect("storefront");

    let err = storefront
        .auth()
        .register(RegisterRequest {
            name: "Anita Rao".to_string(),
            email: "anita@example.in".to_string(),
            phone: None,
            password: PASSWORD.to_string(),
            confirm_password: PASSWORD.to_string(),
        })
        .await
        .expect_err("already registered");
    match err {
        AuthError::Api(api) => assert_eq!(api.status(), Some(409)),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_logout_clears_session() {
    let backend = backend().await;
    let storefront = backend.storefront().expect("storefront");
    storefront
        .auth()
        .login("anita@example.in", PASSWORD)
        .await
        .expect("login");

    let mut session = storefront.auth().subscribe();
    storefront.auth().logout().expect("logout");

    assert!(session.has_changed().expect("sender alive"));
    assert!(session.borrow_and_update().is_none());
    assert!(storefront.storage().get_item("authToken").is_none());
    assert!(storefront.storage().get_item("currentUser").is_none());
}

#[tokio::test]
async fn test_session_syncs_across_handles() {
    let backend = backend().await;
    let storage = LocalStorage::in_memory();
    let first = backend.storefront_with(storage.clone()).expect("storefront");
    let second = backend.storefront_with(storage).expect("storefront");

    let mut second_session = second.auth().subscribe();
    let sync = second.auth().spawn_storage_sync();

    first
        .auth()
        .login("anita@example.in", PASSWORD)
        .await
        .expect("login");
    let signed_in = tokio::time::timeout(
        Duration::from_secs(2),
        second_session.wait_for(Option::is_some),
    )
    .await
    .expect("sync in time")
    .expect("sender alive")
    .clone();
    assert_eq!(signed_in.map(|u| u.name), Some("Anita Rao".to_string()));

    first.auth().logout().expect("logout");
    tokio::time::timeout(Duration::from_secs(2), second_session.wait_for(Option::is_none))
        .await
        .expect("sync in time")
        .expect("sender alive");
    assert!(!second.auth().is_authenticated());

    sync.abort();
}
