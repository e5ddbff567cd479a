//! Login upsert, token validation and the admin promotion path.

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use sea_orm::EntityTrait;
use serde_json::json;

use storefront_api::entities::user;

#[tokio::test]
async fn google_login_creates_account_and_returns_token() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/auth/google",
            Some(json!({
                "email": "new@example.com",
                "name": "New Shopper",
                "picture": "https://example.com/p.jpg",
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["token_type"], "bearer");
    let token = body["access_token"].as_str().unwrap().to_string();

    let response = app.request(Method::GET, "/api/auth/me", None, Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["email"], "new@example.com");
    assert_eq!(body["name"], "New Shopper");
    assert_eq!(body["is_admin"], false);
}

#[tokio::test]
async fn repeated_login_does_not_duplicate_the_account() {
    let app = TestApp::new().await;
    let payload = json!({"email": "one@example.com", "name": "One"});

    for _ in 0..2 {
        let response = app
            .request(Method::POST, "/api/auth/google", Some(payload.clone()), None)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let users = user::Entity::find().all(&*app.state.db).await.unwrap();
    assert_eq!(users.len(), 1);
}

#[tokio::test]
async fn admin_login_promotes_existing_account() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/auth/google",
            Some(json!({"email": "staff@example.com", "name": "Staff"})),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::POST,
            "/api/auth/admin/google",
            Some(json!({"email": "staff@example.com", "name": "Staff"})),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let token = body["access_token"].as_str().unwrap().to_string();

    let response = app.request(Method::GET, "/api/auth/me", None, Some(&token)).await;
    let body = response_json(response).await;
    assert_eq!(body["is_admin"], true);
}

#[tokio::test]
async fn invalid_email_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/auth/google",
            Some(json!({"email": "not-an-email", "name": "X"})),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn garbage_token_is_401() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/auth/me", None, Some("not.a.jwt"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Could not validate credentials");
}

#[tokio::test]
async fn token_for_deleted_account_is_401() {
    let app = TestApp::new().await;
    let (user_id, token) = app.seed_user("gone@example.com", "Gone", false).await;

    user::Entity::delete_by_id(user_id)
        .exec(&*app.state.db)
        .await
        .unwrap();

    let response = app.request(Method::GET, "/api/auth/me", None, Some(&token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_bearer_header_is_401() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
