mod common;

use authgate::auth::{verify_password, Claims, TokenKind};
use authgate::error::ErrorResponse;
use authgate::store::CredentialStore;
use authgate::store::RefreshTokenStore;
use common::{refresh_cookie_header, refresh_cookie_value, spawn_app};
use serde_json::{json, Value};
use uuid::Uuid;

// --- Registration Tests ---

#[tokio::test]
async fn register_returns_201_with_user_token_and_cookie() {
    let app = spawn_app().await;

    let response = app
        .post_json(
            "/auth/register",
            &json!({ "email": "a@x.com", "password": "pw123456", "role": "user" }),
        )
        .await;

    assert_eq!(201, response.status().as_u16());

    let cookie = refresh_cookie_header(&response).expect("refreshToken cookie missing");
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(!cookie.contains("Secure"));
    let refresh_token = refresh_cookie_value(&response).unwrap();

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["user"]["email"], "a@x.com");
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"]["username"].as_str().unwrap().starts_with("user"));
    assert!(body["user"].get("password").is_none());
    assert!(body.get("refreshToken").is_none());

    let access_token = body["accessToken"].as_str().expect("accessToken missing");
    let claims = app.tokens.verify_access(access_token).unwrap();

    let stored = app.users.find_by_email("a@x.com").await.unwrap().unwrap();
    assert_eq!(claims.user_id().unwrap(), stored.user.id);
    assert_ne!(stored.password_hash, "pw123456");
    assert!(verify_password("pw123456", &stored.password_hash).unwrap());

    assert_eq!(app.refresh_tokens.count_for_user(stored.user.id), 1);
    assert!(app.refresh_tokens.exists(&refresh_token).await.unwrap());
}

#[tokio::test]
async fn register_returns_403_for_admin_role_and_creates_nothing() {
    let app = spawn_app().await;

    let response = app
        .post_json(
            "/auth/register",
            &json!({ "email": "root@x.com", "password": "pw123456", "role": "admin" }),
        )
        .await;

    assert_eq!(403, response.status().as_u16());
    assert!(refresh_cookie_header(&response).is_none());

    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.code, "AUTHORIZATION_ERROR");
    assert!(app.users.is_empty());
    assert!(app.refresh_tokens.is_empty());
}

#[tokio::test]
async fn register_returns_422_for_invalid_input() {
    let app = spawn_app().await;

    let test_cases = vec![
        (json!({ "email": "notanemail", "password": "pw123456" }), "invalid email"),
        (
            json!({ "email": format!("{}@example.com", "a".repeat(45)), "password": "pw123456" }),
            "email too long",
        ),
        (json!({ "email": "a@x.com", "password": "short" }), "password too short"),
        (json!({ "email": "a@x.com" }), "missing password"),
        (json!({ "password": "pw123456" }), "missing email"),
        (
            json!({ "email": "a@x.com", "password": "pw123456", "role": "owner" }),
            "unknown role",
        ),
        (
            json!({ "email": "a@x.com", "password": "pw123456", "isAdmin": true }),
            "field outside the allow-list",
        ),
        (
            json!({ "email": "a@x.com", "password": "pw123456", "firstName": "x".repeat(21) }),
            "first name too long",
        ),
    ];

    for (body, reason) in test_cases {
        let response = app.post_json("/auth/register", &body).await;
        assert_eq!(
            422,
            response.status().as_u16(),
            "Should reject request: {}",
            reason
        );
    }

    assert!(app.users.is_empty());
}

#[tokio::test]
async fn register_returns_409_for_duplicate_email() {
    let app = spawn_app().await;

    assert_eq!(201, app.register("a@x.com", "pw123456").await.status().as_u16());

    let response = app.register("a@x.com", "other-password").await;
    assert_eq!(409, response.status().as_u16());

    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.code, "DUPLICATE_KEY");
    assert_eq!(app.users.len(), 1);
}

#[tokio::test]
async fn register_accepts_profile_fields() {
    let app = spawn_app().await;

    let response = app
        .post_json(
            "/auth/register",
            &json!({
                "email": "ada@x.com",
                "password": "pw123456",
                "firstName": "Ada",
                "lastName": "Lovelace",
                "socialLinks": { "website": "https://ada.dev" }
            }),
        )
        .await;
    assert_eq!(201, response.status().as_u16());

    let stored = app.users.find_by_email("ada@x.com").await.unwrap().unwrap();
    assert_eq!(stored.user.profile.last_name.as_deref(), Some("Lovelace"));
    assert_eq!(
        stored.user.profile.social_links.website.as_deref(),
        Some("https://ada.dev")
    );
}

// --- Login Tests ---

#[tokio::test]
async fn login_returns_201_for_valid_credentials() {
    let app = spawn_app().await;
    app.register("a@x.com", "pw123456").await;

    let response = app.login("a@x.com", "pw123456").await;
    assert_eq!(201, response.status().as_u16());
    assert!(refresh_cookie_value(&response).is_some());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user"]["email"], "a@x.com");
    assert!(body["accessToken"].as_str().is_some());

    let stored = app.users.find_by_email("a@x.com").await.unwrap().unwrap();
    assert_eq!(app.refresh_tokens.count_for_user(stored.user.id), 2);
}

#[tokio::test]
async fn login_returns_404_for_wrong_password_without_store_writes() {
    let app = spawn_app().await;
    app.register("a@x.com", "pw123456").await;
    let tokens_before = app.refresh_tokens.len();

    let response = app.login("a@x.com", "wrong-password").await;

    assert_eq!(404, response.status().as_u16());
    assert!(refresh_cookie_header(&response).is_none());
    let body: Value = response.json().await.unwrap();
    assert!(body.get("accessToken").is_none());
    assert_eq!(app.refresh_tokens.len(), tokens_before);
}

#[tokio::test]
async fn login_returns_404_for_unknown_user() {
    let app = spawn_app().await;

    let response = app.login("nobody@x.com", "pw123456").await;

    assert_eq!(404, response.status().as_u16());
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.code, "NOT_FOUND");
}

// --- Refresh Tests ---

#[tokio::test]
async fn refresh_returns_new_access_token_for_stored_cookie() {
    let app = spawn_app().await;
    let registered = app.register("a@x.com", "pw123456").await;
    let refresh_token = refresh_cookie_value(&registered).unwrap();

    let response = app.refresh(Some(&refresh_token)).await;
    assert_eq!(200, response.status().as_u16());
    assert!(refresh_cookie_header(&response).is_none());

    let body: Value = response.json().await.unwrap();
    let access_token = body["accessToken"].as_str().unwrap();
    assert!(app.tokens.verify_access(access_token).is_ok());

    // not rotated: the same cookie keeps working
    assert_eq!(200, app.refresh(Some(&refresh_token)).await.status().as_u16());
}

#[tokio::test]
async fn refresh_returns_401_without_cookie() {
    let app = spawn_app().await;

    let response = app.refresh(None).await;

    assert_eq!(401, response.status().as_u16());
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.code, "MISSING_TOKEN");
}

#[tokio::test]
async fn refresh_returns_401_invalid_for_token_not_in_store() {
    let app = spawn_app().await;
    let unknown = app.tokens.issue_refresh_token(Uuid::new_v4()).unwrap().token;

    for cookie in [unknown.as_str(), "garbage"] {
        let response = app.refresh(Some(cookie)).await;
        assert_eq!(401, response.status().as_u16());

        let body: ErrorResponse = response.json().await.unwrap();
        assert_eq!(body.code, "TOKEN_INVALID");
        assert_eq!(body.message, "Invalid refresh token");
    }
}

#[tokio::test]
async fn refresh_returns_401_expired_for_stored_expired_token() {
    let app = spawn_app().await;
    let user_id = Uuid::new_v4();

    let mut claims = Claims::new(user_id, TokenKind::Refresh, 0);
    claims.iat -= 3600;
    claims.exp -= 60;
    let expired = app.tokens.sign(&claims, TokenKind::Refresh).unwrap();
    app.refresh_tokens
        .create(&expired, user_id, chrono::Utc::now())
        .await
        .unwrap();

    let response = app.refresh(Some(&expired)).await;

    assert_eq!(401, response.status().as_u16());
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.code, "TOKEN_EXPIRED");
    assert_eq!(body.message, "Refresh token expired");
}

// --- Logout Tests ---

#[tokio::test]
async fn logout_revokes_refresh_token_and_clears_cookie() {
    let app = spawn_app().await;
    let registered = app.register("a@x.com", "pw123456").await;
    let refresh_token = refresh_cookie_value(&registered).unwrap();
    let body: Value = registered.json().await.unwrap();
    let access_token = body["accessToken"].as_str().unwrap().to_string();

    let response = app.logout(Some(&access_token), Some(&refresh_token)).await;
    assert_eq!(204, response.status().as_u16());
    let cleared = refresh_cookie_header(&response).expect("cookie should be cleared");
    assert!(cleared.starts_with("refreshToken=;"));
    assert!(cleared.contains("Max-Age=0"));

    assert!(!app.refresh_tokens.exists(&refresh_token).await.unwrap());
    assert_eq!(401, app.refresh(Some(&refresh_token)).await.status().as_u16());

    // second logout with the same session is not an error
    let again = app.logout(Some(&access_token), Some(&refresh_token)).await;
    assert_eq!(204, again.status().as_u16());
}

#[tokio::test]
async fn logout_keeps_other_sessions_alive() {
    let app = spawn_app().await;
    let first = app.register("a@x.com", "pw123456").await;
    let first_refresh = refresh_cookie_value(&first).unwrap();
    let first_body: Value = first.json().await.unwrap();

    let second = app.login("a@x.com", "pw123456").await;
    let second_refresh = refresh_cookie_value(&second).unwrap();

    let response = app
        .logout(first_body["accessToken"].as_str(), Some(&first_refresh))
        .await;
    assert_eq!(204, response.status().as_u16());

    assert_eq!(200, app.refresh(Some(&second_refresh)).await.status().as_u16());
}

#[tokio::test]
async fn logout_requires_bearer_token() {
    let app = spawn_app().await;

    let response = app.logout(None, None).await;
    assert_eq!(401, response.status().as_u16());
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.code, "MISSING_TOKEN");

    let response = app.logout(Some("not.a.jwt"), None).await;
    assert_eq!(401, response.status().as_u16());
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.code, "TOKEN_INVALID");
}

#[tokio::test]
async fn logout_rejects_expired_access_token_with_distinct_code() {
    let app = spawn_app().await;
    let mut claims = Claims::new(Uuid::new_v4(), TokenKind::Access, 0);
    claims.exp -= 60;
    let expired = app.tokens.sign(&claims, TokenKind::Access).unwrap();

    let response = app.logout(Some(&expired), None).await;

    assert_eq!(401, response.status().as_u16());
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.code, "TOKEN_EXPIRED");
}

#[tokio::test]
async fn logout_rejects_refresh_token_used_as_bearer() {
    let app = spawn_app().await;
    let registered = app.register("a@x.com", "pw123456").await;
    let refresh_token = refresh_cookie_value(&registered).unwrap();

    let response = app.logout(Some(&refresh_token), Some(&refresh_token)).await;

    assert_eq!(401, response.status().as_u16());
    assert!(app.refresh_tokens.exists(&refresh_token).await.unwrap());
}
