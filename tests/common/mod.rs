#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use authgate::auth::{AuthService, TokenService};
use authgate::configuration::{Environment, JwtSettings};
use authgate::startup::run;
use authgate::store::{InMemoryCredentialStore, InMemoryRefreshTokenStore};
use serde_json::{json, Value};

pub struct TestApp {
    pub address: String,
    pub users: Arc<InMemoryCredentialStore>,
    pub refresh_tokens: Arc<InMemoryRefreshTokenStore>,
    pub tokens: TokenService,
    pub client: reqwest::Client,
}

pub fn jwt_settings() -> JwtSettings {
    JwtSettings {
        access_secret: "integration-access-secret-0123456789".to_string(),
        refresh_secret: "integration-refresh-secret-0123456789".to_string(),
        access_token_expiry: Duration::from_secs(900),
        refresh_token_expiry: Duration::from_secs(604_800),
    }
}

pub async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}/api/v1", port);

    let users = Arc::new(InMemoryCredentialStore::new());
    let refresh_tokens = Arc::new(InMemoryRefreshTokenStore::new());
    let tokens = TokenService::new(&jwt_settings());
    let auth = AuthService::new(users.clone(), refresh_tokens.clone(), tokens.clone());

    let server = run(listener, auth, Environment::Test).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        users,
        refresh_tokens,
        tokens,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub fn root(&self) -> String {
        self.address.trim_end_matches("/api/v1").to_string()
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn register(&self, email: &str, password: &str) -> reqwest::Response {
        self.post_json(
            "/auth/register",
            &json!({ "email": email, "password": password }),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post_json("/auth/login", &json!({ "email": email, "password": password }))
            .await
    }

    pub async fn refresh(&self, refresh_token: Option<&str>) -> reqwest::Response {
        let mut request = self
            .client
            .post(&format!("{}/auth/refresh-token", self.address));
        if let Some(token) = refresh_token {
            request = request.header("Cookie", format!("refreshToken={}", token));
        }
        request.send().await.expect("Failed to execute request.")
    }

    pub async fn logout(
        &self,
        access_token: Option<&str>,
        refresh_token: Option<&str>,
    ) -> reqwest::Response {
        let mut request = self.client.post(&format!("{}/auth/logout", self.address));
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }
        if let Some(token) = refresh_token {
            request = request.header("Cookie", format!("refreshToken={}", token));
        }
        request.send().await.expect("Failed to execute request.")
    }
}

/// Raw `Set-Cookie` header for the refresh token, if the response set one
pub fn refresh_cookie_header(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("refreshToken="))
        .map(str::to_string)
}

/// Value of the refresh token cookie, if the response set one
pub fn refresh_cookie_value(response: &reqwest::Response) -> Option<String> {
    refresh_cookie_header(response).map(|header| {
        header
            .trim_start_matches("refreshToken=")
            .split(';')
            .next()
            .unwrap_or_default()
            .to_string()
    })
}
