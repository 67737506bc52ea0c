//! Common test utilities for integration tests.
//!
//! Every test builds its own app over a fresh in-memory store, so tests run
//! without a database and never share state.

// Helpers are shared across several test binaries; not every binary uses all of them.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use domain::store::{ClubStore, MemoryStore};
use fake::faker::name::en::Name;
use fake::Fake;
use podcast_club_api::{
    app::create_app,
    config::{
        AuthConfig, Config, DatabaseConfig, EmailConfig, LoggingConfig, SecurityConfig,
        ServerConfig,
    },
};
use serde_json::{json, Value};
use tower::ServiceExt;

pub const PASSWORD: &str = "correct horse battery";
pub const RECOVERY_CODE: &str = "owner-recovery-code-123";

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            environment: "test".to_string(),
        },
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 10,
            idle_timeout_secs: 600,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            cors_origins: vec![],
            rate_limit_per_minute: 0, // Disable rate limiting for tests
        },
        auth: AuthConfig {
            session_secret: "integration-test-secret".to_string(),
            session_days: 7,
            owner_recovery_code: Some(RECOVERY_CODE.to_string()),
            secure_cookies: Some(false),
        },
        email: EmailConfig::default(),
    }
}

/// A test app with its own empty store.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<dyn ClubStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let store: Arc<dyn ClubStore> = Arc::new(MemoryStore::new());
        let router = create_app(config, store.clone(), None).expect("test app");
        Self { router, store }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Sends a request and returns status plus parsed body.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.send(json_request(method, uri, cookie, body)).await;
        let status = response.status();
        (status, parse_response_body(response).await)
    }
}

/// Helper to create a JSON request, optionally carrying a session cookie.
pub fn json_request(
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Helper to parse JSON response body.
pub async fn parse_response_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(Value::Null)
}

/// `name=value` pair of the response's Set-Cookie header.
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub fn unique_email() -> String {
    format!("member_{}@example.com", uuid::Uuid::new_v4().simple())
}

pub fn fake_name() -> String {
    Name().fake()
}

pub fn registration(name: &str, email: &str, invite_code: Option<&str>) -> Value {
    json!({
        "name": name,
        "email": email,
        "password": PASSWORD,
        "inviteCode": invite_code,
        "addressLine1": "1 Main St",
        "city": "Springfield",
        "state": "IL",
        "postalCode": "62701"
    })
}

/// A signed-in member.
pub struct TestMember {
    pub id: String,
    pub name: String,
    pub email: String,
    pub cookie: String,
}

async fn register(app: &TestApp, invite_code: Option<&str>) -> TestMember {
    let name = fake_name();
    let email = unique_email();
    let response = app
        .send(json_request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(registration(&name, &email, invite_code)),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = session_cookie(&response).expect("session cookie");
    let body = parse_response_body(response).await;
    TestMember {
        id: body["id"].as_str().unwrap().to_string(),
        name,
        email,
        cookie,
    }
}

/// Registers the first member, who becomes the admin.
pub async fn register_admin(app: &TestApp) -> TestMember {
    register(app, None).await
}

/// Registers a regular member with a fresh join code from `admin`.
pub async fn register_member(app: &TestApp, admin: &TestMember) -> TestMember {
    let (status, body) = app
        .call(Method::POST, "/api/join-codes", Some(&admin.cookie), None)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let code = body["code"].as_str().unwrap().to_string();
    register(app, Some(&code)).await
}

/// Submits a podcast as `member` and returns its id.
pub async fn submit_podcast(app: &TestApp, member: &TestMember, title: &str) -> String {
    let (status, body) = app
        .call(
            Method::POST,
            "/api/podcasts",
            Some(&member.cookie),
            Some(json!({
                "title": title,
                "host": "Some Host",
                "episodeCount": 3,
                "episodeNames": "One, Two, Three",
                "totalTimeMinutes": 95,
                "link": format!("https://example.com/{}", uuid::Uuid::new_v4().simple())
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

/// Schedules a meeting as `admin` hosted by `host_id`; returns its id.
pub async fn create_meeting(
    app: &TestApp,
    admin: &TestMember,
    host_id: &str,
    date: &str,
    podcast: Option<&str>,
) -> String {
    let (status, body) = app
        .call(
            Method::POST,
            "/api/meetings",
            Some(&admin.cookie),
            Some(json!({
                "date": date,
                "host": host_id,
                "podcast": podcast
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}
