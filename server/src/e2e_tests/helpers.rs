//! Common helpers for end-to-end tests.

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::api::{self, AppState};
use crate::auth::{ADMIN_USERNAME, JwtConfig, ensure_admin_user};
use crate::models::{PageData, UserData};
use crate::services::PageService;
use crate::testing::new_test_driver;

pub const ADMIN_PASSWORD: &str = "admin-password";
pub const EDITOR_USERNAME: &str = "editor";
pub const EDITOR_PASSWORD: &str = "editor-password";

/// Largest response body the tests read.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// A parsed HTTP response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// The `result` of a successful envelope.
    pub fn result(&self) -> &Value {
        assert_eq!(self.body["success"], json!(true), "body: {}", self.body);
        &self.body["result"]
    }

    /// The `error` of a failed envelope.
    pub fn error(&self) -> &str {
        assert_eq!(self.body["success"], json!(false), "body: {}", self.body);
        self.body["error"].as_str().expect("error message")
    }
}

/// A fresh application backed by a temporary embedded store, with an admin
/// user and a non-admin editor.
///
/// The store directory is removed when the app is dropped.
pub struct TestApp {
    pub state: AppState,
    router: Router,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_menu_depth(crate::menu::DEFAULT_MAX_DEPTH).await
    }

    pub async fn with_menu_depth(menu_max_depth: usize) -> Self {
        let (dir, driver) = new_test_driver();
        let jwt = JwtConfig::new_hs256(b"e2e-test-secret".to_vec()).expect("valid secret");

        let mut state = AppState::new(driver, jwt, menu_max_depth);
        state.users = state.users.with_hash_cost(4);

        ensure_admin_user(&state.users, ADMIN_PASSWORD)
            .await
            .expect("seed admin");
        state
            .users
            .insert(&UserData {
                username: Some(EDITOR_USERNAME.to_string()),
                password: Some(EDITOR_PASSWORD.to_string()),
            })
            .await
            .expect("seed editor");

        let router = api::router(state.clone());
        Self {
            state,
            router,
            _dir: dir,
        }
    }

    pub const fn service(&self) -> &PageService {
        &self.state.pages
    }

    /// Send one request through the router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), MAX_BODY_BYTES)
            .await
            .expect("read body");
        let body = serde_json::from_slice(&bytes).expect("JSON body");

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Log in and return the `Cookie` header value for the session.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/auth",
                Some(json!({ "username": username, "password": password })),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.body);

        let set_cookie = response
            .headers
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .expect("Set-Cookie header");
        set_cookie
            .split(';')
            .next()
            .expect("cookie pair")
            .to_string()
    }

    pub async fn login_admin(&self) -> String {
        self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }

    pub async fn login_editor(&self) -> String {
        self.login(EDITOR_USERNAME, EDITOR_PASSWORD).await
    }
}

/// Page payload with a title and a simple body.
pub fn page_data(title: &str, parent: Option<&str>) -> PageData {
    PageData {
        title: Some(title.to_string()),
        body: Some(json!({ "blocks": [{ "type": "paragraph", "text": title }] })),
        parent: parent.map(str::to_string),
        uri: None,
    }
}

/// Ids of a serialized menu level, in order.
pub fn menu_ids(level: &Value) -> Vec<String> {
    level
        .as_array()
        .expect("menu level is an array")
        .iter()
        .map(|node| node["_id"].as_str().expect("node id").to_string())
        .collect()
}
