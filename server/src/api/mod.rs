//! JSON HTTP API.
//!
//! Every response, including errors, uses the same envelope:
//!
//! ```json
//! { "success": true, "result": ... }
//! { "success": false, "error": "page 'abc' not found" }
//! ```
//!
//! Reads are public. Page edits need a signed-in user; user management
//! needs the admin. The session middleware runs on every route and places
//! an [`AuthContext`] in the request extensions.

mod error;
mod pages;
mod session;
mod users;

use std::sync::Arc;

use axum::{
    Json, Router, middleware,
    routing::{delete, get, post, put},
};
use serde::Serialize;

pub use error::ApiError;
pub use session::resolve_session;

use crate::auth::{AuthContext, JwtConfig};
use crate::database::Driver;
use crate::models::UserRepository;
use crate::services::PageService;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pages: PageService,
    pub users: UserRepository,
    pub jwt: JwtConfig,
    pub menu_max_depth: usize,
}

impl AppState {
    #[must_use]
    #[allow(clippy::disallowed_methods)] // Arc::clone is safe and expected
    pub fn new(driver: Arc<dyn Driver>, jwt: JwtConfig, menu_max_depth: usize) -> Self {
        Self {
            pages: PageService::new(Arc::clone(&driver)),
            users: UserRepository::new(driver),
            jwt,
            menu_max_depth,
        }
    }
}

/// Successful response body.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub result: T,
}

/// Wrap `result` in a successful envelope.
#[must_use]
pub fn success<T: Serialize>(result: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        result,
    })
}

/// Build the application router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth", post(session::login))
        .route("/api/pages", get(pages::list))
        .route("/api/page", put(pages::create))
        .route(
            "/api/page/{id}",
            get(pages::get).post(pages::update).delete(pages::remove),
        )
        .route("/api/menu", get(pages::menu))
        .route("/api/alias/{slug}", get(pages::resolve_alias))
        .route("/api/users", get(users::list))
        .route("/api/user", put(users::create))
        .route("/api/user/{id}", delete(users::remove))
        .fallback(error::route_not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::resolve_session,
        ))
        .with_state(state)
}

/// Fail with 401 unless someone is signed in.
fn require_user(auth: &AuthContext) -> Result<(), ApiError> {
    if auth.authorized {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

/// Fail with 401 for anonymous callers and 403 for anyone but the admin.
fn require_admin(auth: &AuthContext) -> Result<(), ApiError> {
    require_user(auth)?;
    if auth.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}
