//! Login and the session middleware.

use axum::{
    Json,
    extract::{Request, State, rejection::JsonRejection},
    http::header::{COOKIE, SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState, success};
use crate::auth::{AuthContext, issue_token, session_cookie};

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResult {
    pub username: String,
    pub token: String,
}

/// `POST /auth`
///
/// Checks the credentials and, on success, sets the session cookie. The
/// token is also returned in the body for clients without a cookie jar.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(credentials) = payload?;

    let Some(user) = state
        .users
        .authenticate(&credentials.username, &credentials.password)
        .await?
    else {
        tracing::warn!(username = %credentials.username, "failed login");
        return Err(ApiError::InvalidCredentials);
    };

    let token = issue_token(&user.username, &state.jwt)?;
    let cookie = session_cookie(&token, &state.jwt);
    tracing::info!(username = %user.username, "logged in");

    Ok((
        [(SET_COOKIE, cookie)],
        success(LoginResult {
            username: user.username,
            token,
        }),
    )
        .into_response())
}

/// Resolve the session cookie into an [`AuthContext`] request extension.
///
/// Never rejects a request; handlers check the context themselves.
pub async fn resolve_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(COOKIE)
        .and_then(|value| value.to_str().ok());
    let context = AuthContext::from_cookie_header(header, &state.jwt);

    request.extensions_mut().insert(context);
    next.run(request).await
}
