//! HTTP error mapping.
//!
//! Each failure is reported in the error envelope with a status that
//! matches its cause:
//!
//! | Cause                         | Status |
//! |-------------------------------|--------|
//! | validation, bad id, bad body  | 400    |
//! | no session                    | 401    |
//! | not the admin                 | 403    |
//! | missing entity or route       | 404    |
//! | uniqueness conflict           | 409    |
//! | storage, hashing, signing     | 500    |

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::auth::JwtError;
use crate::models::ModelError;

/// Error returned by HTTP handlers.
#[derive(Debug)]
pub enum ApiError {
    /// A repository or service operation failed.
    Model(ModelError),
    /// The request needs a signed-in user.
    Unauthorized,
    /// The signed-in user may not do this.
    Forbidden,
    /// Login failed.
    InvalidCredentials,
    /// The request body could not be read.
    BadRequest(String),
    /// No route matches the request.
    RouteNotFound,
    /// A session token could not be issued.
    Token(JwtError),
}

impl ApiError {
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Model(ModelError::Validation { .. } | ModelError::InvalidId(_))
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Model(ModelError::NotFound { .. }) | Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::Model(ModelError::Conflict { .. }) => StatusCode::CONFLICT,
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Model(ModelError::Storage(_) | ModelError::Hashing(_)) | Self::Token(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Model(e) => write!(f, "{e}"),
            Self::Unauthorized => write!(f, "authentication required"),
            Self::Forbidden => write!(f, "admin access required"),
            Self::InvalidCredentials => write!(f, "invalid username or password"),
            Self::BadRequest(message) => write!(f, "invalid request: {message}"),
            Self::RouteNotFound => write!(f, "route not found"),
            Self::Token(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Model(e) => Some(e),
            Self::Token(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ModelError> for ApiError {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}

impl From<JwtError> for ApiError {
    fn from(e: JwtError) -> Self {
        Self::Token(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!("request failed: {self}");
            "internal server error".to_string()
        } else {
            tracing::debug!(status = status.as_u16(), "request rejected: {self}");
            self.to_string()
        };

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

pub async fn route_not_found() -> ApiError {
    ApiError::RouteNotFound
}
