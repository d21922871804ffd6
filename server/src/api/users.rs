//! User management endpoints. Admin only.
//!
//! Password hashes never leave the server; users are returned as
//! [`UserView`]s. The reserved admin user cannot be removed.

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::{ApiError, AppState, require_admin, success};
use crate::auth::{ADMIN_USERNAME, AuthContext};
use crate::models::{ModelError, User, UserData};

/// Public view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

/// `GET /api/users`
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Response, ApiError> {
    require_admin(&auth)?;

    let users: Vec<UserView> = state
        .users
        .get_all()
        .await?
        .into_iter()
        .map(UserView::from)
        .collect();
    Ok(success(users).into_response())
}

/// `PUT /api/user`
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<UserData>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_admin(&auth)?;
    let Json(data) = payload?;

    let user = state.users.insert(&data).await?;
    Ok(success(UserView::from(user)).into_response())
}

/// `DELETE /api/user/{id}`
pub async fn remove(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    require_admin(&auth)?;

    let Some(user) = state.users.get(&id).await? else {
        return Err(ModelError::NotFound { entity: "user", id }.into());
    };
    if user.username == ADMIN_USERNAME {
        return Err(ModelError::Conflict {
            entity: "user",
            message: format!("'{ADMIN_USERNAME}' cannot be removed"),
        }
        .into());
    }

    if !state.users.remove(&id).await? {
        return Err(ModelError::NotFound { entity: "user", id }.into());
    }
    tracing::info!(user_id = %id, "removed user");
    Ok(success(id).into_response())
}
