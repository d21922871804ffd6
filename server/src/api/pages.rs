//! Page, menu and alias endpoints.

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};

use super::{ApiError, AppState, require_user, success};
use crate::auth::AuthContext;
use crate::models::{ModelError, PageData};
use crate::services::PageUpdate;

/// `GET /api/pages`
pub async fn list(State(state): State<AppState>) -> Result<Response, ApiError> {
    let pages = state.pages.pages().get_all().await?;
    Ok(success(pages).into_response())
}

/// `GET /api/page/{id}`
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let Some(page) = state.pages.pages().get(&id).await? else {
        return Err(ModelError::NotFound { entity: "page", id }.into());
    };
    Ok(success(page).into_response())
}

/// `PUT /api/page`
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<PageData>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_user(&auth)?;
    let Json(data) = payload?;

    let page = state.pages.create(data).await?;
    Ok(success(page).into_response())
}

/// `POST /api/page/{id}`
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    payload: Result<Json<PageUpdate>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_user(&auth)?;
    let Json(update) = payload?;

    let page = state.pages.update(&id, update).await?;
    Ok(success(page).into_response())
}

/// `DELETE /api/page/{id}`
///
/// Responds with the ids of every removed page.
pub async fn remove(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    require_user(&auth)?;

    let removed = state.pages.remove(&id).await?;
    Ok(success(removed).into_response())
}

/// `GET /api/menu`
pub async fn menu(State(state): State<AppState>) -> Result<Response, ApiError> {
    let source = state.pages.load_menu().await?;
    Ok(success(source.tree(state.menu_max_depth)).into_response())
}

/// `GET /api/alias/{slug}`
pub async fn resolve_alias(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    let Some(resolved) = state.pages.resolve_alias(&slug).await? else {
        return Err(ModelError::NotFound {
            entity: "alias",
            id: slug,
        }
        .into());
    };
    Ok(success(resolved).into_response())
}
