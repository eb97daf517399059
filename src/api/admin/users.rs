//! User management admin endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::middleware::RequireOwner;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, UserResponse};
use crate::domain::{validate_password, StoreError, User, UserRole};

/// Partial user update; absent fields keep their current value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub disabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListUsersResponse {
    pub users: Vec<UserResponse>,
    pub total: usize,
}

/// GET /admin/users
pub async fn list_users(
    State(state): State<AppState>,
    _owner: RequireOwner,
) -> Json<ListUsersResponse> {
    let users: Vec<UserResponse> = state.store.list_users().iter().map(UserResponse::from).collect();
    let total = users.len();

    Json(ListUsersResponse { users, total })
}

/// GET /admin/users/{user_id}
pub async fn get_user(
    State(state): State<AppState>,
    _owner: RequireOwner,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .store
        .find_user_by_id(&user_id)
        .ok_or(StoreError::UserNotFound)?;

    Ok(Json(UserResponse::from(&user)))
}

/// POST /admin/users
pub async fn create_user(
    State(state): State<AppState>,
    _owner: RequireOwner,
    Json(request): Json<UserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let username = request
        .username
        .clone()
        .ok_or_else(|| ApiError::bad_request("username is required").with_param("username"))?;

    if request.password.is_none() {
        return Err(ApiError::bad_request("password is required").with_param("password"));
    }

    debug!(username = %username, "Admin creating user");

    let role = parse_role(request.role.as_deref())?;
    let hash = hash_new_password(&state, request.password).await?;

    let mut user = User::new(username, hash.unwrap_or_default(), role.unwrap_or(UserRole::User));
    if let Some(disabled) = request.disabled {
        user.set_disabled(disabled);
    }

    let user = state.store.upsert_user(user)?;
    state.persist().await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// PUT /admin/users/{user_id}
pub async fn update_user(
    State(state): State<AppState>,
    _owner: RequireOwner,
    Path(user_id): Path<String>,
    Json(request): Json<UserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    debug!(user_id = %user_id, "Admin updating user");

    if state.store.find_user_by_id(&user_id).is_none() {
        return Err(StoreError::UserNotFound.into());
    }

    let role = parse_role(request.role.as_deref())?;
    let hash = hash_new_password(&state, request.password).await?;

    let user = state.store.update_user(&user_id, |user| {
        if let Some(username) = request.username {
            user.set_username(username);
        }
        if let Some(role) = role {
            user.set_role(role);
        }
        if let Some(disabled) = request.disabled {
            user.set_disabled(disabled);
        }
        if let Some(hash) = hash {
            user.set_password_hash(hash);
        }
    })?;
    state.persist().await?;

    Ok(Json(UserResponse::from(&user)))
}

/// DELETE /admin/users/{user_id}
///
/// Keys owned by the user are left in place.
pub async fn delete_user(
    State(state): State<AppState>,
    _owner: RequireOwner,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_user(&user_id)?;
    state.persist().await?;

    Ok(StatusCode::NO_CONTENT)
}

fn parse_role(role: Option<&str>) -> Result<Option<UserRole>, ApiError> {
    role.map(|r| r.parse::<UserRole>().map_err(StoreError::from))
        .transpose()
        .map_err(ApiError::from)
}

/// Hash a supplied password on the blocking pool, before any store lock is taken
async fn hash_new_password(state: &AppState, password: Option<String>) -> Result<Option<String>, ApiError> {
    let Some(password) = password else {
        return Ok(None);
    };
    validate_password(&password).map_err(StoreError::from)?;

    let hash = state.blocking(move |store| store.hash_password(&password)).await?;
    Ok(Some(hash))
}
