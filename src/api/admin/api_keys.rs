//! API key management admin endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::middleware::RequireOwner;
use crate::api::state::AppState;
use crate::api::types::{ApiError, ApiKeyResponse, Json};
use crate::domain::{ApiKey, StoreError};
use crate::infrastructure::api_key::generate_credential;

/// Partial key update; absent fields keep their current value
///
/// On create, a missing `key` gets a generated credential and a missing
/// `enabled` means enabled.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiKeyRequest {
    pub key: Option<String>,
    pub label: Option<String>,
    pub user_id: Option<String>,
    pub enabled: Option<bool>,
    pub total_limit: Option<u64>,
    pub concurrency_limit: Option<u32>,
    pub compatibility_mode: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListApiKeysResponse {
    pub api_keys: Vec<ApiKeyResponse>,
    pub total: usize,
}

/// GET /admin/api-keys
pub async fn list_api_keys(
    State(state): State<AppState>,
    _owner: RequireOwner,
) -> Json<ListApiKeysResponse> {
    let api_keys: Vec<ApiKeyResponse> = state
        .store
        .list_api_keys()
        .iter()
        .map(ApiKeyResponse::from)
        .collect();
    let total = api_keys.len();

    Json(ListApiKeysResponse { api_keys, total })
}

/// GET /admin/api-keys/{key_id}
pub async fn get_api_key(
    State(state): State<AppState>,
    _owner: RequireOwner,
    Path(key_id): Path<String>,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    let key = find_key(&state, &key_id)?;
    Ok(Json(ApiKeyResponse::from(&key)))
}

/// POST /admin/api-keys
pub async fn create_api_key(
    State(state): State<AppState>,
    _owner: RequireOwner,
    Json(mut request): Json<ApiKeyRequest>,
) -> Result<(StatusCode, Json<ApiKeyResponse>), ApiError> {
    let credential = request
        .key
        .take()
        .filter(|k| !k.trim().is_empty())
        .unwrap_or_else(generate_credential);

    debug!(label = ?request.label, "Admin creating API key");

    check_owner_exists(&state, &request)?;

    let mut key = ApiKey::new(credential, "");
    apply_request(&mut key, request);

    let key = state.store.upsert_api_key(key)?;
    state.persist().await?;

    Ok((StatusCode::CREATED, Json(ApiKeyResponse::from(&key))))
}

/// PUT /admin/api-keys/{key_id}
pub async fn update_api_key(
    State(state): State<AppState>,
    _owner: RequireOwner,
    Path(key_id): Path<String>,
    Json(request): Json<ApiKeyRequest>,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    debug!(key_id = %key_id, "Admin updating API key");

    check_owner_exists(&state, &request)?;

    let key = state
        .store
        .update_api_key(&key_id, |key| apply_request(key, request))
        .map_err(|e| key_error(e, &key_id))?;
    state.persist().await?;

    Ok(Json(ApiKeyResponse::from(&key)))
}

/// DELETE /admin/api-keys/{key_id}
pub async fn delete_api_key(
    State(state): State<AppState>,
    _owner: RequireOwner,
    Path(key_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .store
        .delete_api_key(&key_id)
        .map_err(|e| key_error(e, &key_id))?;
    state.persist().await?;

    Ok(StatusCode::NO_CONTENT)
}

pub(super) fn find_key(state: &AppState, key_id: &str) -> Result<ApiKey, ApiError> {
    state
        .store
        .find_api_key_by_id(key_id)
        .ok_or_else(|| ApiError::not_found(format!("API key '{}' not found", key_id)))
}

/// A missing key is a 404 on admin routes, not an authentication failure
pub(super) fn key_error(err: StoreError, key_id: &str) -> ApiError {
    match err {
        StoreError::KeyNotFound => ApiError::not_found(format!("API key '{}' not found", key_id)),
        other => other.into(),
    }
}

fn check_owner_exists(state: &AppState, request: &ApiKeyRequest) -> Result<(), ApiError> {
    let user_id = request.user_id.as_deref().map(str::trim).unwrap_or_default();

    if !user_id.is_empty() && state.store.find_user_by_id(user_id).is_none() {
        return Err(StoreError::UserNotFound.into());
    }
    Ok(())
}

/// Copy the supplied fields onto `key`; usage is never touched here
fn apply_request(key: &mut ApiKey, request: ApiKeyRequest) {
    if let Some(credential) = request.key {
        key.set_key(credential.trim());
    }
    if let Some(label) = request.label {
        key.set_label(label);
    }
    if let Some(user_id) = request.user_id {
        key.set_user_id(user_id.trim());
    }
    if let Some(enabled) = request.enabled {
        key.set_enabled(enabled);
    }
    if let Some(limit) = request.total_limit {
        key.set_total_limit(limit);
    }
    if let Some(limit) = request.concurrency_limit {
        key.set_concurrency_limit(limit);
    }
    if let Some(compatibility) = request.compatibility_mode {
        key.set_compatibility_mode(compatibility);
    }
}
