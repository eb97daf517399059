//! Record set snapshot, usage report and counter maintenance

use axum::extract::{Path, State};
use serde::Serialize;
use tracing::info;

use super::api_keys::{find_key, key_error};
use crate::api::middleware::RequireOwner;
use crate::api::state::AppState;
use crate::api::types::{ApiError, ApiKeyResponse, Json, UsageResponse, UserResponse};

#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub version: u32,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_path: Option<String>,
    pub users: Vec<UserResponse>,
    pub api_keys: Vec<ApiKeyResponse>,
}

#[derive(Debug, Serialize)]
pub struct UsageReport {
    pub usage: Vec<UsageResponse>,
}

#[derive(Debug, Serialize)]
pub struct ReleaseResponse {
    pub key_id: String,
    pub released: u32,
}

/// GET /admin/state
pub async fn get_state(State(state): State<AppState>, _owner: RequireOwner) -> Json<StateResponse> {
    let records = state.store.snapshot();

    Json(StateResponse {
        version: records.version,
        updated_at: records.updated_at.to_rfc3339(),
        data_path: state.store.path().map(|p| p.display().to_string()),
        users: records.users.iter().map(UserResponse::from).collect(),
        api_keys: records.api_keys.iter().map(ApiKeyResponse::from).collect(),
    })
}

/// GET /admin/usage
pub async fn get_usage(State(state): State<AppState>, _owner: RequireOwner) -> Json<UsageReport> {
    let usage = state
        .store
        .list_api_keys()
        .iter()
        .map(|key| UsageResponse::new(key, state.store.in_flight(key.id())))
        .collect();

    Json(UsageReport { usage })
}

/// POST /admin/api-keys/{key_id}/reset-usage
pub async fn reset_usage(
    State(state): State<AppState>,
    RequireOwner { user, .. }: RequireOwner,
    Path(key_id): Path<String>,
) -> Result<Json<UsageResponse>, ApiError> {
    let key = state
        .store
        .reset_usage(&key_id)
        .map_err(|e| key_error(e, &key_id))?;
    state.persist().await?;

    info!(key_id = %key_id, by = %user.id(), "Usage reset by owner");

    Ok(Json(UsageResponse::new(&key, state.store.in_flight(key.id()))))
}

/// POST /admin/api-keys/{key_id}/release
pub async fn release_in_flight(
    State(state): State<AppState>,
    RequireOwner { user, .. }: RequireOwner,
    Path(key_id): Path<String>,
) -> Result<Json<ReleaseResponse>, ApiError> {
    find_key(&state, &key_id)?;

    let released = state
        .store
        .release_in_flight(&key_id)
        .map_err(|e| key_error(e, &key_id))?;

    info!(key_id = %key_id, released, by = %user.id(), "In-flight released by owner");

    Ok(Json(ReleaseResponse { key_id, released }))
}
