//! Self-service endpoints for key holders and users

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::middleware::RequireApiKey;
use super::state::AppState;
use super::types::{ApiError, ApiKeyResponse, Json, UsageResponse, UserResponse};

/// Create the portal router
pub fn create_portal_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/usage", get(usage))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub api_keys: Vec<ApiKeyResponse>,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub key: ApiKeyResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,
}

#[derive(Debug, Serialize)]
pub struct PortalUsageResponse {
    pub usage: Vec<UsageResponse>,
}

/// POST /portal/login
///
/// Verifies a username and password and returns the user with their keys.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let LoginRequest { username, password } = request;

    let user = state
        .blocking(move |store| store.authenticate_user(&username, &password))
        .await?;

    debug!(user_id = %user.id(), "Portal login");

    let api_keys = state
        .store
        .list_api_keys_by_user(user.id())
        .iter()
        .map(ApiKeyResponse::from)
        .collect();

    Ok(Json(LoginResponse {
        user: UserResponse::from(&user),
        api_keys,
    }))
}

/// GET /portal/me
pub async fn me(State(state): State<AppState>, RequireApiKey(grant): RequireApiKey) -> Json<MeResponse> {
    let user = state
        .store
        .find_user_by_id(grant.key.user_id())
        .map(|u| UserResponse::from(&u));

    Json(MeResponse {
        key: ApiKeyResponse::from(&grant.key),
        user,
    })
}

/// GET /portal/usage
///
/// Every key of the caller's user, or the calling key alone when it has no owner.
pub async fn usage(
    State(state): State<AppState>,
    RequireApiKey(grant): RequireApiKey,
) -> Json<PortalUsageResponse> {
    let keys = match grant.key.user_id() {
        "" => vec![grant.key.clone()],
        user_id => state.store.list_api_keys_by_user(user_id),
    };

    let usage = keys
        .iter()
        .map(|key| UsageResponse::new(key, state.store.in_flight(key.id())))
        .collect();

    Json(PortalUsageResponse { usage })
}
