//! Admission-gated endpoints

use std::collections::BTreeMap;

use axum::{middleware, routing::get, Router};
use serde::Serialize;

use super::middleware::{admission_middleware, RequireApiKey};
use super::state::AppState;
use super::types::Json;

/// Create v1 API router; every route runs behind admission control
pub fn create_v1_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/access", get(check_access).post(check_access))
        .route_layer(middleware::from_fn_with_state(state, admission_middleware))
}

#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub key_id: String,
    pub source: String,
    pub metadata: BTreeMap<String, String>,
    /// Usage before this request is counted
    pub used: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

/// GET|POST /v1/access
pub async fn check_access(RequireApiKey(grant): RequireApiKey) -> Json<AccessResponse> {
    let key = &grant.key;

    Json(AccessResponse {
        key_id: key.id().to_string(),
        source: grant.source.to_string(),
        used: key.used_count(),
        limit: key.has_total_limit().then(|| key.total_limit()),
        metadata: grant.metadata.clone(),
    })
}
