//! Health check endpoints

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::api::types::Json;
use serde::Serialize;

use super::state::AppState;

/// Detailed health response with component status
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<HealthCheck>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Health check status
#[derive(Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Individual component health check
#[derive(Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Simple health check - returns 200 if the service is running
pub async fn health_check() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: None,
        latency_ms: None,
    };

    (StatusCode::OK, Json(response))
}

/// Readiness check reporting the record store
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let store_check = check_store(&state);
    let status = store_check.status;

    let response = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: Some(vec![store_check]),
        latency_ms: Some(start.elapsed().as_millis() as u64),
    };

    // Degraded still serves traffic
    (StatusCode::OK, Json(response))
}

/// Liveness check - simple check to verify the service is running
pub async fn live_check() -> impl IntoResponse {
    StatusCode::OK
}

/// A store without a backing file still serves but loses state on restart
///
/// The endpoint is unauthenticated, so the message never names the data path.
fn check_store(state: &AppState) -> HealthCheck {
    let start = Instant::now();
    let (users, api_keys) = state.store.counts();
    let summary = format!("{users} users, {api_keys} api keys");

    let (status, message) = match state.store.path() {
        Some(_) => (HealthStatus::Healthy, format!("{summary} (persisted)")),
        None => (
            HealthStatus::Degraded,
            format!("{summary} (no data path, not persisted)"),
        ),
    };

    HealthCheck {
        name: "record_store".to_string(),
        status,
        message: Some(message),
        latency_ms: Some(start.elapsed().as_millis() as u64),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::domain::ApiKey;
    use crate::infrastructure::store::RecordStore;

    #[test]
    fn test_health_status_serialization() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Healthy).unwrap(),
            "\"healthy\""
        );
        assert_eq!(
            serde_json::to_string(&HealthStatus::Degraded).unwrap(),
            "\"degraded\""
        );
    }

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            version: "1.0.0".to_string(),
            checks: None,
            latency_ms: None,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(json.contains("\"version\":\"1.0.0\""));
        assert!(!json.contains("checks"));
    }

    #[test]
    fn test_health_response_with_checks() {
        let response = HealthResponse {
            status: HealthStatus::Degraded,
            version: "1.0.0".to_string(),
            checks: Some(vec![
                HealthCheck {
                    name: "record_store".to_string(),
                    status: HealthStatus::Healthy,
                    message: None,
                    latency_ms: Some(5),
                },
                HealthCheck {
                    name: "disk".to_string(),
                    status: HealthStatus::Degraded,
                    message: Some("Read-only file system".to_string()),
                    latency_ms: Some(100),
                },
            ]),
            latency_ms: Some(105),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"degraded\""));
        assert!(json.contains("\"record_store\""));
        assert!(json.contains("\"disk\""));
        assert!(json.contains("\"Read-only file system\""));
    }

    #[test]
    fn test_store_check_hides_data_path() {
        let store = RecordStore::new(Some(PathBuf::from("/srv/private/keygate-data.json")));
        store.upsert_api_key(ApiKey::new("kg-one", "")).unwrap();
        let state = AppState::new(Arc::new(store), false);

        let check = check_store(&state);
        let message = check.message.unwrap();

        assert!(check.status == HealthStatus::Healthy);
        assert_eq!(message, "0 users, 1 api keys (persisted)");
        assert!(!message.contains("/srv/private"));
    }

    #[test]
    fn test_store_check_without_path_is_degraded() {
        let state = AppState::new(Arc::new(RecordStore::in_memory()), false);

        let check = check_store(&state);
        assert!(check.status == HealthStatus::Degraded);
    }
}
