//! Admission control around gated routes
//!
//! Every admitted request reserves a slot through `begin_request` and gives
//! it back exactly once through `end_request_by_id`, including when the
//! handler future is dropped before it completes.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::auth::HttpCarrier;
use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::infrastructure::store::RecordStore;

/// Middleware admitting requests against the caller's quota and concurrency ceiling
pub async fn admission_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let grant = {
        let carrier = HttpCarrier::new(request.headers(), request.uri());
        match state.access.authenticate(&carrier) {
            Ok(grant) => grant,
            Err(err) => return ApiError::from(err).into_response(),
        }
    };

    let admitted = match state.store.begin_request(grant.principal()) {
        Ok(key) => key,
        Err(err) => {
            if err.is_limit() {
                warn!(key_id = %grant.key.id(), reason = %err, "Admission rejected");
            }
            return ApiError::from(err).into_response();
        }
    };

    let guard = AdmissionGuard::new(Arc::clone(&state.store), admitted.id());
    request.extensions_mut().insert(grant);

    let response = next.run(request).await;
    let counted = response.status().as_u16() < 400;

    if guard.complete(counted) && counted && state.save_on_use {
        if let Err(err) = state.persist().await {
            warn!(error = %err, "Failed to persist usage");
        }
    }

    response
}

/// Releases an admitted request's slot exactly once
///
/// Dropping the guard without calling [`AdmissionGuard::complete`] releases
/// the slot without counting usage. The slot is tracked by key id, so an
/// admin rotating the credential mid-request does not strand it.
struct AdmissionGuard {
    store: Arc<RecordStore>,
    key_id: String,
    done: bool,
}

impl AdmissionGuard {
    fn new(store: Arc<RecordStore>, key_id: impl Into<String>) -> Self {
        Self {
            store,
            key_id: key_id.into(),
            done: false,
        }
    }

    /// Returns whether the store recorded the completion
    fn complete(mut self, count_as_used: bool) -> bool {
        self.done = true;
        self.finish(count_as_used)
    }

    fn finish(&self, count_as_used: bool) -> bool {
        match self.store.end_request_by_id(&self.key_id, count_as_used) {
            Ok(key) => {
                debug!(key_id = %key.id(), counted = count_as_used, "Admission released");
                true
            }
            // Key deleted while the request ran
            Err(err) => {
                debug!(error = %err, "Admission release found no key");
                false
            }
        }
    }
}

impl Drop for AdmissionGuard {
    fn drop(&mut self) {
        if !self.done {
            self.finish(false);
        }
    }
}
