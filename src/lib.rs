//! Keygate
//!
//! Per-key admission control and usage accounting for API gateways:
//! - File-backed store of users and API keys with atomic saves
//! - Lifetime quotas and concurrency ceilings enforced per key
//! - Credential extraction from headers and query strings with a trust policy
//! - Owner administration and a self-service portal over HTTP

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use tracing::info;

use api::state::AppState;
use infrastructure::store::RecordStore;
use infrastructure::user::Argon2Hasher;

/// Open the record store at the configured data path and load it
pub fn create_store(config: &AppConfig) -> anyhow::Result<Arc<RecordStore>> {
    let path = config.store.resolve_data_path();
    info!(path = %path.display(), "Opening record store");

    let hasher = Argon2Hasher::from_config(&config.password)?;
    let store = RecordStore::new(Some(path)).with_hasher(Arc::new(hasher));
    store.load()?;

    Ok(Arc::new(store))
}

/// Create application state from configuration
pub fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let store = create_store(config)?;
    Ok(AppState::new(store, config.store.save_on_use))
}
