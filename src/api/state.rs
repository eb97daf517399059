//! Shared application state

use std::sync::Arc;

use crate::domain::StoreError;
use crate::infrastructure::access::AccessProvider;
use crate::infrastructure::store::RecordStore;

/// State handed to every handler and middleware
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<RecordStore>,
    pub access: AccessProvider,
    /// Persist after each request that consumed quota
    pub save_on_use: bool,
}

impl AppState {
    pub fn new(store: Arc<RecordStore>, save_on_use: bool) -> Self {
        Self {
            access: AccessProvider::new(Arc::clone(&store)),
            store,
            save_on_use,
        }
    }

    /// Run a store operation on the blocking pool
    ///
    /// File I/O and password hashing go through here so they never stall the
    /// async workers.
    pub async fn blocking<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&RecordStore) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| StoreError::io(format!("blocking task failed: {e}")))?
    }

    /// Persist the store, skipping silently when it has no backing file
    pub async fn persist(&self) -> Result<(), StoreError> {
        if self.store.path().is_none() {
            return Ok(());
        }
        self.blocking(|store| store.save()).await
    }
}
