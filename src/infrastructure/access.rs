//! Access check in front of admission control
//!
//! Extracts the credential, resolves it to a key, and applies the trust
//! policy for the carrier it arrived on.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::domain::{extract_credential, is_source_trusted, ApiKey, CredentialCarrier, CredentialSource};
use crate::infrastructure::store::RecordStore;

/// Reasons a request is refused at the access check
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    #[error("no credentials supplied")]
    NoCredentials,

    #[error("invalid credential")]
    InvalidCredential,
}

/// A request that passed the access check
#[derive(Debug, Clone)]
pub struct AccessGrant {
    pub key: ApiKey,
    pub source: CredentialSource,
    /// `user_id` and `label` of the key when set
    pub metadata: BTreeMap<String, String>,
}

impl AccessGrant {
    /// The credential string, used as the admission principal
    pub fn principal(&self) -> &str {
        self.key.key()
    }
}

/// Access checker bound to a record store
#[derive(Debug, Clone)]
pub struct AccessProvider {
    store: Arc<RecordStore>,
}

impl AccessProvider {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    /// Authenticate a request by its credential carriers
    ///
    /// Unknown keys, disabled keys and untrusted carriers are reported the
    /// same way so callers cannot probe which one applied.
    pub fn authenticate<C>(&self, carrier: &C) -> Result<AccessGrant, AccessError>
    where
        C: CredentialCarrier + ?Sized,
    {
        let credential = extract_credential(carrier).ok_or(AccessError::NoCredentials)?;

        let key = self
            .store
            .find_api_key(&credential.value)
            .ok_or(AccessError::InvalidCredential)?;

        if !key.is_enabled() {
            debug!(key_id = %key.id(), "Access denied: key disabled");
            return Err(AccessError::InvalidCredential);
        }

        if !is_source_trusted(&key, credential.source) {
            debug!(
                key_id = %key.id(),
                source = %credential.source,
                "Access denied: carrier requires compatibility mode"
            );
            return Err(AccessError::InvalidCredential);
        }

        let mut metadata = BTreeMap::new();
        if !key.user_id().is_empty() {
            metadata.insert("user_id".to_string(), key.user_id().to_string());
        }
        if !key.label().is_empty() {
            metadata.insert("label".to_string(), key.label().to_string());
        }

        Ok(AccessGrant {
            key,
            source: credential.source,
            metadata,
        })
    }
}
