//! Admission control: quota and concurrency gating per API key

use tracing::{debug, info};

use super::record_store::{RecordStore, StoreState};
use crate::domain::{ApiKey, StoreError};

impl RecordStore {
    /// Admit a request presenting `credential`
    ///
    /// Checks, in order: the key exists, is enabled, has quota left, and has
    /// a free concurrency slot. On success a slot is reserved (when the key
    /// has a ceiling) and must be released by exactly one
    /// [`RecordStore::end_request`]. Checks and reservation happen under one
    /// write-lock acquisition, so the ceiling holds exactly under races.
    pub fn begin_request(&self, credential: &str) -> Result<ApiKey, StoreError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(StoreError::KeyNotFound);
        }

        let mut state = self.state.write();
        let index = state
            .key_index_by_credential(credential)
            .ok_or(StoreError::KeyNotFound)?;
        let key = state.records.api_keys[index].clone();

        if !key.is_enabled() {
            debug!(key_id = %key.id(), "Admission rejected: key disabled");
            return Err(StoreError::KeyDisabled);
        }

        if key.is_quota_exhausted() {
            debug!(
                key_id = %key.id(),
                used = key.used_count(),
                limit = key.total_limit(),
                "Admission rejected: quota exceeded"
            );
            return Err(StoreError::QuotaExceeded);
        }

        if key.has_concurrency_limit() {
            let current = state.in_flight.entry(key.id().to_string()).or_insert(0);

            if *current >= key.concurrency_limit() {
                debug!(
                    key_id = %key.id(),
                    in_flight = *current,
                    limit = key.concurrency_limit(),
                    "Admission rejected: concurrency exceeded"
                );
                return Err(StoreError::ConcurrencyExceeded);
            }

            *current += 1;
        }

        debug!(key_id = %key.id(), "Request admitted");
        Ok(key)
    }

    /// Complete a request admitted by [`RecordStore::begin_request`]
    ///
    /// Releases the concurrency slot (never below zero) and, when
    /// `count_as_used` is set, adds one to the key's lifetime usage. Returns
    /// the key as updated.
    pub fn end_request(&self, credential: &str, count_as_used: bool) -> Result<ApiKey, StoreError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(StoreError::KeyNotFound);
        }

        let mut state = self.state.write();
        let index = state
            .key_index_by_credential(credential)
            .ok_or(StoreError::KeyNotFound)?;

        Ok(complete_at(&mut state, index, count_as_used))
    }

    /// [`RecordStore::end_request`] for a key id
    ///
    /// The id survives a credential change made while the request ran.
    pub fn end_request_by_id(&self, key_id: &str, count_as_used: bool) -> Result<ApiKey, StoreError> {
        let mut state = self.state.write();
        let index = state
            .key_index_by_id(key_id.trim())
            .ok_or(StoreError::KeyNotFound)?;

        Ok(complete_at(&mut state, index, count_as_used))
    }

    /// Requests currently admitted and not yet completed for a key id
    pub fn in_flight(&self, key_id: &str) -> u32 {
        self.state.read().in_flight.get(key_id).copied().unwrap_or(0)
    }

    /// Administrative release of every slot held for a key id
    ///
    /// For reclaiming slots pinned by requests that never completed. Returns
    /// how many slots were released.
    pub fn release_in_flight(&self, key_id: &str) -> Result<u32, StoreError> {
        let mut state = self.state.write();

        if state.key_index_by_id(key_id).is_none() {
            return Err(StoreError::KeyNotFound);
        }

        let released = state.in_flight.remove(key_id).unwrap_or(0);
        info!(key_id = %key_id, released, "In-flight slots released");
        Ok(released)
    }
}

/// Release the slot held at `index` and optionally count the request
fn complete_at(state: &mut StoreState, index: usize, count_as_used: bool) -> ApiKey {
    let (id, has_ceiling) = {
        let key = &state.records.api_keys[index];
        (key.id().to_string(), key.has_concurrency_limit())
    };

    if has_ceiling {
        release_slots(&mut state.in_flight, &id, 1);
    }

    let key = &mut state.records.api_keys[index];
    if count_as_used {
        key.record_usage();
    }

    debug!(key_id = %id, counted = count_as_used, used = key.used_count(), "Request completed");
    key.clone()
}

fn release_slots(in_flight: &mut std::collections::HashMap<String, u32>, id: &str, count: u32) {
    if let Some(current) = in_flight.get_mut(id) {
        *current = current.saturating_sub(count);
        if *current == 0 {
            in_flight.remove(id);
        }
    }
}
