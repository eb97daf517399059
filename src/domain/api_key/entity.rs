//! API Key entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// API key record as persisted in the record set
///
/// `total_limit` and `concurrency_limit` use zero for "unlimited".
/// `used_count` only grows under traffic; [`ApiKey::reset_usage`] is the
/// single way back to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKey {
    /// Store-assigned identifier, empty until first upsert
    #[serde(default)]
    id: String,
    /// The credential string presented by callers
    key: String,
    #[serde(default)]
    label: String,
    /// Owning user, empty for unowned keys
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    total_limit: u64,
    #[serde(default)]
    used_count: u64,
    #[serde(default)]
    concurrency_limit: u32,
    /// Accept the credential from non-strict carriers (query string, Google header)
    #[serde(default)]
    compatibility_mode: bool,
    #[serde(default)]
    created_at: DateTime<Utc>,
}

impl ApiKey {
    /// Create a new, enabled, unlimited key
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            key: key.into(),
            label: label.into(),
            user_id: String::new(),
            enabled: true,
            total_limit: 0,
            used_count: 0,
            concurrency_limit: 0,
            compatibility_mode: false,
            created_at: Utc::now(),
        }
    }

    /// Set an explicit identifier (for updates of existing records)
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_total_limit(mut self, limit: u64) -> Self {
        self.total_limit = limit;
        self
    }

    pub fn with_concurrency_limit(mut self, limit: u32) -> Self {
        self.concurrency_limit = limit;
        self
    }

    pub fn with_compatibility_mode(mut self, enabled: bool) -> Self {
        self.compatibility_mode = enabled;
        self
    }

    /// Seed the usage counter, e.g. when importing existing accounting
    pub fn with_used_count(mut self, used: u64) -> Self {
        self.used_count = used;
        self
    }

    // Getters

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn total_limit(&self) -> u64 {
        self.total_limit
    }

    pub fn used_count(&self) -> u64 {
        self.used_count
    }

    pub fn concurrency_limit(&self) -> u32 {
        self.concurrency_limit
    }

    pub fn compatibility_mode(&self) -> bool {
        self.compatibility_mode
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_new(&self) -> bool {
        self.id.is_empty()
    }

    // Limit checks

    pub fn has_total_limit(&self) -> bool {
        self.total_limit > 0
    }

    pub fn has_concurrency_limit(&self) -> bool {
        self.concurrency_limit > 0
    }

    /// Whether the lifetime quota has been consumed
    pub fn is_quota_exhausted(&self) -> bool {
        self.has_total_limit() && self.used_count >= self.total_limit
    }

    /// Requests left under the lifetime quota, `None` when unlimited
    pub fn remaining(&self) -> Option<u64> {
        self.has_total_limit()
            .then(|| self.total_limit.saturating_sub(self.used_count))
    }

    // Mutators

    pub fn set_key(&mut self, key: impl Into<String>) {
        self.key = key.into();
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn set_user_id(&mut self, user_id: impl Into<String>) {
        self.user_id = user_id.into();
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_total_limit(&mut self, limit: u64) {
        self.total_limit = limit;
    }

    pub fn set_concurrency_limit(&mut self, limit: u32) {
        self.concurrency_limit = limit;
    }

    pub fn set_compatibility_mode(&mut self, enabled: bool) {
        self.compatibility_mode = enabled;
    }

    /// Administrative reset of the lifetime usage counter
    pub fn reset_usage(&mut self) {
        self.used_count = 0;
    }

    pub(crate) fn record_usage(&mut self) {
        self.used_count = self.used_count.saturating_add(1);
    }

    pub(crate) fn assign_identity(&mut self, id: String, created_at: DateTime<Utc>) {
        self.id = id;
        self.created_at = created_at;
    }
}
