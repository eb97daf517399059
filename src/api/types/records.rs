//! Response shapes for users, API keys and usage

use serde::Serialize;

use crate::domain::{ApiKey, User};

/// User as exposed over HTTP; never carries the password hash
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub role: String,
    pub disabled: bool,
    pub created_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id().to_string(),
            username: user.username().to_string(),
            role: user.role().to_string(),
            disabled: user.is_disabled(),
            created_at: user.created_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyResponse {
    pub id: String,
    pub key: String,
    pub label: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user_id: String,
    pub enabled: bool,
    pub total_limit: u64,
    pub used_count: u64,
    pub concurrency_limit: u32,
    pub compatibility_mode: bool,
    pub created_at: String,
}

impl From<&ApiKey> for ApiKeyResponse {
    fn from(key: &ApiKey) -> Self {
        Self {
            id: key.id().to_string(),
            key: key.key().to_string(),
            label: key.label().to_string(),
            user_id: key.user_id().to_string(),
            enabled: key.is_enabled(),
            total_limit: key.total_limit(),
            used_count: key.used_count(),
            concurrency_limit: key.concurrency_limit(),
            compatibility_mode: key.compatibility_mode(),
            created_at: key.created_at().to_rfc3339(),
        }
    }
}

/// Usage of one key; `limit` and `remaining` are absent when unlimited
#[derive(Debug, Clone, Serialize)]
pub struct UsageResponse {
    pub key_id: String,
    pub label: String,
    pub enabled: bool,
    pub used: u64,
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub in_flight: u32,
    pub concurrency_limit: Option<u32>,
}

impl UsageResponse {
    pub fn new(key: &ApiKey, in_flight: u32) -> Self {
        Self {
            key_id: key.id().to_string(),
            label: key.label().to_string(),
            enabled: key.is_enabled(),
            used: key.used_count(),
            limit: key.has_total_limit().then(|| key.total_limit()),
            remaining: key.remaining(),
            in_flight,
            concurrency_limit: key.has_concurrency_limit().then(|| key.concurrency_limit()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserRole;

    #[test]
    fn test_user_response_omits_hash() {
        let user = User::new("alice", "$argon2id$v=19$secret", UserRole::Owner).with_id("usr_1");
        let json = serde_json::to_string(&UserResponse::from(&user)).unwrap();

        assert!(json.contains("\"role\":\"owner\""));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn test_usage_for_unlimited_key() {
        let key = ApiKey::new("kg-u", "free").with_used_count(7);
        let usage = UsageResponse::new(&key, 0);

        assert_eq!(usage.used, 7);
        assert_eq!(usage.limit, None);
        assert_eq!(usage.remaining, None);
        assert_eq!(usage.concurrency_limit, None);
    }

    #[test]
    fn test_usage_for_limited_key() {
        let key = ApiKey::new("kg-l", "")
            .with_total_limit(10)
            .with_used_count(4)
            .with_concurrency_limit(2);
        let usage = UsageResponse::new(&key, 1);

        assert_eq!(usage.limit, Some(10));
        assert_eq!(usage.remaining, Some(6));
        assert_eq!(usage.in_flight, 1);
        assert_eq!(usage.concurrency_limit, Some(2));
    }
}
