//! The persisted aggregate of users and API keys

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::api_key::ApiKey;
use super::user::User;

/// Current on-disk format version
pub const RECORD_SET_VERSION: u32 = 1;

/// Everything the store persists, written as a single JSON document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    #[serde(default)]
    pub version: u32,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub api_keys: Vec<ApiKey>,
}

impl RecordSet {
    /// Empty record set at the current version
    pub fn empty() -> Self {
        Self {
            version: RECORD_SET_VERSION,
            updated_at: Utc::now(),
            users: Vec::new(),
            api_keys: Vec::new(),
        }
    }

    /// Decode a record set, normalizing a missing or zero version to 1
    pub fn from_json(raw: &[u8]) -> Result<Self, serde_json::Error> {
        let mut records: Self = serde_json::from_slice(raw)?;

        if records.version == 0 {
            records.version = RECORD_SET_VERSION;
        }

        Ok(records)
    }

    pub fn to_json_pretty(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }
}

impl Default for RecordSet {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::UserRole;

    #[test]
    fn test_empty_is_version_one() {
        let records = RecordSet::empty();
        assert_eq!(records.version, 1);
        assert!(records.users.is_empty());
        assert!(records.api_keys.is_empty());
    }

    #[test]
    fn test_missing_version_normalized() {
        let records = RecordSet::from_json(br#"{"users":[],"api_keys":[]}"#).unwrap();
        assert_eq!(records.version, 1);

        let records = RecordSet::from_json(br#"{"version":0}"#).unwrap();
        assert_eq!(records.version, 1);
    }

    #[test]
    fn test_higher_version_preserved() {
        let records = RecordSet::from_json(br#"{"version":7}"#).unwrap();
        assert_eq!(records.version, 7);
    }

    #[test]
    fn test_malformed_input_fails() {
        assert!(RecordSet::from_json(b"{not json").is_err());
        assert!(RecordSet::from_json(br#"{"users":"nope"}"#).is_err());
    }

    #[test]
    fn test_document_layout() {
        let mut records = RecordSet::empty();
        records.users.push(User::new("alice", "hash", UserRole::Owner).with_id("usr_1"));
        records.api_keys.push(ApiKey::new("kg-1", "first").with_id("key_1"));

        let json: serde_json::Value =
            serde_json::from_slice(&records.to_json_pretty().unwrap()).unwrap();

        assert_eq!(json["version"], 1);
        assert!(json["updated_at"].is_string());
        assert_eq!(json["users"][0]["username"], "alice");
        assert_eq!(json["api_keys"][0]["key"], "kg-1");
    }
}
