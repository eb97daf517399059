//! User entity and related types

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::UserValidationError;

/// Role of a user within the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Full administrative access
    Owner,
    /// Regular account owning its own keys
    #[default]
    User,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::User => "user",
        }
    }

    pub fn is_owner(&self) -> bool {
        matches!(self, Self::Owner)
    }
}

impl FromStr for UserRole {
    type Err = UserValidationError;

    /// An empty role resolves to the default `user` role
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "user" => Ok(Self::User),
            "owner" => Ok(Self::Owner),
            _ => Err(UserValidationError::InvalidRole(s.to_string())),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User record as persisted in the record set
///
/// The password hash is part of the persisted form; API responses go through
/// `UserResponse`, which never carries it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Store-assigned identifier, empty until first upsert
    #[serde(default)]
    id: String,
    username: String,
    #[serde(default)]
    password_hash: String,
    #[serde(default)]
    role: UserRole,
    #[serde(default)]
    disabled: bool,
    #[serde(default)]
    created_at: DateTime<Utc>,
}

impl User {
    /// Create a new, not yet stored user
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>, role: UserRole) -> Self {
        Self {
            id: String::new(),
            username: username.into(),
            password_hash: password_hash.into(),
            role,
            disabled: false,
            created_at: Utc::now(),
        }
    }

    /// Set an explicit identifier (for updates of existing records)
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    // Getters

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_new(&self) -> bool {
        self.id.is_empty()
    }

    // Mutators

    pub fn set_username(&mut self, username: impl Into<String>) {
        self.username = username.into();
    }

    pub fn set_password_hash(&mut self, password_hash: impl Into<String>) {
        self.password_hash = password_hash.into();
    }

    pub fn set_role(&mut self, role: UserRole) {
        self.role = role;
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub(crate) fn assign_identity(&mut self, id: String, created_at: DateTime<Utc>) {
        self.id = id;
        self.created_at = created_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("owner".parse::<UserRole>().unwrap(), UserRole::Owner);
        assert_eq!("USER".parse::<UserRole>().unwrap(), UserRole::User);
        assert_eq!("".parse::<UserRole>().unwrap(), UserRole::User);
        assert_eq!(
            "admin".parse::<UserRole>(),
            Err(UserValidationError::InvalidRole("admin".to_string()))
        );
    }

    #[test]
    fn test_new_user_has_no_id() {
        let user = User::new("alice", "hash", UserRole::User);
        assert!(user.is_new());
        assert!(!user.is_disabled());
        assert_eq!(user.username(), "alice");
    }

    #[test]
    fn test_wire_field_names() {
        let user = User::new("alice", "hash", UserRole::Owner).with_id("usr_1");
        let json = serde_json::to_value(&user).unwrap();

        assert_eq!(json["id"], "usr_1");
        assert_eq!(json["username"], "alice");
        assert_eq!(json["password_hash"], "hash");
        assert_eq!(json["role"], "owner");
        assert_eq!(json["disabled"], false);
        assert!(json.get("created_at").is_some());
    }

    #[test]
    fn test_unknown_role_fails_to_decode() {
        let raw = r#"{"id":"usr_1","username":"bob","role":"root"}"#;
        assert!(serde_json::from_str::<User>(raw).is_err());
    }
}
