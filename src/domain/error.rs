use thiserror::Error;

use super::api_key::ApiKeyValidationError;
use super::user::UserValidationError;

/// Errors surfaced by the record store and its admission protocol
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("api key not found")]
    KeyNotFound,

    #[error("api key disabled")]
    KeyDisabled,

    #[error("quota exceeded")]
    QuotaExceeded,

    #[error("concurrency exceeded")]
    ConcurrencyExceeded,

    #[error("user not found")]
    UserNotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("duplicate username")]
    DuplicateUsername,

    #[error("duplicate api key")]
    DuplicateApiKey,

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Encode error: {message}")]
    Encode { message: String },

    #[error("I/O error: {message}")]
    Io { message: String },
}

impl StoreError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Whether the error is an admission policy rejection (quota or concurrency)
    pub fn is_limit(&self) -> bool {
        matches!(self, Self::QuotaExceeded | Self::ConcurrencyExceeded)
    }
}

impl From<UserValidationError> for StoreError {
    fn from(err: UserValidationError) -> Self {
        Self::validation(err.to_string())
    }
}

impl From<ApiKeyValidationError> for StoreError {
    fn from(err: ApiKeyValidationError) -> Self {
        Self::validation(err.to_string())
    }
}
