//! API Key validation utilities

use thiserror::Error;

/// Errors that can occur during API key validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiKeyValidationError {
    #[error("API key cannot be empty")]
    EmptyKey,

    #[error("API key exceeds maximum length of {0} characters")]
    TooLong(usize),

    #[error("API key contains invalid character: {0:?}. Whitespace and control characters are not allowed")]
    InvalidCharacter(char),
}

const MAX_API_KEY_LENGTH: usize = 256;

/// Validate a credential string
///
/// Rules:
/// - Cannot be empty
/// - Maximum 256 characters
/// - No whitespace or control characters, since extraction trims carriers
///   and a padded key could never be presented verbatim
pub fn validate_credential(key: &str) -> Result<(), ApiKeyValidationError> {
    if key.is_empty() {
        return Err(ApiKeyValidationError::EmptyKey);
    }

    if key.chars().count() > MAX_API_KEY_LENGTH {
        return Err(ApiKeyValidationError::TooLong(MAX_API_KEY_LENGTH));
    }

    if let Some(c) = key.chars().find(|c| c.is_whitespace() || c.is_control()) {
        return Err(ApiKeyValidationError::InvalidCharacter(c));
    }

    Ok(())
}
