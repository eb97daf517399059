//! User validation utilities

use thiserror::Error;

/// Errors that can occur during user validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UserValidationError {
    #[error("Username cannot be empty")]
    EmptyUsername,

    #[error("Username exceeds maximum length of {0} characters")]
    UsernameTooLong(usize),

    #[error("Username contains invalid character: {0:?}")]
    InvalidUsernameCharacter(char),

    #[error("Invalid role '{0}'. Expected 'owner' or 'user'")]
    InvalidRole(String),

    #[error("Password cannot be empty")]
    EmptyPassword,
}

const MAX_USERNAME_LENGTH: usize = 64;

/// Validate a username
///
/// Rules:
/// - Cannot be empty or whitespace only
/// - Maximum 64 characters
/// - No control characters
pub fn validate_username(username: &str) -> Result<(), UserValidationError> {
    let username = username.trim();

    if username.is_empty() {
        return Err(UserValidationError::EmptyUsername);
    }

    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(UserValidationError::UsernameTooLong(MAX_USERNAME_LENGTH));
    }

    if let Some(c) = username.chars().find(|c| c.is_control()) {
        return Err(UserValidationError::InvalidUsernameCharacter(c));
    }

    Ok(())
}

/// Validate a plaintext password before hashing
pub fn validate_password(password: &str) -> Result<(), UserValidationError> {
    if password.trim().is_empty() {
        return Err(UserValidationError::EmptyPassword);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_usernames() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("Bob Smith").is_ok());
        assert!(validate_username("ops@example.com").is_ok());
    }

    #[test]
    fn test_empty_username() {
        assert_eq!(
            validate_username(""),
            Err(UserValidationError::EmptyUsername)
        );
        assert_eq!(
            validate_username("   "),
            Err(UserValidationError::EmptyUsername)
        );
    }

    #[test]
    fn test_username_too_long() {
        let long = "a".repeat(65);
        assert_eq!(
            validate_username(&long),
            Err(UserValidationError::UsernameTooLong(64))
        );
    }

    #[test]
    fn test_username_control_character() {
        assert_eq!(
            validate_username("ali\nce"),
            Err(UserValidationError::InvalidUsernameCharacter('\n'))
        );
    }

    #[test]
    fn test_password() {
        assert!(validate_password("hunter2").is_ok());
        assert_eq!(validate_password(" "), Err(UserValidationError::EmptyPassword));
    }
}
