//! API Key domain
//!
//! This module provides the persisted API key record with its quota and
//! concurrency settings, and credential validation.

mod entity;
mod validation;

pub use entity::ApiKey;
pub use validation::{validate_credential, ApiKeyValidationError};
