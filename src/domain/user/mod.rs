//! User domain
//!
//! Portal and administrative accounts that own API keys.

mod entity;
mod validation;

pub use entity::{User, UserRole};
pub use validation::{validate_password, validate_username, UserValidationError};
