//! HTTP boundary types

pub mod error;
pub mod json;
pub mod records;

pub use error::{ApiError, ApiErrorResponse, ApiErrorType};
pub use json::Json;
pub use records::{ApiKeyResponse, UsageResponse, UserResponse};
