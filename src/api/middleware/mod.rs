//! API middleware components

pub mod admission;
pub mod auth;
pub mod logging;

pub use admission::admission_middleware;
pub use auth::{HttpCarrier, RequireApiKey, RequireOwner};
pub use logging::{logging_middleware, request_span};
