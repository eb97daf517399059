//! Infrastructure layer - Store, access checks and process plumbing

pub mod access;
pub mod api_key;
pub mod logging;
pub mod store;
pub mod user;
