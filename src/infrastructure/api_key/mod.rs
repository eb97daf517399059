//! API Key infrastructure implementations
//!
//! Credential generation and comparison helpers.

mod generator;

pub use generator::{constant_time_eq, generate_credential, new_record_id, CredentialGenerator};
