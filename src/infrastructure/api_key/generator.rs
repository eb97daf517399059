//! Credential and record identifier generation
//!
//! Generates cryptographically random API key credentials and opaque record
//! identifiers.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;

/// Generator for API key credentials
#[derive(Debug, Clone)]
pub struct CredentialGenerator {
    /// Prefix for all generated keys
    prefix: String,
    /// Number of random bytes to generate
    key_bytes: usize,
}

impl CredentialGenerator {
    /// Create a new credential generator
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            key_bytes: 24,
        }
    }

    /// Generate a new credential string
    pub fn generate(&self) -> String {
        format!("{}{}", self.prefix, random_token(self.key_bytes))
    }
}

impl Default for CredentialGenerator {
    fn default() -> Self {
        Self::new("kg-")
    }
}

/// Generate a credential with the default generator
pub fn generate_credential() -> String {
    CredentialGenerator::default().generate()
}

/// Opaque record identifier such as `usr_…` or `key_…`
pub fn new_record_id(prefix: &str) -> String {
    format!("{}_{}", prefix, random_token(12))
}

fn random_token(bytes: usize) -> String {
    let mut random_bytes = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut random_bytes);
    URL_SAFE_NO_PAD.encode(&random_bytes)
}

/// Constant-time string comparison to prevent timing attacks
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
