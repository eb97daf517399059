//! Credential access domain
//!
//! Locating a credential on an inbound request and deciding whether the
//! carrier it arrived on is trusted for a given key.

mod extractor;
mod source;
mod trust;

pub use extractor::{extract_credential, CredentialCarrier, ExtractedCredential};
pub use source::CredentialSource;
pub use trust::is_source_trusted;
