//! Domain layer - Core records, credential rules and errors

pub mod access;
pub mod api_key;
pub mod error;
pub mod record_set;
pub mod user;

pub use access::{
    extract_credential, is_source_trusted, CredentialCarrier, CredentialSource,
    ExtractedCredential,
};
pub use api_key::{validate_credential, ApiKey, ApiKeyValidationError};
pub use error::StoreError;
pub use record_set::{RecordSet, RECORD_SET_VERSION};
pub use user::{validate_password, validate_username, User, UserRole, UserValidationError};
