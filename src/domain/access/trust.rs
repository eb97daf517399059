use super::source::CredentialSource;
use crate::domain::api_key::ApiKey;

/// Whether `key` may be presented on `source`
///
/// Strict carriers are always accepted. Query parameters and the Google
/// header are accepted only for keys opted into compatibility mode.
pub fn is_source_trusted(key: &ApiKey, source: CredentialSource) -> bool {
    source.is_strict() || key.compatibility_mode()
}
