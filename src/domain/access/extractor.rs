//! Credential extraction with fixed carrier precedence

use super::source::CredentialSource;

/// Read-only view of the parts of a request that can carry a credential
///
/// Header lookups use the exact name given. Case-insensitive header maps
/// answer every casing the same way; case-sensitive ones do not, which is
/// why the extractor probes more than one spelling of the API key header.
pub trait CredentialCarrier {
    fn header(&self, name: &str) -> Option<&str>;

    fn query_param(&self, name: &str) -> Option<&str>;
}

/// A credential value together with the carrier it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedCredential {
    pub value: String,
    pub source: CredentialSource,
}

impl ExtractedCredential {
    fn new(value: &str, source: CredentialSource) -> Self {
        Self {
            value: value.to_string(),
            source,
        }
    }
}

const HEADER_CARRIERS: [(&str, CredentialSource); 3] = [
    ("X-Api-Key", CredentialSource::XApiKey),
    ("X-Goog-Api-Key", CredentialSource::XGoogApiKey),
    ("X-API-Key", CredentialSource::XApiKey),
];

const QUERY_CARRIERS: [(&str, CredentialSource); 2] = [
    ("key", CredentialSource::QueryKey),
    ("auth_token", CredentialSource::QueryAuthToken),
];

/// Locate the credential on a request
///
/// Precedence, first non-empty match wins:
/// 1. `Authorization: Bearer <token>`
/// 2. any other non-Basic `Authorization` value, taken verbatim
/// 3. `X-Api-Key`
/// 4. `X-Goog-Api-Key`
/// 5. `X-API-Key`
/// 6. `?key=`
/// 7. `?auth_token=`
///
/// Values are trimmed. Returns `None` when no carrier holds a credential.
pub fn extract_credential<C>(carrier: &C) -> Option<ExtractedCredential>
where
    C: CredentialCarrier + ?Sized,
{
    if let Some(value) = carrier.header("Authorization").and_then(authorization_value) {
        return Some(ExtractedCredential::new(value, CredentialSource::Authorization));
    }

    HEADER_CARRIERS
        .iter()
        .find_map(|(name, source)| non_empty(carrier.header(name)).map(|v| (v, *source)))
        .or_else(|| {
            QUERY_CARRIERS
                .iter()
                .find_map(|(name, source)| non_empty(carrier.query_param(name)).map(|v| (v, *source)))
        })
        .map(|(value, source)| ExtractedCredential::new(value, source))
}

fn authorization_value(header: &str) -> Option<&str> {
    let header = header.trim_start();

    if let Some((scheme, token)) = header.split_once(' ') {
        if scheme.eq_ignore_ascii_case("bearer") {
            return non_empty(Some(token));
        }

        if scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
    }

    non_empty(Some(header))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
