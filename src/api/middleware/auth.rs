//! API key authentication extractors

use std::collections::HashMap;

use axum::{
    extract::{FromRequestParts, Query},
    http::{request::Parts, HeaderMap, Uri},
};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::{CredentialCarrier, User};
use crate::infrastructure::access::AccessGrant;

/// Credential carriers of an HTTP request: its headers and query string
#[derive(Debug)]
pub struct HttpCarrier<'a> {
    headers: &'a HeaderMap,
    query: HashMap<String, String>,
}

impl<'a> HttpCarrier<'a> {
    /// An unparseable query string counts as empty
    pub fn new(headers: &'a HeaderMap, uri: &Uri) -> Self {
        let query = Query::<HashMap<String, String>>::try_from_uri(uri)
            .map(|Query(query)| query)
            .unwrap_or_default();

        Self { headers, query }
    }
}

impl CredentialCarrier for HttpCarrier<'_> {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}

/// Extractor that requires a valid API key
///
/// Reuses the grant placed by the admission middleware when present;
/// otherwise runs the access check itself.
#[derive(Debug, Clone)]
pub struct RequireApiKey(pub AccessGrant);

impl FromRequestParts<AppState> for RequireApiKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(grant) = parts.extensions.get::<AccessGrant>() {
            return Ok(RequireApiKey(grant.clone()));
        }

        let carrier = HttpCarrier::new(&parts.headers, &parts.uri);
        let grant = state.access.authenticate(&carrier)?;

        debug!(key_id = %grant.key.id(), source = %grant.source, "API key accepted");

        Ok(RequireApiKey(grant))
    }
}

/// Extractor that requires an API key whose owning user has the `owner` role
#[derive(Debug, Clone)]
pub struct RequireOwner {
    pub grant: AccessGrant,
    pub user: User,
}

impl FromRequestParts<AppState> for RequireOwner {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireApiKey(grant) = RequireApiKey::from_request_parts(parts, state).await?;

        let user = Some(grant.key.user_id())
            .filter(|id| !id.is_empty())
            .and_then(|id| state.store.find_user_by_id(id))
            .filter(|user| !user.is_disabled() && user.role().is_owner())
            .ok_or_else(|| ApiError::forbidden("Owner access required"))?;

        debug!(user_id = %user.id(), key_id = %grant.key.id(), "Owner access granted");

        Ok(RequireOwner { grant, user })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{extract_credential, CredentialSource};

    fn carrier_parts(uri: &str, headers: &[(&str, &str)]) -> (HeaderMap, Uri) {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                value.parse().unwrap(),
            );
        }
        (map, uri.parse().unwrap())
    }

    #[test]
    fn test_headers_match_any_casing() {
        let (headers, uri) = carrier_parts("/v1/access", &[("x-api-key", "kg-lower")]);
        let carrier = HttpCarrier::new(&headers, &uri);

        assert_eq!(carrier.header("X-Api-Key"), Some("kg-lower"));
        assert_eq!(carrier.header("X-API-Key"), Some("kg-lower"));
    }

    #[test]
    fn test_query_parameters_decoded() {
        let (headers, uri) = carrier_parts("/v1/access?key=kg-a%2Bb&other=1", &[]);
        let carrier = HttpCarrier::new(&headers, &uri);

        assert_eq!(carrier.query_param("key"), Some("kg-a+b"));
        assert_eq!(carrier.query_param("auth_token"), None);
    }

    #[test]
    fn test_bearer_preferred_over_query() {
        let (headers, uri) = carrier_parts(
            "/v1/access?key=kg-query",
            &[("authorization", "Bearer kg-bearer")],
        );
        let carrier = HttpCarrier::new(&headers, &uri);

        let credential = extract_credential(&carrier).unwrap();
        assert_eq!(credential.value, "kg-bearer");
        assert_eq!(credential.source, CredentialSource::Authorization);
    }

    #[test]
    fn test_non_ascii_header_value_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            axum::http::HeaderValue::from_bytes(b"kg-\xff").unwrap(),
        );
        let uri: Uri = "/v1/access?auth_token=kg-fallback".parse().unwrap();
        let carrier = HttpCarrier::new(&headers, &uri);

        let credential = extract_credential(&carrier).unwrap();
        assert_eq!(credential.value, "kg-fallback");
        assert_eq!(credential.source, CredentialSource::QueryAuthToken);
    }
}
