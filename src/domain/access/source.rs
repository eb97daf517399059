use serde::Serialize;

/// Where on the request a credential was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialSource {
    /// `Authorization` header, bearer or bare
    Authorization,
    /// `X-Api-Key` header in any casing
    XApiKey,
    /// `X-Goog-Api-Key` header
    XGoogApiKey,
    /// `key` query parameter
    QueryKey,
    /// `auth_token` query parameter
    QueryAuthToken,
}

impl CredentialSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authorization => "authorization",
            Self::XApiKey => "x-api-key",
            Self::XGoogApiKey => "x-goog-api-key",
            Self::QueryKey => "query-key",
            Self::QueryAuthToken => "query-auth-token",
        }
    }

    /// Strict sources are accepted for every key; the rest need compatibility mode
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Authorization | Self::XApiKey)
    }
}

impl std::fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
