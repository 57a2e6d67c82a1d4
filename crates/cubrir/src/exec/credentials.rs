//! Credential injection for authenticated endpoints.

use std::fmt;

/// Supplies one header to attach to every outgoing request.
pub trait CredentialProvider: Send + Sync + fmt::Debug {
    /// Header name and value to inject.
    fn header(&self) -> (String, String);
}

/// `Authorization: Bearer <token>` credentials.
#[derive(Clone)]
pub struct BearerToken {
    token: String,
}

impl BearerToken {
    /// Wrap a bearer token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for BearerToken {
    // Token value stays out of logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken").finish_non_exhaustive()
    }
}

impl CredentialProvider for BearerToken {
    fn header(&self) -> (String, String) {
        ("Authorization".to_string(), format!("Bearer {}", self.token))
    }
}

/// Arbitrary header credentials (API keys etc).
#[derive(Clone)]
pub struct HeaderCredential {
    name: String,
    value: String,
}

impl HeaderCredential {
    /// Build from a header name and value.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Debug for HeaderCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderCredential")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl CredentialProvider for HeaderCredential {
    fn header(&self) -> (String, String) {
        (self.name.clone(), self.value.clone())
    }
}
