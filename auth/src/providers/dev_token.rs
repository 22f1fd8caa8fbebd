//! Development identity provider.
//!
//! Accepts tokens of the form `ext-id[:email[:full name]]` and reflects
//! them back as a verified identity. There is no cryptography here; this
//! provider exists so the server runs end-to-end in development and demo
//! environments without the external identity service. Do not deploy it.

use super::{Identity, IdentityProvider};
use crate::error::{AuthError, Result};
use async_trait::async_trait;
use gather_core::types::ExternalId;

/// Identity provider for development environments.
///
/// The bearer token itself carries the identity:
///
/// ```text
/// Authorization: Bearer alice-ext:alice@example.com:Alice Liddell
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DevTokenProvider;

impl DevTokenProvider {
    /// Creates the provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl IdentityProvider for DevTokenProvider {
    async fn resolve(&self, credential: &str) -> Result<Identity> {
        let mut parts = credential.splitn(3, ':');
        let external_id = parts.next().unwrap_or_default().trim();
        if external_id.is_empty() {
            return Err(AuthError::InvalidCredential);
        }
        Ok(Identity {
            external_id: ExternalId::new(external_id),
            email: parts.next().map(|s| s.trim().to_string()),
            full_name: parts.next().map(|s| s.trim().to_string()),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolves_full_token() {
        let identity = DevTokenProvider::new()
            .resolve("alice-ext:alice@example.com:Alice Liddell")
            .await
            .unwrap();
        assert_eq!(identity.external_id, ExternalId::new("alice-ext"));
        assert_eq!(identity.email.as_deref(), Some("alice@example.com"));
        assert_eq!(identity.full_name.as_deref(), Some("Alice Liddell"));
    }

    #[tokio::test]
    async fn test_resolves_bare_external_id() {
        let identity = DevTokenProvider::new().resolve("bob-ext").await.unwrap();
        assert_eq!(identity.external_id, ExternalId::new("bob-ext"));
        assert_eq!(identity.email, None);
    }

    #[tokio::test]
    async fn test_rejects_empty_token() {
        let err = DevTokenProvider::new().resolve("").await.unwrap_err();
        assert_eq!(err, AuthError::InvalidCredential);
    }
}
