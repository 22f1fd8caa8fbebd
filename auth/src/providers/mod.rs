//! Identity provider trait and built-in implementations.

mod dev_token;

pub use dev_token::DevTokenProvider;

use crate::error::Result;
use async_trait::async_trait;
use gather_core::types::{ExternalId, NewUser};

/// A verified identity, as reported by the external identity service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable provider-assigned id
    pub external_id: ExternalId,
    /// Verified email, when the provider shares one
    pub email: Option<String>,
    /// Display name, when the provider shares one
    pub full_name: Option<String>,
}

impl Identity {
    /// Converts to the attributes used to create a user record on first
    /// resolution. Missing profile fields start empty and are filled in
    /// when the user completes their profile.
    #[must_use]
    pub fn into_new_user(self) -> NewUser {
        NewUser {
            external_id: self.external_id,
            email: self.email.unwrap_or_default(),
            full_name: self.full_name.unwrap_or_default(),
        }
    }
}

/// Resolves a bearer credential to a verified identity.
///
/// Implementations call out to the deployment's identity service. They must
/// be cheap to call per-request or do their own caching.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verifies `credential` and returns the identity it belongs to.
    ///
    /// # Errors
    ///
    /// - [`crate::AuthError::InvalidCredential`] if verification fails
    /// - [`crate::AuthError::ProviderUnavailable`] if the service is down
    async fn resolve(&self, credential: &str) -> Result<Identity>;
}
