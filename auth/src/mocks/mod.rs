//! Mock identity providers for tests.

use crate::error::{AuthError, Result};
use crate::providers::{Identity, IdentityProvider};
use async_trait::async_trait;
use std::collections::HashMap;

/// Identity provider backed by a fixed token table.
///
/// Tests register the tokens they intend to present; any other credential
/// is rejected, which also exercises the unauthorized paths.
#[derive(Debug, Default)]
pub struct StaticIdentityProvider {
    tokens: HashMap<String, Identity>,
}

impl StaticIdentityProvider {
    /// Creates an empty provider (every credential rejected).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `token` as resolving to `identity`.
    #[must_use]
    pub fn with_token(mut self, token: &str, identity: Identity) -> Self {
        self.tokens.insert(token.to_string(), identity);
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn resolve(&self, credential: &str) -> Result<Identity> {
        self.tokens
            .get(credential)
            .cloned()
            .ok_or(AuthError::InvalidCredential)
    }
}
