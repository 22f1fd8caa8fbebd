//! Identity-aware extractors.
//!
//! Every route resolves its caller through the external identity provider:
//!
//! - [`CurrentUser`]: user-scoped routes. The user record is created on
//!   first resolution (find-or-create), so a verified identity never 404s.
//! - [`OrgActor`]: admin-scoped routes. The caller must own an organization
//!   or appear in one's member set; otherwise the route answers 404, which
//!   deliberately does not reveal whether the organization exists.
//!
//! `OrgActor::require` is the single capability check every admin handler
//! calls before acting (`gather_auth::authorize`).

use crate::server::state::AppState;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts, http::StatusCode};
use gather_auth::{authorize, org_role, AuthError, OrgAction, OrgRole};
use gather_core::types::{ExternalId, Organization, User};
use gather_web::{AppError, BearerToken};

fn map_auth_err(err: AuthError) -> AppError {
    match err {
        AuthError::MissingCredential | AuthError::InvalidCredential => {
            AppError::unauthorized(err.to_string())
        }
        AuthError::ProviderUnavailable { reason } => {
            tracing::error!(reason = %reason, "identity provider unavailable");
            AppError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "identity_unavailable",
                "Identity provider unavailable".to_string(),
            )
        }
    }
}

/// The authenticated platform user, created on first resolution.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = BearerToken::from_request_parts(parts, state).await?;
        let identity = state
            .identity
            .resolve(&bearer.0)
            .await
            .map_err(map_auth_err)?;
        let user = state
            .store
            .find_or_create_user(&identity.into_new_user())
            .await
            .map_err(|e| AppError::from(gather_core::Error::Store(e)))?;
        Ok(Self(user))
    }
}

/// An authenticated actor operating on behalf of an organization.
#[derive(Debug, Clone)]
pub struct OrgActor {
    /// The organization the actor may act for
    pub organization: Organization,
    /// The actor's external identity
    pub actor: ExternalId,
}

impl OrgActor {
    /// The actor's role within the organization.
    #[must_use]
    pub fn role(&self) -> OrgRole {
        // Resolution only succeeds for owners and members, so the non-owner
        // case is Member by construction.
        org_role(
            &self.organization,
            &self.actor,
            true,
        )
        .unwrap_or(OrgRole::Member)
    }

    /// The capability check: errors with 403 when the actor's role does not
    /// permit `action`.
    ///
    /// # Errors
    ///
    /// Returns a forbidden [`AppError`] when denied.
    pub fn require(&self, action: OrgAction) -> Result<(), AppError> {
        if authorize(self.role(), action) {
            Ok(())
        } else {
            Err(AppError::forbidden(
                "Your role in this organization does not permit this action",
            ))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for OrgActor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = BearerToken::from_request_parts(parts, state).await?;
        let identity = state
            .identity
            .resolve(&bearer.0)
            .await
            .map_err(map_auth_err)?;

        let organization = state
            .store
            .organization_for_actor(&identity.external_id)
            .await
            .map_err(|e| AppError::from(gather_core::Error::Store(e)))?
            .ok_or_else(|| AppError::not_found("organization"))?;

        Ok(Self {
            organization,
            actor: identity.external_id,
        })
    }
}
