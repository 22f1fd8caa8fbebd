//! Custom Axum extractors.
//!
//! State-generic extractors shared by every handler:
//! - [`BearerToken`]: the credential from `Authorization: Bearer <token>`
//! - [`CorrelationId`]: extract-or-generate request correlation id
//!
//! The identity-aware extractors build on [`BearerToken`] in the server
//! crate, where the identity provider and store are in scope.

use crate::error::AppError;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

/// Bearer token extracted from the `Authorization` header.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| {
                AppError::unauthorized("Invalid authorization format. Expected 'Bearer <token>'")
            })?
            .to_string();

        if token.is_empty() {
            return Err(AppError::unauthorized("Empty bearer token"));
        }

        Ok(Self(token))
    }
}

/// Correlation id for request tracing.
///
/// Taken from the `X-Correlation-ID` header when present and well-formed,
/// otherwise freshly generated.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = parts
            .headers
            .get(crate::middleware::CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn test_bearer_token_extracted() {
        let req = Request::builder()
            .header("authorization", "Bearer tok-123")
            .body(())
            .unwrap();
        let (mut parts, ()) = req.into_parts();
        let token = BearerToken::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(token.0, "tok-123");
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        let req = Request::builder().body(()).unwrap();
        let (mut parts, ()) = req.into_parts();
        let err = BearerToken::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "unauthorized");
    }

    #[tokio::test]
    async fn test_non_bearer_scheme_rejected() {
        let req = Request::builder()
            .header("authorization", "Basic dXNlcjpwYXNz")
            .body(())
            .unwrap();
        let (mut parts, ()) = req.into_parts();
        assert!(BearerToken::from_request_parts(&mut parts, &())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_correlation_id_from_header() {
        let uuid = Uuid::new_v4();
        let req = Request::builder()
            .header("X-Correlation-ID", uuid.to_string())
            .body(())
            .unwrap();
        let (mut parts, ()) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(correlation_id.0, uuid);
    }

    #[tokio::test]
    async fn test_correlation_id_generated_when_absent() {
        let req = Request::builder().body(()).unwrap();
        let (mut parts, ()) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_ne!(correlation_id.0, Uuid::nil());
    }
}
