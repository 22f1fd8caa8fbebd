//! Error types for identity resolution.

use thiserror::Error;

/// Result type alias for identity operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Failures while resolving a credential to an identity.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No credential was presented.
    #[error("Missing credential")]
    MissingCredential,

    /// The credential was present but did not verify.
    #[error("Invalid credential")]
    InvalidCredential,

    /// The identity service could not be reached.
    #[error("Identity provider unavailable: {reason}")]
    ProviderUnavailable {
        /// What went wrong upstream
        reason: String,
    },
}
