//! Error taxonomy for engine operations.

use crate::store::StoreError;
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why an operation conflicted with existing state.
///
/// Carried inside [`Error::Conflict`] so the HTTP layer can surface a
/// machine-readable reason code next to the human message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    /// The registration deadline has passed.
    DeadlinePassed,
    /// The user already holds a registration for this event or session.
    AlreadyRegistered,
    /// The event or session is at capacity.
    CapacityExceeded,
    /// The user holds no confirmed registration for this event.
    NotRegistered,
    /// The coupon was already redeemed by this user.
    AlreadyRedeemed,
    /// The registration is already cancelled.
    AlreadyCancelled,
}

impl ConflictReason {
    /// Stable machine-readable code for error payloads.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::DeadlinePassed => "deadline_passed",
            Self::AlreadyRegistered => "already_registered",
            Self::CapacityExceeded => "capacity_exceeded",
            Self::NotRegistered => "not_registered",
            Self::AlreadyRedeemed => "already_redeemed",
            Self::AlreadyCancelled => "already_cancelled",
        }
    }

    /// Human-readable message for error payloads.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::DeadlinePassed => "Registration deadline has passed",
            Self::AlreadyRegistered => "Already registered",
            Self::CapacityExceeded => "Maximum capacity reached",
            Self::NotRegistered => "No confirmed registration for this event",
            Self::AlreadyRedeemed => "Coupon has already been used",
            Self::AlreadyCancelled => "Registration is already cancelled",
        }
    }
}

impl std::fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// Domain errors surfaced by the engines.
///
/// `NotFound` deliberately covers both "absent" and "not owned by the
/// caller's organization" so the API does not leak the existence of other
/// organizations' events. `Consistency` and `Store` are logged with full
/// detail server-side and shown to callers only as a generic failure.
#[derive(Debug, Error)]
pub enum Error {
    /// Entity absent, or present but outside the caller's scope.
    #[error("{entity} not found")]
    NotFound {
        /// Kind of entity that was looked up ("event", "user", "coupon", ...)
        entity: &'static str,
    },

    /// Malformed or out-of-range input.
    #[error("validation failed: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// The operation conflicts with current state.
    #[error("{0}")]
    Conflict(ConflictReason),

    /// Caller could not be resolved to an identity.
    #[error("unauthorized: {message}")]
    Unauthorized {
        /// Why resolution failed
        message: String,
    },

    /// Stored state violates an invariant the engines maintain.
    #[error("consistency fault: {detail}")]
    Consistency {
        /// Which invariant was found broken
        detail: String,
    },

    /// The entity store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    /// Shorthand for a [`Error::NotFound`].
    #[must_use]
    pub const fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    /// Shorthand for a [`Error::Validation`].
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_codes_are_stable() {
        assert_eq!(ConflictReason::DeadlinePassed.code(), "deadline_passed");
        assert_eq!(ConflictReason::AlreadyRedeemed.code(), "already_redeemed");
        assert_eq!(
            ConflictReason::CapacityExceeded.code(),
            "capacity_exceeded"
        );
    }

    #[test]
    fn test_display_uses_human_message() {
        let err = Error::Conflict(ConflictReason::CapacityExceeded);
        assert_eq!(err.to_string(), "Maximum capacity reached");
        let err = Error::not_found("event");
        assert_eq!(err.to_string(), "event not found");
    }
}
