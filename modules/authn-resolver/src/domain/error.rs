//! Resolution errors.

use crate::api::VerificationError;

/// Why a presented credential did not resolve to an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Verification failed.
    Credential(VerificationError),
    /// The credential was valid but names an account that no longer exists
    /// or has been deactivated.
    UnknownPrincipal,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Credential(e) => write!(f, "{e}"),
            Self::UnknownPrincipal => f.write_str("principal is not an active account"),
        }
    }
}

/// Errors returned by `IdentityResolver`.
///
/// Callers must not surface the reason: every `NotAuthenticated` maps to the
/// same 401 response.
#[derive(Debug, thiserror::Error)]
pub enum AuthNError {
    #[error("not authenticated: {0}")]
    NotAuthenticated(RejectReason),

    #[error("principal directory unavailable: {0}")]
    Internal(String),
}

impl From<VerificationError> for AuthNError {
    fn from(e: VerificationError) -> Self {
        Self::NotAuthenticated(RejectReason::Credential(e))
    }
}

impl From<sqlx::Error> for AuthNError {
    fn from(e: sqlx::Error) -> Self {
        Self::Internal(e.to_string())
    }
}
