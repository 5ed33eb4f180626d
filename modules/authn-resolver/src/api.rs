//! Public verification API.

use ownergate_security::Principal;

/// Why a presented credential was refused.
///
/// The kind is for logs only. At the request boundary every variant collapses
/// to a single "not authenticated" outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("malformed credential: {0}")]
    Malformed(String),

    #[error("credential signature is invalid")]
    InvalidSignature,

    #[error("credential has expired")]
    Expired,
}

impl VerificationError {
    /// Short, stable label for structured log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::InvalidSignature => "invalid_signature",
            Self::Expired => "expired",
        }
    }
}

/// Turns a raw bearer credential into a verified `Principal`.
///
/// Implementations are pure and synchronous: no I/O, no shared mutable state.
/// Both the signature and the expiry must be checked; a token that fails
/// either check never yields a principal.
pub trait CredentialVerifier: Send + Sync {
    /// # Errors
    /// Returns the reason the credential was refused.
    fn verify(&self, token: &str) -> Result<Principal, VerificationError>;
}
