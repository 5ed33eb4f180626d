//! Configuration for the `AuthN` resolver.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Resolver configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthNConfig {
    /// Shared HMAC secret used to verify (and, in development, issue) tokens.
    pub secret: SecretString,

    /// Signature algorithm accepted on incoming tokens.
    pub algorithm: JwtAlgorithm,

    /// Clock skew tolerated on `exp`, in seconds.
    pub leeway_secs: u64,

    /// Reject tokens whose subject is no longer an active account.
    pub require_existing_principal: bool,
}

impl Default for AuthNConfig {
    fn default() -> Self {
        Self {
            secret: SecretString::from(""),
            algorithm: JwtAlgorithm::default(),
            leeway_secs: 0,
            require_existing_principal: true,
        }
    }
}

impl AuthNConfig {
    /// Minimum secret length accepted for HMAC signing.
    pub const MIN_SECRET_LEN: usize = 32;

    /// # Errors
    /// Returns `ConfigError` when the secret is missing or too short.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let len = self.secret.expose_secret().len();
        if len == 0 {
            return Err(ConfigError::MissingSecret);
        }
        if len < Self::MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret {
                min: Self::MIN_SECRET_LEN,
            });
        }
        Ok(())
    }
}

/// HMAC algorithm family accepted by the verifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JwtAlgorithm {
    #[default]
    Hs256,
    Hs384,
    Hs512,
}

impl From<JwtAlgorithm> for jsonwebtoken::Algorithm {
    fn from(alg: JwtAlgorithm) -> Self {
        match alg {
            JwtAlgorithm::Hs256 => Self::HS256,
            JwtAlgorithm::Hs384 => Self::HS384,
            JwtAlgorithm::Hs512 => Self::HS512,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("authn secret is not configured")]
    MissingSecret,

    #[error("authn secret must be at least {min} bytes")]
    WeakSecret { min: usize },
}
