//! HMAC-signed JWT verification and issuance.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use ownergate_security::{Principal, Role};
use secrecy::ExposeSecret;

use crate::api::{CredentialVerifier, VerificationError};
use crate::config::{AuthNConfig, ConfigError, JwtAlgorithm};
use crate::models::Claims;

/// Verifies HS256/384/512 access tokens against a shared secret.
///
/// Signature and `exp` are both enforced. Only the configured algorithm is
/// accepted, so a token re-signed with another algorithm (including `none`)
/// is rejected as an invalid signature.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("algorithms", &self.validation.algorithms)
            .field("leeway", &self.validation.leeway)
            .finish_non_exhaustive()
    }
}

impl JwtVerifier {
    /// # Errors
    /// Returns `ConfigError` if the configured secret is unusable.
    pub fn from_config(cfg: &AuthNConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self::new(
            cfg.secret.expose_secret().as_bytes(),
            cfg.algorithm,
            cfg.leeway_secs,
        ))
    }

    #[must_use]
    pub fn new(secret: &[u8], algorithm: JwtAlgorithm, leeway_secs: u64) -> Self {
        let mut validation = Validation::new(algorithm.into());
        validation.leeway = leeway_secs;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl CredentialVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<Principal, VerificationError> {
        if token.trim().is_empty() {
            return Err(VerificationError::Malformed("empty token".to_owned()));
        }

        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(map_jwt_error)?;

        let subject_id = data
            .claims
            .sub
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| {
                VerificationError::Malformed("subject is not a positive integer".to_owned())
            })?;

        Ok(Principal::new(subject_id, data.claims.role))
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> VerificationError {
    match err.kind() {
        ErrorKind::ExpiredSignature => VerificationError::Expired,
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
            VerificationError::InvalidSignature
        }
        _ => VerificationError::Malformed(err.to_string()),
    }
}

/// Signs access tokens with the same secret the verifier checks.
///
/// Meant for development tooling and tests; production tokens come from the
/// identity provider.
pub struct TokenIssuer {
    key: EncodingKey,
    header: Header,
}

impl TokenIssuer {
    /// # Errors
    /// Returns `ConfigError` if the configured secret is unusable.
    pub fn from_config(cfg: &AuthNConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self::new(cfg.secret.expose_secret().as_bytes(), cfg.algorithm))
    }

    #[must_use]
    pub fn new(secret: &[u8], algorithm: JwtAlgorithm) -> Self {
        Self {
            key: EncodingKey::from_secret(secret),
            header: Header::new(algorithm.into()),
        }
    }

    /// Issue a token for `subject_id` valid for `ttl` from now.
    ///
    /// # Errors
    /// Returns the encoder error; HMAC signing only fails on serialization.
    pub fn issue(
        &self,
        subject_id: i64,
        role: Role,
        ttl: Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims::new(subject_id, role, now.timestamp(), (now + ttl).timestamp());
        self.sign(&claims)
    }

    /// Sign arbitrary claims.
    ///
    /// # Errors
    /// Returns the encoder error.
    pub fn sign(&self, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
        encode(&self.header, claims, &self.key)
    }
}
