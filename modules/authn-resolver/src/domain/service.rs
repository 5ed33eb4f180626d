//! Identity resolution for incoming requests.

use std::sync::Arc;

use ownergate_security::IdentityContext;
use tracing::instrument;

use crate::api::{CredentialVerifier, VerificationError};
use crate::domain::bearer::parse_bearer;
use crate::domain::directory::PrincipalDirectory;
use crate::domain::error::{AuthNError, RejectReason};

/// Builds the `IdentityContext` of a request from its `Authorization` header.
///
/// - no header: anonymous context
/// - header with a credential that verifies (and, when a directory is set,
///   names an active account): authenticated context
/// - anything else: `NotAuthenticated`
#[derive(Clone)]
pub struct IdentityResolver {
    verifier: Arc<dyn CredentialVerifier>,
    directory: Option<Arc<dyn PrincipalDirectory>>,
}

impl IdentityResolver {
    #[must_use]
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self {
            verifier,
            directory: None,
        }
    }

    #[must_use]
    pub fn with_directory(mut self, directory: Arc<dyn PrincipalDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// # Errors
    /// `NotAuthenticated` when a credential is presented but does not resolve,
    /// `Internal` when the directory lookup fails.
    #[instrument(level = "debug", skip_all, fields(has_credential = authorization.is_some()))]
    pub async fn resolve(&self, authorization: Option<&str>) -> Result<IdentityContext, AuthNError> {
        let Some(header) = authorization else {
            return Ok(IdentityContext::anonymous());
        };

        let token = parse_bearer(header).inspect_err(log_rejection)?;
        let principal = self.verifier.verify(token).inspect_err(log_rejection)?;

        if let Some(directory) = &self.directory
            && !directory.exists(principal.subject_id()).await?
        {
            tracing::warn!(
                subject_id = principal.subject_id(),
                "valid credential for an unknown or inactive account"
            );
            return Err(AuthNError::NotAuthenticated(RejectReason::UnknownPrincipal));
        }

        tracing::debug!(subject_id = principal.subject_id(), role = %principal.role(), "identity resolved");
        Ok(IdentityContext::builder()
            .principal(principal)
            .bearer_token(token.to_owned())
            .build())
    }
}

fn log_rejection(err: &VerificationError) {
    match err {
        VerificationError::InvalidSignature => {
            tracing::warn!(kind = err.kind(), "credential rejected");
        }
        VerificationError::Expired | VerificationError::Malformed(_) => {
            tracing::debug!(kind = err.kind(), error = %err, "credential rejected");
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use chrono::Duration;
    use ownergate_security::{Principal, Role};
    use secrecy::ExposeSecret;

    use super::*;
    use crate::config::JwtAlgorithm;
    use crate::domain::directory::StaticDirectory;
    use crate::jwt::{JwtVerifier, TokenIssuer};

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn resolver() -> IdentityResolver {
        IdentityResolver::new(Arc::new(JwtVerifier::new(SECRET, JwtAlgorithm::Hs256, 0)))
    }

    fn token(subject: i64, role: Role) -> String {
        TokenIssuer::new(SECRET, JwtAlgorithm::Hs256)
            .issue(subject, role, Duration::minutes(5))
            .unwrap()
    }

    #[tokio::test]
    async fn missing_header_is_anonymous() {
        let ctx = resolver().resolve(None).await.unwrap();
        assert!(!ctx.is_authenticated());
    }

    #[tokio::test]
    async fn valid_bearer_is_authenticated() {
        let raw = token(3, Role::Admin);
        let header = format!("Bearer {raw}");

        let ctx = resolver().resolve(Some(&header)).await.unwrap();

        assert_eq!(ctx.principal(), Some(&Principal::admin(3)));
        assert_eq!(
            ctx.bearer_token().map(ExposeSecret::expose_secret),
            Some(raw.as_str())
        );
    }

    #[tokio::test]
    async fn present_but_invalid_header_is_not_anonymous() {
        for header in ["Basic abc", "Bearer nope", "Bearer "] {
            let res = resolver().resolve(Some(header)).await;
            assert!(
                matches!(res, Err(AuthNError::NotAuthenticated(_))),
                "{header:?}"
            );
        }
    }

    #[tokio::test]
    async fn inactive_account_is_rejected() {
        let resolver = resolver().with_directory(Arc::new(StaticDirectory::new([1])));
        let header = format!("Bearer {}", token(2, Role::Standard));

        let res = resolver.resolve(Some(&header)).await;
        assert!(matches!(
            res,
            Err(AuthNError::NotAuthenticated(RejectReason::UnknownPrincipal))
        ));

        let header = format!("Bearer {}", token(1, Role::Standard));
        assert!(resolver.resolve(Some(&header)).await.is_ok());
    }
}
