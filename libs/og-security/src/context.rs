use secrecy::SecretString;

use crate::principal::{Principal, Role};

/// `IdentityContext` carries the resolved identity of one request.
///
/// Built by the identity resolver in the authentication middleware and passed
/// by reference through the request lifecycle. It is immutable once built:
/// there are no setters, only the builder.
#[derive(Debug, Clone, Default)]
pub struct IdentityContext {
    /// Verified principal, absent for anonymous requests.
    principal: Option<Principal>,
    /// Original bearer token. Wrapped in `SecretString` so `Debug` redacts it.
    bearer_token: Option<SecretString>,
}

impl IdentityContext {
    #[must_use]
    pub fn builder() -> IdentityContextBuilder {
        IdentityContextBuilder::default()
    }

    /// Context for a request that presented no credential at all.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Context for an already verified principal.
    #[must_use]
    pub fn authenticated(principal: Principal) -> Self {
        Self::builder().principal(principal).build()
    }

    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    #[must_use]
    pub fn subject_id(&self) -> Option<i64> {
        self.principal.map(|p| p.subject_id())
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.principal.map(|p| p.role())
    }

    #[must_use]
    pub fn bearer_token(&self) -> Option<&SecretString> {
        self.bearer_token.as_ref()
    }
}

#[derive(Default)]
pub struct IdentityContextBuilder {
    principal: Option<Principal>,
    bearer_token: Option<SecretString>,
}

impl IdentityContextBuilder {
    #[must_use]
    pub fn principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    #[must_use]
    pub fn bearer_token(mut self, token: impl Into<SecretString>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn build(self) -> IdentityContext {
        IdentityContext {
            principal: self.principal,
            bearer_token: self.bearer_token,
        }
    }
}
