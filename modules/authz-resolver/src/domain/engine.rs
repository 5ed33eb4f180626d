//! The authorization policy.
//!
//! | principal | resource | outcome            |
//! |-----------|----------|--------------------|
//! | absent    | any      | `DenyUnauthorized` |
//! | present   | absent   | `DenyNotFound`     |
//! | admin     | present  | `Allow`            |
//! | owner     | present  | `Allow`            |
//! | other     | present  | `DenyNotFound`     |

use ownergate_security::{OwnedResource, Principal};

use crate::models::{AccessBasis, AuthorizationDecision};

/// Decide whether `principal` may reach `resource`.
///
/// Pure and deterministic. The same inputs always produce the same decision.
#[must_use]
pub fn decide(
    principal: Option<&Principal>,
    resource: Option<&OwnedResource>,
) -> AuthorizationDecision {
    let Some(principal) = principal else {
        return AuthorizationDecision::DenyUnauthorized;
    };
    let Some(resource) = resource else {
        return AuthorizationDecision::DenyNotFound;
    };

    let basis = if principal.is_admin() {
        AccessBasis::AdminOverride
    } else if principal.owns(resource) {
        AccessBasis::Owner
    } else {
        return AuthorizationDecision::DenyNotFound;
    };

    AuthorizationDecision::Allow {
        principal: *principal,
        resource: *resource,
        basis,
    }
}

/// Gate for operations that need an identity but no existing resource, such
/// as creating or listing one's own resources.
///
/// # Errors
/// Returns `DenyUnauthorized` when no principal is present.
pub fn require_identity(
    principal: Option<&Principal>,
) -> Result<&Principal, AuthorizationDecision> {
    principal.ok_or(AuthorizationDecision::DenyUnauthorized)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    const ALICE: i64 = 1;
    const BOB: i64 = 2;

    #[test]
    fn owner_is_allowed() {
        let alice = Principal::standard(ALICE);
        let doc = OwnedResource::new(10, ALICE);

        assert_eq!(
            decide(Some(&alice), Some(&doc)),
            AuthorizationDecision::Allow {
                principal: alice,
                resource: doc,
                basis: AccessBasis::Owner,
            }
        );
    }

    #[test]
    fn stranger_gets_not_found() {
        let bob = Principal::standard(BOB);
        let doc = OwnedResource::new(10, ALICE);

        assert_eq!(
            decide(Some(&bob), Some(&doc)),
            AuthorizationDecision::DenyNotFound
        );
    }

    #[test]
    fn missing_resource_and_foreign_resource_are_indistinguishable() {
        let bob = Principal::standard(BOB);
        let foreign = decide(Some(&bob), Some(&OwnedResource::new(10, ALICE)));
        let missing = decide(Some(&bob), None);

        assert_eq!(foreign, missing);
    }

    #[test]
    fn admin_overrides_ownership() {
        let admin = Principal::admin(99);
        let doc = OwnedResource::new(10, ALICE);

        assert!(matches!(
            decide(Some(&admin), Some(&doc)),
            AuthorizationDecision::Allow {
                basis: AccessBasis::AdminOverride,
                ..
            }
        ));
    }

    #[test]
    fn admin_still_gets_not_found_for_missing_resource() {
        assert_eq!(
            decide(Some(&Principal::admin(99)), None),
            AuthorizationDecision::DenyNotFound
        );
    }

    #[test]
    fn anonymous_is_unauthorized_even_for_missing_resource() {
        assert_eq!(
            decide(None, Some(&OwnedResource::new(10, ALICE))),
            AuthorizationDecision::DenyUnauthorized
        );
        assert_eq!(decide(None, None), AuthorizationDecision::DenyUnauthorized);
    }

    #[test]
    fn require_identity_passes_principal_through() {
        let alice = Principal::standard(ALICE);
        assert_eq!(require_identity(Some(&alice)), Ok(&alice));
        assert_eq!(
            require_identity(None),
            Err(AuthorizationDecision::DenyUnauthorized)
        );
    }
}
