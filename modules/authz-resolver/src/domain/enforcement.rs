//! Reconciliation of engine decisions with row-filtered reads.
//!
//! The engine and the store's row filter check ownership independently.
//! Their verdicts must agree; a disagreement means one layer is broken and
//! is reported as a security anomaly.

use ownergate_security::Owned;
use ownergate_security::constants::SECURITY_LOG_TARGET;

use crate::domain::engine::decide;
use crate::models::{AuthorizationDecision, DenyKind, Enforcement, Inconsistency};

/// Combine the engine's `decision` with the row the filtered store returned.
///
/// A granted row is re-checked against the engine, so a row that does not
/// match the decided resource is never handed out.
#[must_use]
pub fn reconcile<R: Owned>(
    decision: &AuthorizationDecision,
    visible: Option<R>,
) -> Enforcement<R> {
    match (decision, visible) {
        (AuthorizationDecision::Allow { principal, resource, basis }, Some(row)) => {
            let ownership = row.ownership();
            if ownership == *resource && decide(Some(principal), Some(&ownership)).is_allow() {
                Enforcement::Granted(row)
            } else {
                tracing::error!(
                    target: SECURITY_LOG_TARGET,
                    subject_id = principal.subject_id(),
                    resource_id = resource.id,
                    returned_id = ownership.id,
                    ?basis,
                    "store returned a row that does not match the authorized resource"
                );
                Enforcement::Inconsistent(Inconsistency::StoreMorePermissive(DenyKind::NotFound))
            }
        }
        (AuthorizationDecision::Allow { principal, resource, basis }, None) => {
            tracing::error!(
                target: SECURITY_LOG_TARGET,
                subject_id = principal.subject_id(),
                resource_id = resource.id,
                ?basis,
                "engine allowed a resource the row filter withheld"
            );
            Enforcement::Inconsistent(Inconsistency::StoreMoreRestrictive)
        }
        (denied, Some(row)) => {
            let kind = denied.deny_kind().unwrap_or(DenyKind::NotFound);
            tracing::error!(
                target: SECURITY_LOG_TARGET,
                resource_id = row.ownership().id,
                ?kind,
                "row filter exposed a resource the engine denied"
            );
            Enforcement::Inconsistent(Inconsistency::StoreMorePermissive(kind))
        }
        (denied, None) => Enforcement::Denied(denied.deny_kind().unwrap_or(DenyKind::NotFound)),
    }
}
