//! Decision and enforcement outcomes.

use ownergate_security::{OwnedResource, Principal};
use serde::Serialize;

/// Why an `Allow` was granted. Logged, never returned to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessBasis {
    Owner,
    AdminOverride,
}

/// Outcome of one authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AuthorizationDecision {
    Allow {
        principal: Principal,
        resource: OwnedResource,
        basis: AccessBasis,
    },
    /// The resource is absent, or exists but belongs to someone else.
    DenyNotFound,
    /// No verified identity was presented.
    DenyUnauthorized,
}

impl AuthorizationDecision {
    #[must_use]
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow { .. })
    }

    /// The denial kind, or `None` for `Allow`.
    #[must_use]
    pub fn deny_kind(&self) -> Option<DenyKind> {
        match self {
            Self::Allow { .. } => None,
            Self::DenyNotFound => Some(DenyKind::NotFound),
            Self::DenyUnauthorized => Some(DenyKind::Unauthorized),
        }
    }
}

/// Client-visible class of a denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyKind {
    NotFound,
    Unauthorized,
}

/// How the engine and the row filter disagreed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inconsistency {
    /// The store returned a row the engine refused. The request is denied
    /// with the engine's outcome, so the response stays the unified one.
    StoreMorePermissive(DenyKind),
    /// The engine allowed a row the store did not return. Nothing safe can
    /// be answered; the request fails.
    StoreMoreRestrictive,
}

/// Combined verdict of the engine and the store for one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enforcement<R> {
    Granted(R),
    Denied(DenyKind),
    Inconsistent(Inconsistency),
}
