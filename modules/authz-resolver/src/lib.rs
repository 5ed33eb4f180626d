//! `AuthZ` Resolver
//!
//! Pure authorization decisions over `(principal, resource)` pairs, and the
//! reconciliation of those decisions with what the row-filtered store
//! actually returned.
//!
//! Denials for missing resources and for resources owned by someone else are
//! the same value, `DenyNotFound`, so callers cannot tell them apart and
//! neither can clients.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod domain;
pub mod models;

pub use domain::engine::{decide, require_identity};
pub use domain::enforcement::reconcile;
pub use models::{AccessBasis, AuthorizationDecision, DenyKind, Enforcement, Inconsistency};
