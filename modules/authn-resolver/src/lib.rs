//! `AuthN` Resolver
//!
//! Verifies bearer credentials and turns them into an `IdentityContext`.
//! Verification is pure (`CredentialVerifier`); the optional directory check
//! is the only I/O on the authentication path.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod config;
pub mod domain;
pub mod jwt;
pub mod models;

pub use api::{CredentialVerifier, VerificationError};
pub use config::{AuthNConfig, ConfigError, JwtAlgorithm};
pub use domain::bearer::parse_bearer;
pub use domain::directory::{PgPrincipalDirectory, PrincipalDirectory, StaticDirectory};
pub use domain::error::{AuthNError, RejectReason};
pub use domain::service::IdentityResolver;
pub use jwt::{JwtVerifier, TokenIssuer};
pub use models::Claims;
