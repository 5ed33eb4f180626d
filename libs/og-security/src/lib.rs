#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
pub mod constants;
pub mod context;
pub mod principal;

pub use context::{IdentityContext, IdentityContextBuilder};
pub use principal::{Owned, OwnedResource, Principal, Role, UnknownRole};
