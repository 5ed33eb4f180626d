#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Connection-scoped identity propagation over pooled connections.
//!
//! `SessionPropagator` is the only component that writes session parameters.
//! Everything that touches the database on behalf of a principal goes through
//! `with_bound_session`, which guarantees the connection is cleared before it
//! can serve anyone else.

pub mod config;
pub mod error;
pub mod keys;
pub mod memory;
pub mod pg;
pub mod pool;
pub mod session;

pub use config::DatabaseConfig;
pub use error::SessionError;
pub use keys::SessionKeys;
pub use memory::{MemoryConnection, MemoryPool, MemoryPoolStats, SessionFault};
pub use pg::PgSessionPool;
pub use pool::{ConnectionPool, SessionConnection};
pub use session::{SessionBinding, SessionFuture, SessionPropagator};

pub(crate) use ownergate_security::constants::SECURITY_LOG_TARGET as SECURITY_TARGET;
