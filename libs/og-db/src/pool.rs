//! Boundary traits for the storage collaborator.
//!
//! The propagator needs two things from storage: a pool that hands out and
//! takes back connections, and connections that can hold named session
//! parameters. Postgres and the in-memory test pool both implement these.

use async_trait::async_trait;

use crate::error::SessionError;

/// A connection able to carry connection-scoped session parameters.
#[async_trait]
pub trait SessionConnection: Send + 'static {
    /// Set `key` to `value` for the remaining lifetime of this connection.
    ///
    /// # Errors
    /// `SessionError::Bind` if the parameter could not be written.
    async fn set_session_value(&mut self, key: &str, value: &str) -> Result<(), SessionError>;

    /// Reset `key` so that the row filter sees no identity.
    ///
    /// # Errors
    /// `SessionError::Clear` if the parameter could not be reset.
    async fn clear_session_value(&mut self, key: &str) -> Result<(), SessionError>;

    /// Read `key` back from this connection. Empty values read as `None`.
    ///
    /// # Errors
    /// `SessionError::Read` if the parameter could not be read.
    async fn session_value(&mut self, key: &str) -> Result<Option<String>, SessionError>;
}

/// A bounded set of reusable connections.
///
/// `release` returns a connection for reuse by later requests; `discard`
/// closes it instead. Callers decide which one applies: a connection whose
/// session state is unknown must be discarded.
#[async_trait]
pub trait ConnectionPool: Send + Sync + 'static {
    type Connection: SessionConnection;

    /// Check out a connection, waiting until one is available.
    ///
    /// # Errors
    /// `SessionError::Checkout` if the pool is closed or timed out.
    async fn checkout(&self) -> Result<Self::Connection, SessionError>;

    fn release(&self, conn: Self::Connection);

    fn discard(&self, conn: Self::Connection);
}
