//! Session context propagation.
//!
//! Binds the identity of the current principal to the exact pooled connection
//! that will run the request's queries, and clears it again before that
//! connection can be handed to anyone else.
//!
//! The sequence is structural rather than conventional:
//!
//! ```text
//! checkout -> bind -> verify -> body(&mut binding) -> clear -> release
//! ```
//!
//! `SessionBinding` owns the connection for the whole sequence. If the request
//! future is dropped half way (client disconnect, timeout, abort), the
//! binding's `Drop` hands the connection to a cleanup task that clears it
//! before release, or closes it when clearing is impossible.
//!
//! # Example
//!
//! ```ignore
//! let doc = propagator
//!     .with_bound_session(&principal, move |session| {
//!         Box::pin(async move {
//!             let conn = session.connection()?;
//!             store.fetch(conn, id).await
//!         })
//!     })
//!     .await?;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use ownergate_security::Principal;
use tracing::instrument;

use crate::SECURITY_TARGET;
use crate::error::SessionError;
use crate::keys::SessionKeys;
use crate::pool::{ConnectionPool, SessionConnection};

/// Boxed future returned by session bodies.
pub type SessionFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Runs request bodies on pooled connections with a guaranteed
/// acquire/bind/clear/release discipline.
pub struct SessionPropagator<P: ConnectionPool> {
    pool: Arc<P>,
    keys: SessionKeys,
}

impl<P: ConnectionPool> Clone for SessionPropagator<P> {
    fn clone(&self) -> Self {
        Self {
            pool: Arc::clone(&self.pool),
            keys: self.keys.clone(),
        }
    }
}

impl<P: ConnectionPool> SessionPropagator<P> {
    #[must_use]
    pub fn new(pool: Arc<P>) -> Self {
        Self::with_keys(pool, SessionKeys::default())
    }

    #[must_use]
    pub fn with_keys(pool: Arc<P>, keys: SessionKeys) -> Self {
        Self { pool, keys }
    }

    #[must_use]
    pub fn pool(&self) -> &Arc<P> {
        &self.pool
    }

    #[must_use]
    pub fn keys(&self) -> &SessionKeys {
        &self.keys
    }

    /// Run `body` on a connection bound to `principal`.
    ///
    /// The connection passed to `body` is the one that was bound and verified;
    /// it is cleared before it goes back to the pool on every exit path.
    ///
    /// # Errors
    /// Returns the body's error, or a `SessionError` (converted into `E`) when
    /// checkout, binding, verification or clearing fails. A clearing failure
    /// wins over the body's result: the request must not succeed when the
    /// connection could not be restored.
    #[instrument(level = "debug", skip_all, fields(subject_id = principal.subject_id()))]
    pub async fn with_bound_session<T, E, F>(&self, principal: &Principal, body: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<SessionError> + Send + 'static,
        F: for<'b> FnOnce(&'b mut SessionBinding<P>) -> SessionFuture<'b, Result<T, E>> + Send,
    {
        let conn = self.pool.checkout().await?;
        let mut binding = SessionBinding::new(Arc::clone(&self.pool), self.keys.clone(), conn);

        if let Err(err) = binding.bind(principal).await {
            tracing::error!(target: SECURITY_TARGET, error = %err, "session binding failed, discarding connection");
            binding.discard();
            return Err(err.into());
        }

        let outcome = body(&mut binding).await;
        binding.finish().await?;
        outcome
    }

    /// Run `body` on a connection without binding any identity to it.
    ///
    /// Used when storage-side row filtering is turned off; the application
    /// check is then the only enforcement layer.
    ///
    /// # Errors
    /// Returns the body's error, or `SessionError` on checkout failure.
    #[instrument(level = "debug", skip_all)]
    pub async fn with_connection<T, E, F>(&self, body: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<SessionError> + Send + 'static,
        F: for<'b> FnOnce(&'b mut SessionBinding<P>) -> SessionFuture<'b, Result<T, E>> + Send,
    {
        let conn = self.pool.checkout().await?;
        let mut binding = SessionBinding::new(Arc::clone(&self.pool), self.keys.clone(), conn);

        let outcome = body(&mut binding).await;
        binding.finish().await?;
        outcome
    }
}

/// A checked-out connection together with its binding state.
///
/// Invariant: while `bound` is true the connection is never released to the
/// pool. It is either cleared first or discarded.
pub struct SessionBinding<P: ConnectionPool> {
    pool: Arc<P>,
    keys: SessionKeys,
    connection: Option<P::Connection>,
    bound_subject_id: Option<i64>,
    bound: bool,
}

impl<P: ConnectionPool> SessionBinding<P> {
    fn new(pool: Arc<P>, keys: SessionKeys, connection: P::Connection) -> Self {
        Self {
            pool,
            keys,
            connection: Some(connection),
            bound_subject_id: None,
            bound: false,
        }
    }

    /// The connection to run queries on.
    ///
    /// # Errors
    /// `SessionError::Released` once the connection has left this binding.
    pub fn connection(&mut self) -> Result<&mut P::Connection, SessionError> {
        self.connection.as_mut().ok_or(SessionError::Released)
    }

    #[must_use]
    pub fn bound_subject_id(&self) -> Option<i64> {
        self.bound_subject_id
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.bound
    }

    async fn bind(&mut self, principal: &Principal) -> Result<(), SessionError> {
        let subject = principal.subject_id().to_string();
        let keys = &self.keys;
        let conn = self.connection.as_mut().ok_or(SessionError::Released)?;

        if let Some(stale) = conn.session_value(keys.user_id()).await? {
            tracing::error!(
                target: SECURITY_TARGET,
                stale_subject = %stale,
                "checked-out connection was not cleared by its previous user"
            );
            return Err(SessionError::StaleBinding {
                key: keys.user_id().to_owned(),
            });
        }

        // From the first write on, the connection counts as bound: a partial
        // write leaves it in an unknown state.
        self.bound = true;
        self.bound_subject_id = Some(principal.subject_id());

        conn.set_session_value(keys.user_id(), &subject).await?;
        conn.set_session_value(keys.user_role(), principal.role().as_str())
            .await?;

        let observed = conn.session_value(keys.user_id()).await?;
        if observed.as_deref() != Some(subject.as_str()) {
            return Err(SessionError::Mismatch {
                key: keys.user_id().to_owned(),
            });
        }

        tracing::debug!("session bound");
        Ok(())
    }

    async fn finish(mut self) -> Result<(), SessionError> {
        if self.bound {
            let conn = self.connection.as_mut().ok_or(SessionError::Released)?;
            let cleared = clear_all(conn, &self.keys).await;
            if let Err(err) = cleared {
                tracing::error!(target: SECURITY_TARGET, error = %err, "session clear failed, discarding connection");
                self.discard();
                return Err(err);
            }
            self.bound = false;
            self.bound_subject_id = None;
            tracing::debug!("session cleared");
        }

        if let Some(conn) = self.connection.take() {
            self.pool.release(conn);
        }
        Ok(())
    }

    fn discard(&mut self) {
        if let Some(conn) = self.connection.take() {
            self.bound = false;
            self.bound_subject_id = None;
            self.pool.discard(conn);
        }
    }
}

impl<P: ConnectionPool> Drop for SessionBinding<P> {
    fn drop(&mut self) {
        let Some(conn) = self.connection.take() else {
            return;
        };

        if !self.bound {
            self.pool.release(conn);
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                target: SECURITY_TARGET,
                subject_id = ?self.bound_subject_id,
                "bound session dropped outside a runtime, discarding connection"
            );
            self.pool.discard(conn);
            return;
        };

        tracing::warn!(
            target: SECURITY_TARGET,
            subject_id = ?self.bound_subject_id,
            "bound session dropped before completion, clearing in background"
        );

        let pool = Arc::clone(&self.pool);
        let keys = self.keys.clone();
        handle.spawn(async move {
            let mut conn = conn;
            match clear_all(&mut conn, &keys).await {
                Ok(()) => pool.release(conn),
                Err(err) => {
                    tracing::error!(target: SECURITY_TARGET, error = %err, "background session clear failed, discarding connection");
                    pool.discard(conn);
                }
            }
        });
    }
}

async fn clear_all<C: SessionConnection>(
    conn: &mut C,
    keys: &SessionKeys,
) -> Result<(), SessionError> {
    for key in keys.all() {
        conn.clear_session_value(key).await?;
    }
    Ok(())
}
