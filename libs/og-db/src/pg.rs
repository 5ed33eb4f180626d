//! Postgres backend for session propagation.
//!
//! Session values are custom configuration parameters set with
//! `set_config(key, value, false)`, i.e. scoped to the connection rather than
//! to a transaction, which is what the row-level security policy reads via
//! `current_setting(key, true)`.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::Connection as _;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Postgres;

use crate::SECURITY_TARGET;
use crate::config::DatabaseConfig;
use crate::error::SessionError;
use crate::keys::SessionKeys;
use crate::pool::{ConnectionPool, SessionConnection};

/// `sqlx` pool adapted to `ConnectionPool`.
#[derive(Clone, Debug)]
pub struct PgSessionPool {
    pool: PgPool,
}

impl PgSessionPool {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool with a checkout hook that refuses any connection still
    /// carrying an identity in `keys.user_id()`.
    ///
    /// # Errors
    /// Returns the `sqlx` error when the initial connection fails.
    pub async fn connect(cfg: &DatabaseConfig, keys: &SessionKeys) -> Result<Self, sqlx::Error> {
        let user_key = keys.user_id().to_owned();

        let pool = PgPoolOptions::new()
            .max_connections(cfg.max_conns)
            .min_connections(cfg.min_conns)
            .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs))
            .before_acquire(move |conn, _meta| {
                let key = user_key.clone();
                Box::pin(async move {
                    let value: Option<String> =
                        sqlx::query_scalar("SELECT current_setting($1, true)")
                            .bind(&key)
                            .fetch_one(&mut *conn)
                            .await?;
                    let clean = value.is_none_or(|v| v.is_empty());
                    if !clean {
                        tracing::error!(
                            target: SECURITY_TARGET,
                            key = %key,
                            "pooled connection carries a stale binding, closing it"
                        );
                    }
                    Ok(clean)
                })
            })
            .connect(cfg.url.expose_secret())
            .await?;

        Ok(Self { pool })
    }

    #[must_use]
    pub fn inner(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SessionConnection for PoolConnection<Postgres> {
    async fn set_session_value(&mut self, key: &str, value: &str) -> Result<(), SessionError> {
        sqlx::query("SELECT set_config($1, $2, false)")
            .bind(key)
            .bind(value)
            .execute(&mut **self)
            .await
            .map_err(|e| SessionError::bind(key, e))?;
        Ok(())
    }

    async fn clear_session_value(&mut self, key: &str) -> Result<(), SessionError> {
        sqlx::query("SELECT set_config($1, '', false)")
            .bind(key)
            .execute(&mut **self)
            .await
            .map_err(|e| SessionError::clear(key, e))?;
        Ok(())
    }

    async fn session_value(&mut self, key: &str) -> Result<Option<String>, SessionError> {
        let value: Option<String> = sqlx::query_scalar("SELECT current_setting($1, true)")
            .bind(key)
            .fetch_one(&mut **self)
            .await
            .map_err(|e| SessionError::read(key, e))?;
        Ok(value.filter(|v| !v.is_empty()))
    }
}

#[async_trait]
impl ConnectionPool for PgSessionPool {
    type Connection = PoolConnection<Postgres>;

    async fn checkout(&self) -> Result<Self::Connection, SessionError> {
        self.pool
            .acquire()
            .await
            .map_err(|e| SessionError::Checkout(e.to_string()))
    }

    fn release(&self, conn: Self::Connection) {
        drop(conn);
    }

    fn discard(&self, conn: Self::Connection) {
        let raw = conn.detach();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = raw.close().await {
                        tracing::debug!(error = %e, "closing discarded connection failed");
                    }
                });
            }
            Err(_) => drop(raw),
        }
    }
}
