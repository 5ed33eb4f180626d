//! Account existence checks.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::error::AuthNError;

/// Answers whether a verified subject still names an active account.
#[async_trait]
pub trait PrincipalDirectory: Send + Sync {
    /// # Errors
    /// `AuthNError::Internal` if the directory cannot be queried.
    async fn exists(&self, subject_id: i64) -> Result<bool, AuthNError>;
}

/// Fixed set of active subject ids.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    active: HashSet<i64>,
}

impl StaticDirectory {
    #[must_use]
    pub fn new(active: impl IntoIterator<Item = i64>) -> Self {
        Self {
            active: active.into_iter().collect(),
        }
    }
}

#[async_trait]
impl PrincipalDirectory for StaticDirectory {
    async fn exists(&self, subject_id: i64) -> Result<bool, AuthNError> {
        Ok(self.active.contains(&subject_id))
    }
}

/// Looks subjects up in the `users` table.
#[derive(Debug, Clone)]
pub struct PgPrincipalDirectory {
    pool: PgPool,
}

impl PgPrincipalDirectory {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PrincipalDirectory for PgPrincipalDirectory {
    async fn exists(&self, subject_id: i64) -> Result<bool, AuthNError> {
        let found: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1 AND is_active)")
                .bind(subject_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(found)
    }
}
