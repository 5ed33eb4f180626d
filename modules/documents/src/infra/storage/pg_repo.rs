use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ownergate_security::OwnedResource;
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};

use super::StoreError;
use crate::domain::models::{Document, DocumentPatch, NewDocument};
use crate::domain::repo::DocumentStore;

const COLUMNS: &str = "id, owner_id, title, content, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: i64,
    owner_id: i64,
    title: String,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<DocumentRow> for Document {
    fn from(r: DocumentRow) -> Self {
        Self {
            id: r.id,
            owner_id: r.owner_id,
            title: r.title,
            content: r.content,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Postgres document store. Filtering is done by the
/// `documents_owner_or_admin` policy from the session parameters bound on the
/// connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgDocumentStore;

impl PgDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Whether the row filter actually applies to the role this pool
    /// connects as. It does not for superusers, roles with `BYPASSRLS`, or the
    /// table owner unless the table forces row security.
    ///
    /// # Errors
    /// `StoreError::Query` if the catalog cannot be read.
    pub async fn row_filter_active(pool: &PgPool) -> Result<bool, StoreError> {
        let active: Option<bool> = sqlx::query_scalar(
            "SELECT c.relrowsecurity \
                    AND NOT (r.rolsuper OR r.rolbypassrls) \
                    AND (c.relforcerowsecurity OR c.relowner <> r.oid) \
             FROM pg_class c, pg_roles r \
             WHERE c.oid = 'documents'::regclass AND r.rolname = current_user",
        )
        .fetch_optional(pool)
        .await?;
        Ok(active.unwrap_or(false))
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    type Connection = PoolConnection<Postgres>;

    async fn owner_of(
        &self,
        conn: &mut Self::Connection,
        id: i64,
    ) -> Result<Option<OwnedResource>, StoreError> {
        let owner: Option<i64> = sqlx::query_scalar("SELECT document_owner($1)")
            .bind(id)
            .fetch_one(&mut **conn)
            .await?;
        Ok(owner.map(|owner_id| OwnedResource::new(id, owner_id)))
    }

    async fn fetch(
        &self,
        conn: &mut Self::Connection,
        id: i64,
    ) -> Result<Option<Document>, StoreError> {
        let row: Option<DocumentRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM documents WHERE id = $1"))
                .bind(id)
                .fetch_optional(&mut **conn)
                .await?;
        Ok(row.map(Into::into))
    }

    async fn list_owned(
        &self,
        conn: &mut Self::Connection,
        owner_id: i64,
    ) -> Result<Vec<Document>, StoreError> {
        let rows: Vec<DocumentRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM documents WHERE owner_id = $1 ORDER BY id"
        ))
        .bind(owner_id)
        .fetch_all(&mut **conn)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert(
        &self,
        conn: &mut Self::Connection,
        owner_id: i64,
        new: &NewDocument,
    ) -> Result<Document, StoreError> {
        let row: DocumentRow = sqlx::query_as(&format!(
            "INSERT INTO documents (owner_id, title, content) VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        ))
        .bind(owner_id)
        .bind(&new.title)
        .bind(&new.content)
        .fetch_one(&mut **conn)
        .await?;
        Ok(row.into())
    }

    async fn update(
        &self,
        conn: &mut Self::Connection,
        id: i64,
        patch: &DocumentPatch,
    ) -> Result<Option<Document>, StoreError> {
        let row: Option<DocumentRow> = sqlx::query_as(&format!(
            "UPDATE documents \
             SET title = COALESCE($2, title), content = COALESCE($3, content), updated_at = now() \
             WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(patch.title.as_deref())
        .bind(patch.content.as_deref())
        .fetch_optional(&mut **conn)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn delete(
        &self,
        conn: &mut Self::Connection,
        id: i64,
    ) -> Result<Option<OwnedResource>, StoreError> {
        let deleted: Option<(i64, i64)> =
            sqlx::query_as("DELETE FROM documents WHERE id = $1 RETURNING id, owner_id")
                .bind(id)
                .fetch_optional(&mut **conn)
                .await?;
        Ok(deleted.map(|(id, owner_id)| OwnedResource::new(id, owner_id)))
    }
}
