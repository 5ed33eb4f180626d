use async_trait::async_trait;
use ownergate_db::SessionConnection;
use ownergate_security::OwnedResource;

use crate::domain::models::{Document, DocumentPatch, NewDocument};
use crate::infra::storage::StoreError;

/// Storage for documents.
///
/// Every method runs on the connection it is given, which for requests made
/// on behalf of a principal is the connection bound by the session
/// propagator. Except for `owner_of`, implementations apply the row filter:
/// only rows owned by the bound subject, or every row for a bound admin.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    type Connection: SessionConnection;

    /// Ownership facts for `id`, bypassing the row filter. Never returns
    /// document contents.
    async fn owner_of(
        &self,
        conn: &mut Self::Connection,
        id: i64,
    ) -> Result<Option<OwnedResource>, StoreError>;

    async fn fetch(&self, conn: &mut Self::Connection, id: i64)
    -> Result<Option<Document>, StoreError>;

    async fn list_owned(
        &self,
        conn: &mut Self::Connection,
        owner_id: i64,
    ) -> Result<Vec<Document>, StoreError>;

    async fn insert(
        &self,
        conn: &mut Self::Connection,
        owner_id: i64,
        new: &NewDocument,
    ) -> Result<Document, StoreError>;

    /// Returns `None` when no visible row was updated.
    async fn update(
        &self,
        conn: &mut Self::Connection,
        id: i64,
        patch: &DocumentPatch,
    ) -> Result<Option<Document>, StoreError>;

    /// Returns the ownership of the deleted row, `None` when no visible row
    /// was deleted.
    async fn delete(
        &self,
        conn: &mut Self::Connection,
        id: i64,
    ) -> Result<Option<OwnedResource>, StoreError>;
}
