//! In-memory document store.
//!
//! Emulates the Postgres row filter from the session values bound on a
//! `MemoryConnection`, so the dual-enforcement path can be exercised without a
//! database. The filter mode can be switched to simulate a store that filters
//! nothing or withholds everything.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use ownergate_db::{MemoryConnection, SessionKeys};
use ownergate_security::{OwnedResource, Role};
use parking_lot::Mutex;

use super::StoreError;
use crate::domain::models::{Document, DocumentPatch, NewDocument};
use crate::domain::repo::DocumentStore;

/// How the emulated row filter behaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowFilter {
    /// Owner or admin, from the bound session values.
    #[default]
    Enforced,
    /// Every row is visible, as for a role that bypasses row security.
    Disabled,
    /// No row is visible.
    WithholdAll,
}

#[derive(Debug)]
struct Inner {
    rows: BTreeMap<i64, Document>,
    next_id: i64,
    filter: RowFilter,
}

#[derive(Debug, Clone)]
pub struct MemoryDocumentStore {
    inner: Arc<Mutex<Inner>>,
    keys: SessionKeys,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_keys(SessionKeys::default())
    }

    #[must_use]
    pub fn with_keys(keys: SessionKeys) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                rows: BTreeMap::new(),
                next_id: 1,
                filter: RowFilter::default(),
            })),
            keys,
        }
    }

    pub fn set_filter(&self, filter: RowFilter) {
        self.inner.lock().filter = filter;
    }

    /// Insert a row directly, without any filter. For fixtures.
    #[must_use]
    pub fn seed(&self, owner_id: i64, title: &str, content: &str) -> Document {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        let doc = Document {
            id,
            owner_id,
            title: title.to_owned(),
            content: content.to_owned(),
            created_at: Utc::now(),
            updated_at: None,
        };
        inner.rows.insert(id, doc.clone());
        doc
    }

    /// Read a row without any filter.
    #[must_use]
    pub fn peek(&self, id: i64) -> Option<Document> {
        self.inner.lock().rows.get(&id).cloned()
    }

    /// Delete a row without any filter, as another session would.
    #[must_use]
    pub fn remove(&self, id: i64) -> Option<Document> {
        self.inner.lock().rows.remove(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn viewer(&self, conn: &MemoryConnection) -> Viewer {
        let subject_id = conn
            .current_value(self.keys.user_id())
            .and_then(|v| v.parse::<i64>().ok());
        let is_admin = conn
            .current_value(self.keys.user_role())
            .is_some_and(|r| r == Role::Admin.as_str());
        Viewer {
            subject_id,
            is_admin,
        }
    }
}

struct Viewer {
    subject_id: Option<i64>,
    is_admin: bool,
}

impl Viewer {
    fn sees(&self, filter: RowFilter, owner_id: i64) -> bool {
        match filter {
            RowFilter::Enforced => self.is_admin || self.subject_id == Some(owner_id),
            RowFilter::Disabled => true,
            RowFilter::WithholdAll => false,
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    type Connection = MemoryConnection;

    async fn owner_of(
        &self,
        _conn: &mut MemoryConnection,
        id: i64,
    ) -> Result<Option<OwnedResource>, StoreError> {
        Ok(self
            .inner
            .lock()
            .rows
            .get(&id)
            .map(|d| OwnedResource::new(d.id, d.owner_id)))
    }

    async fn fetch(
        &self,
        conn: &mut MemoryConnection,
        id: i64,
    ) -> Result<Option<Document>, StoreError> {
        let viewer = self.viewer(conn);
        let inner = self.inner.lock();
        Ok(inner
            .rows
            .get(&id)
            .filter(|d| viewer.sees(inner.filter, d.owner_id))
            .cloned())
    }

    async fn list_owned(
        &self,
        conn: &mut MemoryConnection,
        owner_id: i64,
    ) -> Result<Vec<Document>, StoreError> {
        let viewer = self.viewer(conn);
        let inner = self.inner.lock();
        Ok(inner
            .rows
            .values()
            .filter(|d| d.owner_id == owner_id && viewer.sees(inner.filter, d.owner_id))
            .cloned()
            .collect())
    }

    async fn insert(
        &self,
        conn: &mut MemoryConnection,
        owner_id: i64,
        new: &NewDocument,
    ) -> Result<Document, StoreError> {
        let viewer = self.viewer(conn);
        let mut inner = self.inner.lock();
        if !viewer.sees(inner.filter, owner_id) {
            return Err(StoreError::PolicyViolation);
        }
        let id = inner.next_id;
        inner.next_id += 1;
        let doc = Document {
            id,
            owner_id,
            title: new.title.clone(),
            content: new.content.clone(),
            created_at: Utc::now(),
            updated_at: None,
        };
        inner.rows.insert(id, doc.clone());
        Ok(doc)
    }

    async fn update(
        &self,
        conn: &mut MemoryConnection,
        id: i64,
        patch: &DocumentPatch,
    ) -> Result<Option<Document>, StoreError> {
        let viewer = self.viewer(conn);
        let mut inner = self.inner.lock();
        let filter = inner.filter;
        let Some(doc) = inner
            .rows
            .get_mut(&id)
            .filter(|d| viewer.sees(filter, d.owner_id))
        else {
            return Ok(None);
        };
        if let Some(title) = &patch.title {
            doc.title.clone_from(title);
        }
        if let Some(content) = &patch.content {
            doc.content.clone_from(content);
        }
        doc.updated_at = Some(Utc::now());
        Ok(Some(doc.clone()))
    }

    async fn delete(
        &self,
        conn: &mut MemoryConnection,
        id: i64,
    ) -> Result<Option<OwnedResource>, StoreError> {
        let viewer = self.viewer(conn);
        let mut inner = self.inner.lock();
        let visible = inner
            .rows
            .get(&id)
            .is_some_and(|d| viewer.sees(inner.filter, d.owner_id));
        if !visible {
            return Ok(None);
        }
        Ok(inner
            .rows
            .remove(&id)
            .map(|d| OwnedResource::new(d.id, d.owner_id)))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use ownergate_db::{ConnectionPool, MemoryPool, SessionConnection};

    use super::*;

    async fn bound(pool: &MemoryPool, subject: &str, role: &str) -> MemoryConnection {
        let mut conn = pool.checkout().await.unwrap();
        conn.set_session_value("app.user_id", subject).await.unwrap();
        conn.set_session_value("app.user_role", role).await.unwrap();
        conn
    }

    #[tokio::test]
    async fn filter_follows_bound_identity() {
        let store = MemoryDocumentStore::new();
        let doc = store.seed(1, "alice's", "secret");
        let pool = MemoryPool::new(3);

        let mut alice = bound(&pool, "1", "standard").await;
        let mut bob = bound(&pool, "2", "standard").await;
        let mut admin = bound(&pool, "9", "admin").await;

        assert!(store.fetch(&mut alice, doc.id).await.unwrap().is_some());
        assert!(store.fetch(&mut bob, doc.id).await.unwrap().is_none());
        assert!(store.fetch(&mut admin, doc.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unbound_connection_sees_nothing() {
        let store = MemoryDocumentStore::new();
        let doc = store.seed(1, "t", "c");
        let pool = MemoryPool::new(1);
        let mut conn = pool.checkout().await.unwrap();

        assert!(store.fetch(&mut conn, doc.id).await.unwrap().is_none());
        assert_eq!(
            store.owner_of(&mut conn, doc.id).await.unwrap(),
            Some(OwnedResource::new(doc.id, 1))
        );
    }

    #[tokio::test]
    async fn insert_for_someone_else_violates_policy() {
        let store = MemoryDocumentStore::new();
        let pool = MemoryPool::new(1);
        let mut bob = bound(&pool, "2", "standard").await;
        let new = NewDocument {
            title: "t".to_owned(),
            content: "c".to_owned(),
        };

        assert!(matches!(
            store.insert(&mut bob, 1, &new).await,
            Err(StoreError::PolicyViolation)
        ));
        assert!(store.insert(&mut bob, 2, &new).await.is_ok());
    }

    #[tokio::test]
    async fn hidden_rows_are_not_updated_or_deleted() {
        let store = MemoryDocumentStore::new();
        let doc = store.seed(1, "t", "c");
        let pool = MemoryPool::new(1);
        let mut bob = bound(&pool, "2", "standard").await;

        let patch = DocumentPatch {
            title: Some("owned".to_owned()),
            content: None,
        };
        assert!(store.update(&mut bob, doc.id, &patch).await.unwrap().is_none());
        assert!(store.delete(&mut bob, doc.id).await.unwrap().is_none());
        assert_eq!(store.peek(doc.id), Some(doc));
    }
}
