#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use documents::{
    Document, DocumentPatch, DocumentStore, DocumentsConfig, DocumentsService, DomainError,
    MemoryDocumentStore, NewDocument, StoreError,
};
use ownergate_db::{MemoryConnection, MemoryPool, SessionPropagator};
use ownergate_security::{IdentityContext, OwnedResource, Principal};
use tokio::sync::Notify;

/// Store whose ownership lookup can be made to hang, so a request can be
/// cancelled after its connection was bound and before any row is read.
#[derive(Clone)]
struct StallingStore {
    inner: MemoryDocumentStore,
    entered: Arc<Notify>,
    stall: Arc<std::sync::atomic::AtomicBool>,
}

impl StallingStore {
    fn new(inner: MemoryDocumentStore) -> Self {
        Self {
            inner,
            entered: Arc::new(Notify::new()),
            stall: Arc::new(std::sync::atomic::AtomicBool::new(true)),
        }
    }
}

#[async_trait]
impl DocumentStore for StallingStore {
    type Connection = MemoryConnection;

    async fn owner_of(
        &self,
        conn: &mut MemoryConnection,
        id: i64,
    ) -> Result<Option<OwnedResource>, StoreError> {
        if self.stall.swap(false, std::sync::atomic::Ordering::SeqCst) {
            self.entered.notify_one();
            std::future::pending::<()>().await;
        }
        self.inner.owner_of(conn, id).await
    }

    async fn fetch(
        &self,
        conn: &mut MemoryConnection,
        id: i64,
    ) -> Result<Option<Document>, StoreError> {
        self.inner.fetch(conn, id).await
    }

    async fn list_owned(
        &self,
        conn: &mut MemoryConnection,
        owner_id: i64,
    ) -> Result<Vec<Document>, StoreError> {
        self.inner.list_owned(conn, owner_id).await
    }

    async fn insert(
        &self,
        conn: &mut MemoryConnection,
        owner_id: i64,
        new: &NewDocument,
    ) -> Result<Document, StoreError> {
        self.inner.insert(conn, owner_id, new).await
    }

    async fn update(
        &self,
        conn: &mut MemoryConnection,
        id: i64,
        patch: &DocumentPatch,
    ) -> Result<Option<Document>, StoreError> {
        self.inner.update(conn, id, patch).await
    }

    async fn delete(
        &self,
        conn: &mut MemoryConnection,
        id: i64,
    ) -> Result<Option<OwnedResource>, StoreError> {
        self.inner.delete(conn, id).await
    }
}

async fn wait_for_idle(pool: &MemoryPool) {
    for _ in 0..100 {
        if pool.idle() == 1 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("connection never came back to the pool");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelled_request_leaves_no_identity_behind() {
    let pool = Arc::new(MemoryPool::new(1));
    let memory = MemoryDocumentStore::new();
    let doc = memory.seed(1, "admin only", "secret");
    let store = StallingStore::new(memory);
    let service = Arc::new(DocumentsService::new(
        SessionPropagator::new(Arc::clone(&pool)),
        Arc::new(store.clone()),
        DocumentsConfig::default(),
    ));

    // An admin request is bound, then cancelled mid-flight.
    let admin = Arc::clone(&service);
    let task = tokio::spawn(async move {
        admin
            .get_document(&IdentityContext::authenticated(Principal::admin(9)), doc.id)
            .await
    });
    store.entered.notified().await;
    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    wait_for_idle(&pool).await;
    for (_, values) in pool.idle_sessions() {
        assert!(values.is_empty(), "{values:?}");
    }
    assert_eq!(pool.stats().leaked_releases, 0);

    // The same connection now serves a standard user, who must not inherit
    // the admin's view.
    let res = service
        .get_document(&IdentityContext::authenticated(Principal::standard(2)), doc.id)
        .await;
    assert!(matches!(res, Err(DomainError::NotFound)));
    assert_eq!(pool.stats().opened, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn request_dropped_by_timeout_is_cleaned_up() {
    let pool = Arc::new(MemoryPool::new(1));
    let memory = MemoryDocumentStore::new();
    let doc = memory.seed(1, "alice's", "secret");
    let store = StallingStore::new(memory);
    let service = DocumentsService::new(
        SessionPropagator::new(Arc::clone(&pool)),
        Arc::new(store),
        DocumentsConfig::default(),
    );

    let alice = IdentityContext::authenticated(Principal::standard(1));
    let timed_out = tokio::time::timeout(
        Duration::from_millis(50),
        service.get_document(&alice, doc.id),
    )
    .await;
    assert!(timed_out.is_err());

    wait_for_idle(&pool).await;
    let bob = IdentityContext::authenticated(Principal::standard(2));
    assert!(matches!(
        service.get_document(&bob, doc.id).await,
        Err(DomainError::NotFound)
    ));
    assert!(service.get_document(&alice, doc.id).await.is_ok());
    assert_eq!(pool.stats().leaked_releases, 0);
}
