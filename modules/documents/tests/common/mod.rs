//! Shared fixtures: the full router over the in-memory pool and store.
#![allow(dead_code)]

use std::sync::Arc;

use authn_resolver::{IdentityResolver, JwtAlgorithm, JwtVerifier, TokenIssuer};
use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, Response, StatusCode, header};
use documents::{DocumentsApi, DocumentsConfig, DocumentsService, MemoryDocumentStore, router};
use http_body_util::BodyExt;
use ownergate_db::{MemoryPool, SessionPropagator};
use ownergate_security::Role;
use tower::ServiceExt;

pub const SECRET: &[u8] = b"test-secret-test-secret-test-sec";

pub struct TestApp {
    pub pool: Arc<MemoryPool>,
    pub store: MemoryDocumentStore,
    pub service: Arc<DocumentsService<MemoryPool, MemoryDocumentStore>>,
    pub resolver: Arc<IdentityResolver>,
    pub router: Router,
    issuer: TokenIssuer,
}

impl TestApp {
    /// One pooled connection, so consecutive requests share it.
    pub fn new() -> Self {
        Self::with_config(DocumentsConfig::default())
    }

    pub fn with_config(config: DocumentsConfig) -> Self {
        Self::build(config, 1)
    }

    pub fn build(config: DocumentsConfig, max_connections: usize) -> Self {
        let pool = Arc::new(MemoryPool::new(max_connections));
        let store = MemoryDocumentStore::new();
        let service = Arc::new(DocumentsService::new(
            SessionPropagator::new(Arc::clone(&pool)),
            Arc::new(store.clone()),
            config,
        ));
        let resolver = Arc::new(IdentityResolver::new(Arc::new(JwtVerifier::new(
            SECRET,
            JwtAlgorithm::Hs256,
            0,
        ))));
        let api: Arc<dyn DocumentsApi> = service.clone();
        let router = router(api, Arc::clone(&resolver));

        Self {
            pool,
            store,
            service,
            resolver,
            router,
            issuer: TokenIssuer::new(SECRET, JwtAlgorithm::Hs256),
        }
    }

    pub fn token(&self, subject_id: i64, role: Role) -> String {
        self.issuer
            .issue(subject_id, role, chrono::Duration::minutes(5))
            .unwrap()
    }

    pub fn user(&self, subject_id: i64) -> String {
        self.token(subject_id, Role::Standard)
    }

    pub fn admin(&self, subject_id: i64) -> String {
        self.token(subject_id, Role::Admin)
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Response<Body> {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(json) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        self.router.clone().oneshot(req).await.unwrap()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        self.send(Method::GET, uri, token, None).await
    }

    /// Every idle connection carries no identity.
    pub fn assert_pool_clean(&self) {
        for (id, values) in self.pool.idle_sessions() {
            assert!(
                values.values().all(String::is_empty),
                "connection {id} still bound: {values:?}"
            );
        }
        assert_eq!(self.pool.stats().leaked_releases, 0);
    }
}

/// Status, headers and body of a response, for byte-level comparison.
#[derive(Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub async fn snapshot(resp: Response<Body>) -> Snapshot {
    let (parts, body) = resp.into_parts();
    Snapshot {
        status: parts.status,
        headers: parts.headers,
        body: body.collect().await.unwrap().to_bytes(),
    }
}

pub async fn json(resp: Response<Body>) -> serde_json::Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
