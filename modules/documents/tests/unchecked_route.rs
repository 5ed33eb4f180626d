#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Negative control: a route that reads straight from the store with no
//! ownership check must fail the isolation assertions the real routes pass.

mod common;

use axum::extract::{Extension, Path};
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use common::{TestApp, json};
use documents::MemoryDocumentStore;
use documents::api::rest::dto::DocumentDto;
use tower::ServiceExt;

async fn unchecked_get(
    Extension(store): Extension<MemoryDocumentStore>,
    Path(id): Path<i64>,
) -> Result<Json<DocumentDto>, StatusCode> {
    store
        .peek(id)
        .map(|d| Json(d.into()))
        .ok_or(StatusCode::NOT_FOUND)
}

#[tokio::test]
async fn unchecked_route_leaks_what_the_real_route_hides() {
    let app = TestApp::new();
    let doc = app.store.seed(1, "alice's", "secret");
    let bob = app.user(2);

    let unchecked = Router::new()
        .route("/unchecked/documents/{id}", get(unchecked_get))
        .layer(Extension(app.store.clone()));
    let req = Request::builder()
        .uri(format!("/unchecked/documents/{}", doc.id))
        .header("authorization", format!("Bearer {bob}"))
        .body(axum::body::Body::empty())
        .unwrap();
    let leaked = unchecked.oneshot(req).await.unwrap();

    assert_eq!(leaked.status(), StatusCode::OK);
    assert_eq!(json(leaked).await["content"], "secret");

    let guarded = app
        .get(&format!("/api/v1/documents/{}", doc.id), Some(&bob))
        .await;
    assert_eq!(guarded.status(), StatusCode::NOT_FOUND);
}
