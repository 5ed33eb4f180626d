#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, json, snapshot};
use documents::{DocumentsConfig, RowFilter, RowFiltering};
use ownergate_db::SessionFault;
use serde_json::json;
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn permissive_store_is_detected_and_the_response_stays_unified() {
    let app = TestApp::new();
    let doc = app.store.seed(1, "alice's", "secret");
    let bob = app.user(2);

    let absent = snapshot(app.get("/api/v1/documents/424242", Some(&bob)).await).await;
    app.store.set_filter(RowFilter::Disabled);
    let leaked = snapshot(app.get(&format!("/api/v1/documents/{}", doc.id), Some(&bob)).await).await;

    assert_eq!(leaked.status, StatusCode::NOT_FOUND);
    assert_eq!(leaked, absent);
    assert!(logs_contain("row filter exposed a resource the engine denied"));
}

#[tokio::test]
#[traced_test]
async fn restrictive_store_fails_with_the_generic_500() {
    let app = TestApp::new();
    let doc = app.store.seed(1, "mine", "secret");
    app.store.set_filter(RowFilter::WithholdAll);

    let withheld = snapshot(
        app.get(&format!("/api/v1/documents/{}", doc.id), Some(&app.user(1)))
            .await,
    )
    .await;

    app.store.set_filter(RowFilter::Enforced);
    app.pool.inject(SessionFault::FailSet);
    let unbound = snapshot(
        app.get(&format!("/api/v1/documents/{}", doc.id), Some(&app.user(1)))
            .await,
    )
    .await;

    assert_eq!(withheld.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(withheld, unbound);
    assert!(logs_contain("engine allowed a resource the row filter withheld"));
}

#[tokio::test]
async fn restrictive_store_blocks_owner_updates() {
    let app = TestApp::new();
    let doc = app.store.seed(1, "mine", "v1");
    app.store.set_filter(RowFilter::WithholdAll);

    let resp = app
        .send(
            Method::PUT,
            &format!("/api/v1/documents/{}", doc.id),
            Some(&app.user(1)),
            Some(json!({"content": "v2"})),
        )
        .await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(app.store.peek(doc.id).unwrap().content, "v1");
}

#[tokio::test]
async fn application_only_mode_keeps_the_ownership_policy() {
    let app = TestApp::with_config(DocumentsConfig {
        row_filtering: RowFiltering::Disabled,
        ..DocumentsConfig::default()
    });
    // Without row security every row is visible to the store.
    app.store.set_filter(RowFilter::Disabled);
    let doc = app.store.seed(1, "alice's", "secret");
    let uri = format!("/api/v1/documents/{}", doc.id);

    let owner = app.get(&uri, Some(&app.user(1))).await;
    assert_eq!(owner.status(), StatusCode::OK);
    assert_eq!(json(owner).await["title"], "alice's");

    let absent = snapshot(app.get("/api/v1/documents/424242", Some(&app.user(2))).await).await;
    let foreign = snapshot(app.get(&uri, Some(&app.user(2))).await).await;
    assert_eq!(foreign.status, StatusCode::NOT_FOUND);
    assert_eq!(foreign, absent);

    assert_eq!(app.get(&uri, Some(&app.admin(3))).await.status(), StatusCode::OK);
    for (_, values) in app.pool.idle_sessions() {
        assert!(values.is_empty(), "{values:?}");
    }
}
