use std::sync::Arc;

use authn_resolver::IdentityResolver;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::{Extension, Router};

use super::{auth, handlers};
use crate::domain::service::DocumentsApi;

/// Build the REST router.
///
/// Every route sits behind the authentication middleware, so handlers can
/// always extract an `IdentityContext`.
#[must_use]
pub fn router(api: Arc<dyn DocumentsApi>, resolver: Arc<IdentityResolver>) -> Router {
    Router::new()
        .route("/api/v1/documents", post(handlers::create_document))
        .route("/api/v1/documents/me", get(handlers::list_my_documents))
        .route(
            "/api/v1/documents/{id}",
            get(handlers::get_document)
                .put(handlers::update_document)
                .delete(handlers::delete_document),
        )
        .route("/api/v1/users/me", get(handlers::users_me))
        .layer(Extension(api))
        .layer(from_fn_with_state(resolver, auth::authn_middleware))
}
