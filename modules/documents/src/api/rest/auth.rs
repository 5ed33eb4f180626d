//! Authentication middleware.

use std::sync::Arc;

use authn_resolver::{AuthNError, IdentityResolver};
use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::problem::Problem;

/// Resolves the caller's identity and inserts an `IdentityContext` into the
/// request extensions.
///
/// No `Authorization` header gives an anonymous context; handlers decide
/// whether that is enough. A header that does not resolve is answered with
/// 401 here, whatever the reason.
pub async fn authn_middleware(
    State(resolver): State<Arc<IdentityResolver>>,
    mut req: Request,
    next: Next,
) -> Response {
    let authorization = match req.headers().get(header::AUTHORIZATION) {
        None => None,
        Some(value) => match value.to_str() {
            Ok(value) => Some(value.to_owned()),
            Err(_) => {
                tracing::debug!("authorization header is not valid ASCII");
                return Problem::unauthorized().into_response();
            }
        },
    };

    match resolver.resolve(authorization.as_deref()).await {
        Ok(ctx) => {
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        Err(AuthNError::NotAuthenticated(_)) => Problem::unauthorized().into_response(),
        Err(AuthNError::Internal(msg)) => {
            tracing::error!("AuthN internal error: {msg}");
            Problem::internal().into_response()
        }
    }
}
