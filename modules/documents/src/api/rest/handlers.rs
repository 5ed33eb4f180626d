use std::sync::Arc;

use axum::extract::{Extension, Json, Path};
use axum::http::StatusCode;
use ownergate_security::IdentityContext;

use super::dto::{CreateDocumentReq, DocumentDto, UpdateDocumentReq, UserDto};
use super::problem::Problem;
use crate::domain::error::DomainError;
use crate::domain::service::DocumentsApi;

type ApiResult<T> = Result<T, Problem>;

/// Get a document by id
#[tracing::instrument(skip(ctx, svc))]
pub async fn get_document(
    Extension(ctx): Extension<IdentityContext>,
    Extension(svc): Extension<Arc<dyn DocumentsApi>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DocumentDto>> {
    let doc = svc.get_document(&ctx, id).await?;
    Ok(Json(doc.into()))
}

/// List the caller's own documents
#[tracing::instrument(skip_all)]
pub async fn list_my_documents(
    Extension(ctx): Extension<IdentityContext>,
    Extension(svc): Extension<Arc<dyn DocumentsApi>>,
) -> ApiResult<Json<Vec<DocumentDto>>> {
    let docs = svc.list_my_documents(&ctx).await?;
    Ok(Json(docs.into_iter().map(Into::into).collect()))
}

/// Create a document owned by the caller
#[tracing::instrument(skip_all)]
pub async fn create_document(
    Extension(ctx): Extension<IdentityContext>,
    Extension(svc): Extension<Arc<dyn DocumentsApi>>,
    Json(req): Json<CreateDocumentReq>,
) -> ApiResult<(StatusCode, Json<DocumentDto>)> {
    let doc = svc.create_document(&ctx, req.into()).await?;
    Ok((StatusCode::CREATED, Json(doc.into())))
}

/// Update a document
#[tracing::instrument(skip(ctx, svc, req))]
pub async fn update_document(
    Extension(ctx): Extension<IdentityContext>,
    Extension(svc): Extension<Arc<dyn DocumentsApi>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateDocumentReq>,
) -> ApiResult<Json<DocumentDto>> {
    let doc = svc.update_document(&ctx, id, req.into()).await?;
    Ok(Json(doc.into()))
}

/// Delete a document
#[tracing::instrument(skip(ctx, svc))]
pub async fn delete_document(
    Extension(ctx): Extension<IdentityContext>,
    Extension(svc): Extension<Arc<dyn DocumentsApi>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    svc.delete_document(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The caller's verified identity
pub async fn users_me(Extension(ctx): Extension<IdentityContext>) -> ApiResult<Json<UserDto>> {
    let principal = ctx.principal().ok_or(DomainError::NotAuthenticated)?;
    Ok(Json(principal.into()))
}
