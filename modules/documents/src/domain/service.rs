use std::sync::Arc;

use async_trait::async_trait;
use authz_resolver::{
    AccessBasis, AuthorizationDecision, Enforcement, Inconsistency, decide, reconcile,
    require_identity,
};
use ownergate_db::{ConnectionPool, SessionBinding, SessionFuture, SessionPropagator};
use ownergate_security::constants::SECURITY_LOG_TARGET;
use ownergate_security::{IdentityContext, Owned, Principal};
use tracing::instrument;

use super::error::DomainError;
use super::models::{Document, DocumentPatch, NewDocument};
use super::repo::DocumentStore;
use crate::config::DocumentsConfig;

// ============================================================================
// Public API
// ============================================================================

/// Documents operations as seen by the REST layer.
#[async_trait]
pub trait DocumentsApi: Send + Sync {
    async fn get_document(&self, ctx: &IdentityContext, id: i64) -> Result<Document, DomainError>;

    async fn list_my_documents(&self, ctx: &IdentityContext) -> Result<Vec<Document>, DomainError>;

    async fn create_document(
        &self,
        ctx: &IdentityContext,
        new: NewDocument,
    ) -> Result<Document, DomainError>;

    async fn update_document(
        &self,
        ctx: &IdentityContext,
        id: i64,
        patch: DocumentPatch,
    ) -> Result<Document, DomainError>;

    async fn delete_document(&self, ctx: &IdentityContext, id: i64) -> Result<(), DomainError>;
}

// ============================================================================
// Service Implementation
// ============================================================================

/// Owner-scoped document access.
///
/// Every operation asks the authorization engine first. With row filtering
/// enabled the store runs on a connection bound to the caller and what it
/// returns is reconciled with the engine's decision, so a request succeeds
/// only when both layers agree.
pub struct DocumentsService<P, S>
where
    P: ConnectionPool,
    S: DocumentStore<Connection = P::Connection>,
{
    propagator: SessionPropagator<P>,
    store: Arc<S>,
    config: DocumentsConfig,
}

impl<P, S> DocumentsService<P, S>
where
    P: ConnectionPool,
    S: DocumentStore<Connection = P::Connection>,
{
    #[must_use]
    pub fn new(propagator: SessionPropagator<P>, store: Arc<S>, config: DocumentsConfig) -> Self {
        Self {
            propagator,
            store,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &DocumentsConfig {
        &self.config
    }

    /// Read one document.
    ///
    /// # Errors
    /// `NotFound` for a missing document and for someone else's, alike.
    #[instrument(skip(self, ctx), fields(subject_id = ?ctx.subject_id()))]
    pub async fn get_document(
        &self,
        ctx: &IdentityContext,
        id: i64,
    ) -> Result<Document, DomainError> {
        let principal = authenticated(ctx)?;
        let store = Arc::clone(&self.store);
        let filtered = self.config.row_filtering_enabled();
        let probe = filtered && self.config.probe_on_deny;

        self.in_session(&principal, move |session| {
            Box::pin(async move {
                let conn = session.connection()?;
                let owner = store.owner_of(conn, id).await?;
                let decision = decide(Some(&principal), owner.as_ref());
                trace_decision(&decision);

                if !decision.is_allow() && !probe {
                    return Err(denied(&decision));
                }
                let visible = store.fetch(conn, id).await?;
                if filtered && vanished(&*store, conn, &decision, visible.is_some(), id).await? {
                    return Err(DomainError::NotFound);
                }
                settle(&decision, visible, filtered)
            })
        })
        .await
    }

    /// # Errors
    /// `NotAuthenticated`, or a binding or storage failure.
    #[instrument(skip(self, ctx), fields(subject_id = ?ctx.subject_id()))]
    pub async fn list_my_documents(
        &self,
        ctx: &IdentityContext,
    ) -> Result<Vec<Document>, DomainError> {
        let principal = authenticated(ctx)?;
        let store = Arc::clone(&self.store);

        let rows = self
            .in_session(&principal, move |session| {
                Box::pin(async move {
                    let conn = session.connection()?;
                    Ok(store.list_owned(conn, principal.subject_id()).await?)
                })
            })
            .await?;

        let total = rows.len();
        let docs: Vec<Document> = rows
            .into_iter()
            .filter(|doc| {
                let ownership = doc.ownership();
                principal.owns(&ownership) && decide(Some(&principal), Some(&ownership)).is_allow()
            })
            .collect();

        if docs.len() != total {
            tracing::error!(
                target: SECURITY_LOG_TARGET,
                subject_id = principal.subject_id(),
                dropped = total - docs.len(),
                "store listed documents the caller does not own"
            );
        }
        Ok(docs)
    }

    /// # Errors
    /// `Validation` for bad input, `Storage` when the row filter refuses the
    /// write.
    #[instrument(skip(self, ctx, new), fields(subject_id = ?ctx.subject_id()))]
    pub async fn create_document(
        &self,
        ctx: &IdentityContext,
        new: NewDocument,
    ) -> Result<Document, DomainError> {
        let principal = authenticated(ctx)?;
        new.validate()?;
        let store = Arc::clone(&self.store);

        let doc = self
            .in_session(&principal, move |session| {
                Box::pin(async move {
                    let conn = session.connection()?;
                    Ok(store.insert(conn, principal.subject_id(), &new).await?)
                })
            })
            .await?;

        tracing::info!(document_id = doc.id, "document created");
        Ok(doc)
    }

    /// # Errors
    /// Same outcomes as `get_document`; nothing is written on a deny.
    #[instrument(skip(self, ctx, patch), fields(subject_id = ?ctx.subject_id()))]
    pub async fn update_document(
        &self,
        ctx: &IdentityContext,
        id: i64,
        patch: DocumentPatch,
    ) -> Result<Document, DomainError> {
        let principal = authenticated(ctx)?;
        patch.validate()?;
        let store = Arc::clone(&self.store);
        let filtered = self.config.row_filtering_enabled();
        let probe = filtered && self.config.probe_on_deny;

        self.in_session(&principal, move |session| {
            Box::pin(async move {
                let conn = session.connection()?;
                let owner = store.owner_of(conn, id).await?;
                let decision = decide(Some(&principal), owner.as_ref());
                trace_decision(&decision);

                if !decision.is_allow() {
                    if probe {
                        let visible = store.fetch(conn, id).await?;
                        settle(&decision, visible, filtered)?;
                    }
                    return Err(denied(&decision));
                }
                let updated = store.update(conn, id, &patch).await?;
                if filtered && vanished(&*store, conn, &decision, updated.is_some(), id).await? {
                    return Err(DomainError::NotFound);
                }
                settle(&decision, updated, filtered)
            })
        })
        .await
    }

    /// # Errors
    /// Same outcomes as `get_document`; nothing is deleted on a deny.
    #[instrument(skip(self, ctx), fields(subject_id = ?ctx.subject_id()))]
    pub async fn delete_document(&self, ctx: &IdentityContext, id: i64) -> Result<(), DomainError> {
        let principal = authenticated(ctx)?;
        let store = Arc::clone(&self.store);
        let filtered = self.config.row_filtering_enabled();
        let probe = filtered && self.config.probe_on_deny;

        self.in_session(&principal, move |session| {
            Box::pin(async move {
                let conn = session.connection()?;
                let owner = store.owner_of(conn, id).await?;
                let decision = decide(Some(&principal), owner.as_ref());
                trace_decision(&decision);

                if !decision.is_allow() {
                    if probe {
                        let visible = store.fetch(conn, id).await?;
                        settle(&decision, visible, filtered)?;
                    }
                    return Err(denied(&decision));
                }
                let deleted = store.delete(conn, id).await?;
                if filtered && vanished(&*store, conn, &decision, deleted.is_some(), id).await? {
                    return Err(DomainError::NotFound);
                }
                settle(&decision, deleted, filtered)?;
                tracing::info!(document_id = id, "document deleted");
                Ok(())
            })
        })
        .await
    }

    /// Run `body` on a connection bound to `principal`, or on an unbound one
    /// when row filtering is disabled.
    async fn in_session<T, F>(&self, principal: &Principal, body: F) -> Result<T, DomainError>
    where
        T: Send + 'static,
        F: for<'b> FnOnce(&'b mut SessionBinding<P>) -> SessionFuture<'b, Result<T, DomainError>>
            + Send,
    {
        if self.config.row_filtering_enabled() {
            self.propagator.with_bound_session(principal, body).await
        } else {
            self.propagator.with_connection(body).await
        }
    }
}

#[async_trait]
impl<P, S> DocumentsApi for DocumentsService<P, S>
where
    P: ConnectionPool,
    S: DocumentStore<Connection = P::Connection>,
{
    async fn get_document(&self, ctx: &IdentityContext, id: i64) -> Result<Document, DomainError> {
        DocumentsService::get_document(self, ctx, id).await
    }

    async fn list_my_documents(&self, ctx: &IdentityContext) -> Result<Vec<Document>, DomainError> {
        DocumentsService::list_my_documents(self, ctx).await
    }

    async fn create_document(
        &self,
        ctx: &IdentityContext,
        new: NewDocument,
    ) -> Result<Document, DomainError> {
        DocumentsService::create_document(self, ctx, new).await
    }

    async fn update_document(
        &self,
        ctx: &IdentityContext,
        id: i64,
        patch: DocumentPatch,
    ) -> Result<Document, DomainError> {
        DocumentsService::update_document(self, ctx, id, patch).await
    }

    async fn delete_document(&self, ctx: &IdentityContext, id: i64) -> Result<(), DomainError> {
        DocumentsService::delete_document(self, ctx, id).await
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn authenticated(ctx: &IdentityContext) -> Result<Principal, DomainError> {
    require_identity(ctx.principal())
        .copied()
        .map_err(|decision| denied(&decision))
}

fn denied(decision: &AuthorizationDecision) -> DomainError {
    decision
        .deny_kind()
        .map_or(DomainError::NotFound, DomainError::from)
}

fn trace_decision(decision: &AuthorizationDecision) {
    match decision {
        AuthorizationDecision::Allow {
            principal,
            resource,
            basis: AccessBasis::AdminOverride,
        } => tracing::info!(
            target: SECURITY_LOG_TARGET,
            subject_id = principal.subject_id(),
            resource_id = resource.id,
            owner_id = resource.owner_id,
            "admin override"
        ),
        AuthorizationDecision::Allow { .. } => tracing::debug!(?decision, "access allowed"),
        _ => tracing::info!(?decision, "access denied"),
    }
}

/// Whether an allowed row the store did not return was deleted after the
/// ownership lookup, which is a plain not-found rather than a disagreement
/// between the two enforcement layers.
async fn vanished<S: DocumentStore>(
    store: &S,
    conn: &mut S::Connection,
    decision: &AuthorizationDecision,
    returned: bool,
    id: i64,
) -> Result<bool, DomainError> {
    if returned || !decision.is_allow() {
        return Ok(false);
    }
    let gone = store.owner_of(conn, id).await?.is_none();
    if gone {
        tracing::debug!(document_id = id, "document removed after the ownership lookup");
    }
    Ok(gone)
}

/// Turn the engine's decision and the store's answer into the outcome of the
/// request.
///
/// Without row filtering the store's answer is taken as is for allowed
/// requests. With it, the two layers are reconciled: a store that shows more
/// than the engine allows still yields the engine's deny, and a store that
/// withholds what the engine allowed fails the request.
fn settle<R: Owned>(
    decision: &AuthorizationDecision,
    visible: Option<R>,
    filtered: bool,
) -> Result<R, DomainError> {
    if !filtered {
        return match decision.deny_kind() {
            Some(kind) => Err(kind.into()),
            None => visible.ok_or(DomainError::NotFound),
        };
    }

    match reconcile(decision, visible) {
        Enforcement::Granted(row) => Ok(row),
        Enforcement::Denied(kind)
        | Enforcement::Inconsistent(Inconsistency::StoreMorePermissive(kind)) => Err(kind.into()),
        Enforcement::Inconsistent(Inconsistency::StoreMoreRestrictive) => {
            Err(DomainError::InconsistentEnforcement)
        }
    }
}
