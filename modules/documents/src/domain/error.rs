use authz_resolver::DenyKind;
use ownergate_db::SessionError;

use crate::infra::storage::StoreError;

/// Domain errors of the documents module.
///
/// `BindingFailure`, `InconsistentEnforcement` and `Storage` carry details
/// for logs; the REST layer answers all three with the same generic body.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("not authenticated")]
    NotAuthenticated,

    /// The document does not exist or belongs to someone else.
    #[error("document not found")]
    NotFound,

    #[error("session binding failed: {0}")]
    BindingFailure(#[from] SessionError),

    #[error("authorization engine and row filter disagree")]
    InconsistentEnforcement,

    #[error("validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl DomainError {
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<DenyKind> for DomainError {
    fn from(kind: DenyKind) -> Self {
        match kind {
            DenyKind::NotFound => Self::NotFound,
            DenyKind::Unauthorized => Self::NotAuthenticated,
        }
    }
}
