use std::fmt::Display;

/// Failures of the session propagation layer.
///
/// Every variant is fatal for the request that hit it: the connection
/// involved is discarded and the caller maps the error to a binding failure.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("connection checkout failed: {0}")]
    Checkout(String),

    #[error("failed to set session parameter '{key}': {reason}")]
    Bind { key: String, reason: String },

    #[error("failed to clear session parameter '{key}': {reason}")]
    Clear { key: String, reason: String },

    #[error("failed to read session parameter '{key}': {reason}")]
    Read { key: String, reason: String },

    #[error("session parameter '{key}' does not hold the bound value")]
    Mismatch { key: String },

    #[error("checked-out connection still carries a binding in '{key}'")]
    StaleBinding { key: String },

    #[error("connection already returned to the pool")]
    Released,

    #[error("invalid session parameter name '{0}'")]
    InvalidKey(String),
}

impl SessionError {
    #[must_use]
    pub fn bind(key: &str, reason: impl Display) -> Self {
        Self::Bind {
            key: key.to_owned(),
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn clear(key: &str, reason: impl Display) -> Self {
        Self::Clear {
            key: key.to_owned(),
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn read(key: &str, reason: impl Display) -> Self {
        Self::Read {
            key: key.to_owned(),
            reason: reason.to_string(),
        }
    }
}
