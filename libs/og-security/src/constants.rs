//! Names shared between the session propagator and the storage-side row filter.

/// Session parameter holding the subject id of the bound principal.
pub const SESSION_USER_ID_KEY: &str = "app.user_id";

/// Session parameter holding the role of the bound principal.
pub const SESSION_USER_ROLE_KEY: &str = "app.user_role";

/// Log target for security anomalies: stale bindings, failed clears and
/// disagreement between the authorization engine and the row filter.
pub const SECURITY_LOG_TARGET: &str = "ownergate::security";
