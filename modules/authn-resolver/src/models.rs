//! Token claims.

use ownergate_security::Role;
use serde::{Deserialize, Serialize};

/// Claims carried by an access token.
///
/// `sub` is the decimal subject id as a string, the form issuers put in the
/// registered `sub` claim. A missing `role` means a standard account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub role: Role,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl Claims {
    #[must_use]
    pub fn new(subject_id: i64, role: Role, issued_at: i64, expires_at: i64) -> Self {
        Self {
            sub: subject_id.to_string(),
            role,
            exp: expires_at,
            iat: Some(issued_at),
        }
    }
}
