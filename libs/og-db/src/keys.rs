use ownergate_security::constants::{SESSION_USER_ID_KEY, SESSION_USER_ROLE_KEY};

use crate::error::SessionError;

/// Names of the session parameters written on every bound connection.
///
/// The storage-side row filter reads the same names, so they must match the
/// policy installed by the schema migrations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKeys {
    user_id: String,
    user_role: String,
}

impl Default for SessionKeys {
    fn default() -> Self {
        Self {
            user_id: SESSION_USER_ID_KEY.to_owned(),
            user_role: SESSION_USER_ROLE_KEY.to_owned(),
        }
    }
}

impl SessionKeys {
    /// Build a custom key set.
    ///
    /// # Errors
    /// Returns `SessionError::InvalidKey` unless both names are two-part,
    /// lowercase, dotted identifiers such as `app.user_id`, or if they are equal.
    pub fn new(
        user_id: impl Into<String>,
        user_role: impl Into<String>,
    ) -> Result<Self, SessionError> {
        let user_id = user_id.into();
        let user_role = user_role.into();

        for key in [&user_id, &user_role] {
            if !is_custom_parameter(key) {
                return Err(SessionError::InvalidKey(key.clone()));
            }
        }
        if user_id == user_role {
            return Err(SessionError::InvalidKey(user_role));
        }

        Ok(Self { user_id, user_role })
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub fn user_role(&self) -> &str {
        &self.user_role
    }

    /// All keys, in the order they are written.
    #[must_use]
    pub fn all(&self) -> [&str; 2] {
        [&self.user_id, &self.user_role]
    }
}

fn is_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_lowercase() || first == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn is_custom_parameter(key: &str) -> bool {
    key.split_once('.')
        .is_some_and(|(ns, name)| is_identifier(ns) && is_identifier(name))
}
