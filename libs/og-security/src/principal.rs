use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role carried by a verified credential.
///
/// This is a closed set: there is no role hierarchy and no way to register
/// additional roles. Anything that is not `admin` is treated as `standard`
/// by the authorization policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular account; may only reach resources it owns.
    #[default]
    #[serde(alias = "user")]
    Standard,
    /// Operator account; may reach every resource.
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" | "user" => Ok(Self::Standard),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownRole(other.to_owned())),
        }
    }
}

/// Verified identity of the caller for one request.
///
/// Built by the credential verifier from token claims and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    subject_id: i64,
    role: Role,
}

impl Principal {
    #[must_use]
    pub fn new(subject_id: i64, role: Role) -> Self {
        Self { subject_id, role }
    }

    #[must_use]
    pub fn standard(subject_id: i64) -> Self {
        Self::new(subject_id, Role::Standard)
    }

    #[must_use]
    pub fn admin(subject_id: i64) -> Self {
        Self::new(subject_id, Role::Admin)
    }

    #[must_use]
    pub fn subject_id(&self) -> i64 {
        self.subject_id
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Capability check for the role override.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    #[must_use]
    pub fn owns(&self, resource: &OwnedResource) -> bool {
        self.subject_id == resource.owner_id
    }
}

/// The ownership facts of a stored resource.
///
/// `owner_id` is fixed when the resource is created; nothing in the
/// workspace transfers ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnedResource {
    pub id: i64,
    pub owner_id: i64,
}

impl OwnedResource {
    #[must_use]
    pub fn new(id: i64, owner_id: i64) -> Self {
        Self { id, owner_id }
    }
}

/// Anything stored with an owner.
pub trait Owned {
    fn ownership(&self) -> OwnedResource;
}

impl Owned for OwnedResource {
    fn ownership(&self) -> OwnedResource {
        *self
    }
}
