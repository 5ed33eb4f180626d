use chrono::{DateTime, Utc};
use ownergate_security::Principal;
use serde::{Deserialize, Serialize};

use crate::domain::models::{Document, DocumentPatch, NewDocument};

/// REST DTO for a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDto {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Document> for DocumentDto {
    fn from(d: Document) -> Self {
        Self {
            id: d.id,
            owner_id: d.owner_id,
            title: d.title,
            content: d.content,
            created_at: d.created_at,
            updated_at: d.updated_at,
        }
    }
}

/// REST DTO for creating a document. The owner is never taken from the body.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateDocumentReq {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl From<CreateDocumentReq> for NewDocument {
    fn from(r: CreateDocumentReq) -> Self {
        Self {
            title: r.title,
            content: r.content,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateDocumentReq {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl From<UpdateDocumentReq> for DocumentPatch {
    fn from(r: UpdateDocumentReq) -> Self {
        Self {
            title: r.title,
            content: r.content,
        }
    }
}

/// REST DTO for the caller's own identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: i64,
    pub role: String,
}

impl From<&Principal> for UserDto {
    fn from(p: &Principal) -> Self {
        Self {
            id: p.subject_id(),
            role: p.role().to_string(),
        }
    }
}
