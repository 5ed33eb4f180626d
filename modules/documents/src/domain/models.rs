use chrono::{DateTime, Utc};
use ownergate_security::{Owned, OwnedResource};

use crate::domain::error::DomainError;

/// Longest accepted title, in characters.
pub const MAX_TITLE_LEN: usize = 255;

/// A stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Owned for Document {
    fn ownership(&self) -> OwnedResource {
        OwnedResource::new(self.id, self.owner_id)
    }
}

/// Input for creating a document. The owner is always the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub title: String,
    pub content: String,
}

impl NewDocument {
    /// # Errors
    /// `DomainError::Validation` for an empty or overlong title.
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_title(&self.title)
    }
}

/// Partial update. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl DocumentPatch {
    /// # Errors
    /// `DomainError::Validation` for an empty patch or an invalid title.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.is_none() && self.content.is_none() {
            return Err(DomainError::validation("body", "nothing to update"));
        }
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        Ok(())
    }
}

fn validate_title(title: &str) -> Result<(), DomainError> {
    if title.trim().is_empty() {
        return Err(DomainError::validation("title", "must not be empty"));
    }
    let len = title.chars().count();
    if len > MAX_TITLE_LEN {
        return Err(DomainError::validation(
            "title",
            format!("{len} characters exceeds the limit of {MAX_TITLE_LEN}"),
        ));
    }
    Ok(())
}
