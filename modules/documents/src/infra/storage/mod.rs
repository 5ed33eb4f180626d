pub mod memory_repo;
pub mod migrations;
pub mod pg_repo;

pub use memory_repo::{MemoryDocumentStore, RowFilter};
pub use migrations::MIGRATOR;
pub use pg_repo::PgDocumentStore;

/// Storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The row filter refused a write (`WITH CHECK` violation).
    #[error("row filter rejected the write")]
    PolicyViolation,

    #[error("query failed: {0}")]
    Query(String),
}

/// SQLSTATE `insufficient_privilege`, raised for row-level security
/// violations.
const INSUFFICIENT_PRIVILEGE: &str = "42501";

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e
            && db.code().as_deref() == Some(INSUFFICIENT_PRIVILEGE)
        {
            return Self::PolicyViolation;
        }
        Self::Query(e.to_string())
    }
}
