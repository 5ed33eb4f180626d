//! Embedded schema migrations.

use sqlx::migrate::Migrator;

/// Creates `users`, `documents`, the `documents_owner_or_admin` row filter and
/// the `document_owner` lookup function.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");
