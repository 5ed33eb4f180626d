//! Documents module
//!
//! Owner-scoped documents served over REST. Access is decided by the
//! authorization engine and, when row filtering is enabled, enforced a second
//! time by the store on a connection bound to the caller.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod config;
pub mod domain;
pub mod infra;

pub use api::rest::{Problem, router};
pub use config::{DocumentsConfig, RowFiltering};
pub use domain::error::DomainError;
pub use domain::models::{Document, DocumentPatch, MAX_TITLE_LEN, NewDocument};
pub use domain::repo::DocumentStore;
pub use domain::service::{DocumentsApi, DocumentsService};
pub use infra::storage::{MIGRATOR, MemoryDocumentStore, PgDocumentStore, RowFilter, StoreError};
