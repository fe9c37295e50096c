//! # Hunters - dual-persisted hunter records
//!
//! A REST service over a single logical entity, a hunter, stored twice:
//! - a document collection, the system of record for every request
//! - a relational table with its own auto-increment ids, kept as a mirror
//!
//! The two stores never share identifiers and are not written in lockstep.
//! The relational schema is synchronized at startup before traffic is served.

pub mod hunter;
pub mod storage;
pub mod bootstrap;
pub mod server;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use hunter::{DocumentId, Hunter, HunterDraft, HunterPatch, RowId, Stored};
pub use storage::{DocumentRepository, HunterRepository, RelationalRepository};
pub use bootstrap::HunterContext;
pub use config::HunterConfig;

/// Result type alias for hunter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for hunter operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Hunter not found: {0}")]
    NotFound(String),

    #[error("Connectivity error: {0}")]
    Connectivity(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Document encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Store call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl Error {
    /// True for failures raised by a backend after a connection was
    /// established, as opposed to bad input or a missing record.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Error::Storage(_)
                | Error::Encoding(_)
                | Error::SchemaMismatch(_)
                | Error::Timeout(_)
                | Error::Backend(_)
        )
    }
}
