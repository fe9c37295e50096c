//! Storage Layer - two projections of the same hunter record
//!
//! - document store: collection `hunters(seq, id, body)`, JSON bodies with
//!   generated string ids; the system of record for request handlers
//! - relational store: table `hunters(id, name, age, height, weight, image_url)`
//!   with auto-increment ids; schema synchronized at startup
//!
//! Both implement [`HunterRepository`]. Their id spaces are unrelated and
//! neither repository writes to the other.

pub mod connection;
pub mod document;
pub mod matcher;
pub mod relational;
pub mod schema;

pub use connection::{StoreHandle, StoreLocation};
pub use document::DocumentRepository;
pub use relational::RelationalRepository;
pub use schema::SyncOutcome;

use async_trait::async_trait;
use serde::Serialize;

use crate::hunter::{HunterDraft, HunterPatch, Stored};
use crate::Result;

/// CRUD capability shared by both stores, addressed by name fragment.
///
/// "First match" always means the oldest inserted record whose name contains
/// the fragment, compared case-insensitively and literally.
#[async_trait]
pub trait HunterRepository: Send + Sync {
    /// Store-assigned identifier
    type Id: Clone + Send + Sync + std::fmt::Display + Serialize;

    /// Short label used in logs and CLI output
    fn store_name(&self) -> &'static str;

    /// Every record in insertion order.
    async fn list_all(&self) -> Result<Vec<Stored<Self::Id>>>;

    async fn find_by_name_fragment(&self, fragment: &str) -> Result<Stored<Self::Id>>;

    /// Validate and persist a new record.
    async fn create(&self, draft: HunterDraft) -> Result<Stored<Self::Id>>;

    /// Apply `patch` to the first match and return the updated record.
    async fn update_by_name_fragment(
        &self,
        fragment: &str,
        patch: HunterPatch,
    ) -> Result<Stored<Self::Id>>;

    /// Remove the first match and return what was removed.
    async fn delete_by_name_fragment(&self, fragment: &str) -> Result<Stored<Self::Id>>;
}

pub(crate) fn not_found(fragment: &str) -> crate::Error {
    crate::Error::NotFound(format!("no hunter name contains '{}'", fragment))
}
