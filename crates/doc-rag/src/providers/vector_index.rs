//! Vector index trait for persistent named collections

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{IndexEntry, Retrieval};

/// Persistent store of named collections of (text, vector, metadata) entries
///
/// Collections are created on first use, by read or write. Entries are
/// append-only; inserting an id that already exists in the collection is
/// an error.
///
/// Implementations:
/// - `LocalVectorIndex`: SQLite file in the configured storage directory
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the collection if it does not exist
    async fn get_or_create(&self, collection: &str) -> Result<()>;

    /// Append an entry to a collection
    async fn insert(&self, collection: &str, entry: IndexEntry) -> Result<()>;

    /// The `n_results` entries nearest to `embedding`, nearest first, or
    /// [`Retrieval::NoResults`] when the collection is empty
    async fn query(&self, collection: &str, embedding: &[f32], n_results: usize) -> Result<Retrieval>;

    /// All collection names, sorted
    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Stored text of the entry with `id`, if present
    async fn content(&self, collection: &str, id: Uuid) -> Result<Option<String>>;

    /// Number of entries in a collection
    async fn count(&self, collection: &str) -> Result<usize>;

    /// Check if the index is usable
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
