//! Local vector index over the SQLite collection store

use async_trait::async_trait;
use std::path::Path;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::storage::CollectionDb;
use crate::types::{IndexEntry, Retrieval};

use super::vector_index::VectorIndex;

/// Async [`VectorIndex`] running the synchronous SQLite store on the
/// blocking pool
#[derive(Clone)]
pub struct LocalVectorIndex {
    db: CollectionDb,
}

impl LocalVectorIndex {
    /// Create from an open store
    pub fn new(db: CollectionDb) -> Self {
        Self { db }
    }

    /// Open the store in `storage_dir`
    pub fn open<P: AsRef<Path>>(storage_dir: P) -> Result<Self> {
        Ok(Self::new(CollectionDb::open(storage_dir)?))
    }

    /// Get underlying store for direct access
    pub fn inner(&self) -> &CollectionDb {
        &self.db
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(CollectionDb) -> Result<T> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || op(db))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }
}

#[async_trait]
impl VectorIndex for LocalVectorIndex {
    async fn get_or_create(&self, collection: &str) -> Result<()> {
        let collection = collection.to_string();
        self.blocking(move |db| db.get_or_create(&collection)).await
    }

    async fn insert(&self, collection: &str, entry: IndexEntry) -> Result<()> {
        let collection = collection.to_string();
        self.blocking(move |db| db.insert(&collection, &entry)).await
    }

    async fn query(&self, collection: &str, embedding: &[f32], n_results: usize) -> Result<Retrieval> {
        let collection = collection.to_string();
        let embedding = embedding.to_vec();
        self.blocking(move |db| db.query(&collection, &embedding, n_results))
            .await
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        self.blocking(|db| db.list_collections()).await
    }

    async fn content(&self, collection: &str, id: Uuid) -> Result<Option<String>> {
        let collection = collection.to_string();
        self.blocking(move |db| db.content(&collection, id)).await
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collection = collection.to_string();
        self.blocking(move |db| db.count(&collection)).await
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.blocking(|db| db.list_collections()).await.is_ok())
    }

    fn name(&self) -> &str {
        "local-sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_insert_and_query_through_blocking_pool() {
        let dir = tempfile::tempdir().unwrap();
        let index = LocalVectorIndex::open(dir.path()).unwrap();

        let entry = IndexEntry {
            id: Uuid::new_v4(),
            chunk_index: 0,
            content: "The sky is blue.".to_string(),
            embedding: vec![1.0, 0.0],
            metadata: HashMap::new(),
        };
        index.insert("docs", entry.clone()).await.unwrap();

        let result = index.query("docs", &[1.0, 0.1], 5).await.unwrap();
        assert_eq!(result.chunks()[0].id, entry.id);
        assert_eq!(index.count("docs").await.unwrap(), 1);
        assert!(index.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_get_or_create_lists_collection() {
        let dir = tempfile::tempdir().unwrap();
        let index = LocalVectorIndex::open(dir.path()).unwrap();
        index.get_or_create("notes").await.unwrap();
        index.get_or_create("notes").await.unwrap();
        assert_eq!(index.list_collections().await.unwrap(), vec!["notes".to_string()]);
    }
}
