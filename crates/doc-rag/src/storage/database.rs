//! SQLite persistence for named vector collections
//!
//! One database file holds every collection. Entries are append-only: an id
//! is written once and never updated.

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::retrieval::rank_nearest;
use crate::types::{IndexEntry, Retrieval, RetrievedChunk};

/// File name of the database inside the storage directory
pub const DATABASE_FILE: &str = "collections.db";

/// SQLite-backed store of named collections
#[derive(Clone)]
pub struct CollectionDb {
    conn: Arc<Mutex<Connection>>,
}

impl CollectionDb {
    /// Open (or create) the store inside `storage_dir`
    pub fn open<P: AsRef<Path>>(storage_dir: P) -> Result<Self> {
        let storage_dir = storage_dir.as_ref();
        std::fs::create_dir_all(storage_dir)?;
        Self::open_file(storage_dir.join(DATABASE_FILE))
    }

    fn open_file(path: PathBuf) -> Result<Self> {
        let conn = Connection::open(&path).map_err(|e| {
            Error::vector_db(format!("Failed to open database {}: {}", path.display(), e))
        })?;
        conn.busy_timeout(Duration::from_secs(5))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        // journal_mode answers with the resulting mode ("memory" for in-memory databases)
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                dimensions INTEGER,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS entries (
                collection TEXT NOT NULL REFERENCES collections(name),
                id TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL,
                metadata TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            );

            CREATE INDEX IF NOT EXISTS idx_entries_collection ON entries(collection);
        "#,
        )?;

        Ok(())
    }

    /// Create the collection if it does not exist yet
    pub fn get_or_create(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        let conn = self.conn.lock();
        ensure_collection(&conn, name)
    }

    /// Append one entry. The first entry fixes the collection's dimensionality.
    pub fn insert(&self, collection: &str, entry: &IndexEntry) -> Result<()> {
        validate_name(collection)?;
        if entry.embedding.is_empty() {
            return Err(Error::InvalidInput(format!("entry {} has an empty embedding", entry.id)));
        }
        let metadata = serde_json::to_string(&entry.metadata)?;

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        ensure_collection(&tx, collection)?;

        let actual = entry.embedding.len();
        match collection_dimensions(&tx, collection)? {
            Some(expected) if expected != actual => {
                return Err(Error::DimensionMismatch {
                    collection: collection.to_string(),
                    expected,
                    actual,
                });
            }
            Some(_) => {}
            None => {
                tx.execute(
                    "UPDATE collections SET dimensions = ?1 WHERE name = ?2",
                    params![actual as i64, collection],
                )?;
            }
        }

        tx.execute(
            r#"INSERT INTO entries
               (collection, id, chunk_index, content, embedding, metadata, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            params![
                collection,
                entry.id.to_string(),
                entry.chunk_index,
                entry.content,
                encode_embedding(&entry.embedding),
                metadata,
                Utc::now().to_rfc3339(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// The `n_results` entries nearest to `embedding`, nearest first.
    ///
    /// An empty or missing collection is created and yields
    /// [`Retrieval::NoResults`].
    pub fn query(&self, collection: &str, embedding: &[f32], n_results: usize) -> Result<Retrieval> {
        validate_name(collection)?;
        if n_results == 0 {
            return Err(Error::InvalidInput("n_results must be greater than zero".to_string()));
        }

        let rows = {
            let conn = self.conn.lock();
            ensure_collection(&conn, collection)?;

            let dimensions = collection_dimensions(&conn, collection)?;
            if let Some(expected) = dimensions {
                if expected != embedding.len() {
                    return Err(Error::DimensionMismatch {
                        collection: collection.to_string(),
                        expected,
                        actual: embedding.len(),
                    });
                }
            }

            let mut stmt = conn.prepare(
                "SELECT id, content, embedding, metadata FROM entries WHERE collection = ?1 ORDER BY rowid",
            )?;
            let rows = stmt
                .query_map(params![collection], |row| {
                    Ok(StoredRow {
                        id: row.get(0)?,
                        content: row.get(1)?,
                        embedding: row.get(2)?,
                        metadata: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        if rows.is_empty() {
            return Ok(Retrieval::NoResults);
        }

        let candidates = rows
            .into_iter()
            .map(|row| {
                let vector = decode_embedding(&row.embedding);
                (row, vector)
            })
            .collect();

        let chunks = rank_nearest(embedding, candidates, n_results)
            .into_iter()
            .map(|(row, distance)| row.into_retrieved(distance))
            .collect::<Result<Vec<_>>>()?;

        Ok(Retrieval::from_ranked(chunks))
    }

    /// All collection names, sorted
    pub fn list_collections(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT name FROM collections ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    /// Number of entries in a collection; zero if it does not exist
    pub fn count(&self, collection: &str) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Fixed dimensionality of a collection, if any entry has been stored
    pub fn dimensions(&self, collection: &str) -> Result<Option<usize>> {
        let conn = self.conn.lock();
        collection_dimensions(&conn, collection)
    }

    /// Stored text of one entry, if the id exists in the collection
    pub fn content(&self, collection: &str, id: Uuid) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let content = conn
            .query_row(
                "SELECT content FROM entries WHERE collection = ?1 AND id = ?2",
                params![collection, id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(content)
    }

    /// IDs stored in a collection, in insertion order
    pub fn ids(&self, collection: &str) -> Result<Vec<Uuid>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT id FROM entries WHERE collection = ?1 ORDER BY rowid")?;
        let ids = stmt
            .query_map(params![collection], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        ids.iter().map(|id| parse_uuid(id)).collect()
    }
}

struct StoredRow {
    id: String,
    content: String,
    embedding: Vec<u8>,
    metadata: String,
}

impl StoredRow {
    fn into_retrieved(self, distance: f32) -> Result<RetrievedChunk> {
        let metadata: HashMap<String, serde_json::Value> = serde_json::from_str(&self.metadata)?;
        Ok(RetrievedChunk {
            id: parse_uuid(&self.id)?,
            content: self.content,
            distance,
            metadata,
        })
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidInput("collection name must not be empty".to_string()));
    }
    Ok(())
}

fn ensure_collection(conn: &Connection, name: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO collections (name, dimensions, created_at) VALUES (?1, NULL, ?2)",
        params![name, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn collection_dimensions(conn: &Connection, name: &str) -> Result<Option<usize>> {
    let dimensions: Option<Option<i64>> = conn
        .query_row(
            "SELECT dimensions FROM collections WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(dimensions.flatten().map(|d| d as usize))
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| Error::vector_db(format!("corrupt entry id '{}': {}", raw, e)))
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(content: &str, embedding: Vec<f32>, chunk_index: u32) -> IndexEntry {
        let mut metadata = HashMap::new();
        metadata.insert("chunk_id".to_string(), serde_json::json!(chunk_index));
        IndexEntry {
            id: Uuid::new_v4(),
            chunk_index,
            content: content.to_string(),
            embedding,
            metadata,
        }
    }

    #[test]
    fn test_missing_collection_is_created_empty() {
        let db = CollectionDb::in_memory().unwrap();
        let result = db.query("fresh", &[1.0, 0.0], 5).unwrap();
        assert!(matches!(result, Retrieval::NoResults));
        assert_eq!(db.list_collections().unwrap(), vec!["fresh".to_string()]);
        assert_eq!(db.count("fresh").unwrap(), 0);
    }

    #[test]
    fn test_query_ranks_nearest_first() {
        let db = CollectionDb::in_memory().unwrap();
        db.insert("docs", &entry("east", vec![1.0, 0.0], 0)).unwrap();
        db.insert("docs", &entry("north", vec![0.0, 1.0], 1)).unwrap();
        db.insert("docs", &entry("north-east", vec![1.0, 1.0], 2)).unwrap();

        let result = db.query("docs", &[0.1, 1.0], 2).unwrap();
        assert_eq!(result.texts(), vec!["north".to_string(), "north-east".to_string()]);
        assert_eq!(result.chunks()[0].metadata["chunk_id"], serde_json::json!(1));
    }

    #[test]
    fn test_query_returns_at_most_stored() {
        let db = CollectionDb::in_memory().unwrap();
        for i in 0..3 {
            db.insert("docs", &entry(&format!("chunk {}", i), vec![1.0, i as f32], i)).unwrap();
        }
        let result = db.query("docs", &[1.0, 0.0], 8).unwrap();
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let db = CollectionDb::in_memory().unwrap();
        let first = entry("original", vec![1.0, 0.0], 0);
        db.insert("docs", &first).unwrap();

        let mut again = entry("replacement", vec![0.0, 1.0], 0);
        again.id = first.id;
        let err = db.insert("docs", &again).unwrap_err();
        assert!(matches!(err, Error::DuplicateId(_)));
        assert!(!err.is_retryable());
        assert_eq!(db.content("docs", first.id).unwrap().as_deref(), Some("original"));
        assert_eq!(db.content("docs", Uuid::new_v4()).unwrap(), None);

        let result = db.query("docs", &[1.0, 0.0], 5).unwrap();
        assert_eq!(result.texts(), vec!["original".to_string()]);

        // Same id in another collection is fine
        db.insert("other", &again).unwrap();
    }

    #[test]
    fn test_dimension_is_fixed_by_first_insert() {
        let db = CollectionDb::in_memory().unwrap();
        db.insert("docs", &entry("a", vec![1.0, 0.0, 0.0], 0)).unwrap();
        assert_eq!(db.dimensions("docs").unwrap(), Some(3));

        let err = db.insert("docs", &entry("b", vec![1.0, 0.0], 1)).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 2, .. }));

        let err = db.query("docs", &[1.0, 0.0], 1).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[test]
    fn test_rejects_empty_name_and_zero_results() {
        let db = CollectionDb::in_memory().unwrap();
        assert!(matches!(db.get_or_create("  "), Err(Error::InvalidInput(_))));
        assert!(matches!(db.query("docs", &[1.0], 0), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_collections_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let db = CollectionDb::open(dir.path()).unwrap();
            let stored = entry("kept", vec![0.5, 0.5], 0);
            db.insert("zeta", &stored).unwrap();
            db.get_or_create("alpha").unwrap();
            stored.id
        };

        let db = CollectionDb::open(dir.path()).unwrap();
        assert_eq!(db.list_collections().unwrap(), vec!["alpha".to_string(), "zeta".to_string()]);
        assert_eq!(db.ids("zeta").unwrap(), vec![id]);
        assert_eq!(db.query("zeta", &[1.0, 1.0], 1).unwrap().texts(), vec!["kept".to_string()]);
    }
}
