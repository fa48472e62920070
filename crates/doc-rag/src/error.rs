//! Error types for the RAG system

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// RAG system errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied an unusable argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File extension is not one of pdf, docx, txt
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// A recognized format could not be read
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Embedding service error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector index read/write error
    #[error("Vector index error: {0}")]
    VectorDb(String),

    /// An entry id already exists in the collection
    #[error("Duplicate entry id: {0}")]
    DuplicateId(String),

    /// Vector length does not match the collection
    #[error("Dimension mismatch in collection '{collection}': expected {expected}, got {actual}")]
    DimensionMismatch {
        collection: String,
        expected: usize,
        actual: usize,
    },

    /// Generation service error
    #[error("LLM error: {0}")]
    Llm(String),

    /// An external call exceeded its time budget
    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },

    /// An ingestion batch stopped after some of its chunks were stored
    #[error("Batch {batch_id} aborted after storing {} chunks: {source}", .stored_ids.len())]
    PartialIngest {
        batch_id: Uuid,
        stored_ids: Vec<Uuid>,
        source: Box<Error>,
    },

    /// Work was stopped by a cancellation request
    #[error("Operation cancelled")]
    Cancelled,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector index error
    pub fn vector_db(message: impl Into<String>) -> Self {
        Self::VectorDb(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether repeating the failed call could succeed.
    ///
    /// Input, configuration and invariant violations are final; transport
    /// failures, timeouts and storage contention are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Embedding(_)
            | Error::Llm(_)
            | Error::Timeout { .. }
            | Error::Http(_)
            | Error::Io(_) => true,
            Error::VectorDb(_) => true,
            Error::Config(_)
            | Error::InvalidInput(_)
            | Error::UnsupportedFileType(_)
            | Error::FileParse { .. }
            | Error::DuplicateId(_)
            | Error::DimensionMismatch { .. }
            | Error::PartialIngest { .. }
            | Error::Cancelled
            | Error::Json(_)
            | Error::Internal(_) => false,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ffi::{SQLITE_CONSTRAINT_PRIMARYKEY, SQLITE_CONSTRAINT_UNIQUE};

        match &err {
            rusqlite::Error::SqliteFailure(code, _)
                if code.code == rusqlite::ErrorCode::ConstraintViolation
                    && matches!(
                        code.extended_code,
                        SQLITE_CONSTRAINT_PRIMARYKEY | SQLITE_CONSTRAINT_UNIQUE
                    ) =>
            {
                Error::DuplicateId(err.to_string())
            }
            _ => Error::VectorDb(err.to_string()),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            Error::Config(msg) => (StatusCode::BAD_REQUEST, "config_error", msg.clone()),
            Error::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "invalid_input", msg.clone()),
            Error::UnsupportedFileType(ext) => (
                StatusCode::BAD_REQUEST,
                "unsupported_type",
                format!("Unsupported file type: {}", ext),
            ),
            Error::FileParse { filename, message } => (
                StatusCode::BAD_REQUEST,
                "parse_error",
                format!("Failed to parse '{}': {}", filename, message),
            ),
            Error::Embedding(msg) => (StatusCode::BAD_GATEWAY, "embedding_error", msg.clone()),
            Error::VectorDb(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "vector_db_error", msg.clone())
            }
            Error::DuplicateId(msg) => (StatusCode::CONFLICT, "duplicate_id", msg.clone()),
            Error::PartialIngest { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "partial_ingest",
                self.to_string(),
            ),
            Error::DimensionMismatch { .. } => (
                StatusCode::CONFLICT,
                "dimension_mismatch",
                self.to_string(),
            ),
            Error::Llm(msg) => (StatusCode::SERVICE_UNAVAILABLE, "llm_error", msg.clone()),
            Error::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "timeout", self.to_string()),
            Error::Cancelled => (StatusCode::CONFLICT, "cancelled", self.to_string()),
            Error::Io(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "io_error",
                err.to_string(),
            ),
            Error::Json(err) => (StatusCode::BAD_REQUEST, "json_error", err.to_string()),
            Error::Http(err) => (StatusCode::BAD_GATEWAY, "http_error", err.to_string()),
            Error::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone())
            }
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(Error::embedding("connection refused").is_retryable());
        assert!(Error::Timeout { operation: "embed".into(), secs: 5 }.is_retryable());
        assert!(Error::vector_db("database is locked").is_retryable());

        assert!(!Error::DuplicateId("entries.id".into()).is_retryable());
        assert!(!Error::InvalidInput("empty question".into()).is_retryable());
        assert!(!Error::DimensionMismatch {
            collection: "docs".into(),
            expected: 768,
            actual: 384,
        }
        .is_retryable());
        assert!(!Error::Cancelled.is_retryable());
    }

    #[test]
    fn test_error_status_codes() {
        let response = Error::InvalidInput("n_results must be positive".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = Error::llm("model not loaded").into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = Error::DuplicateId("entries.id".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_constraint_violation_maps_to_duplicate_id() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id TEXT PRIMARY KEY); INSERT INTO t VALUES ('a');")
            .unwrap();
        let err: Error = conn.execute("INSERT INTO t VALUES ('a')", []).unwrap_err().into();
        assert!(matches!(err, Error::DuplicateId(_)));

        let err: Error = conn.execute("INSERT INTO missing VALUES (1)", []).unwrap_err().into();
        assert!(matches!(err, Error::VectorDb(_)));
    }

    #[test]
    fn test_partial_ingest_keeps_cause() {
        let err = Error::PartialIngest {
            batch_id: Uuid::nil(),
            stored_ids: vec![Uuid::new_v4(), Uuid::new_v4()],
            source: Box::new(Error::vector_db("disk I/O error")),
        };
        assert!(err.to_string().contains("after storing 2 chunks"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_retryable());
    }
}
