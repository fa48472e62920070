//! Document, chunk and index entry types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;
use uuid::Uuid;

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Plain text file
    Txt,
    /// Anything else
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "txt" | "text" => Self::Txt,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from the final `.`-suffix of a file name
    pub fn from_filename(filename: &str) -> Self {
        match filename.rsplit_once('.') {
            Some((_, ext)) => Self::from_extension(ext),
            None => Self::Unknown,
        }
    }

    /// Check if this is a supported file type
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// An uploaded file: original name plus raw bytes
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// File name as uploaded; the extension selects the extractor
    pub name: String,
    /// Raw file content
    pub data: Vec<u8>,
}

impl SourceFile {
    /// Create a new source file
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// File type derived from the name
    pub fn file_type(&self) -> FileType {
        FileType::from_filename(&self.name)
    }
}

/// Byte range of one source file inside a batch document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpan {
    /// Originating file name
    pub filename: String,
    /// Byte range within [`Document::text`]
    pub range: Range<usize>,
}

/// The text of one ingestion batch.
///
/// Every extracted file is appended followed by a newline, so one batch
/// yields exactly one logical document. Transient: never stored.
#[derive(Debug, Clone)]
pub struct Document {
    /// Identifier of the ingestion call that produced this document
    pub batch_id: Uuid,
    /// Concatenated extracted text
    pub text: String,
    /// Where each source file landed in `text`, in input order
    pub sources: Vec<SourceSpan>,
}

impl Document {
    /// Create an empty document for a batch
    pub fn new(batch_id: Uuid) -> Self {
        Self {
            batch_id,
            text: String::new(),
            sources: Vec::new(),
        }
    }

    /// Append a file's extracted text, followed by a newline
    pub fn append(&mut self, filename: &str, text: &str) {
        let start = self.text.len();
        self.text.push_str(text);
        let end = self.text.len();
        self.text.push('\n');
        self.sources.push(SourceSpan {
            filename: filename.to_string(),
            range: start..end,
        });
    }

    /// Names of the source files overlapping a byte range of `text`
    pub fn sources_for(&self, range: &Range<usize>) -> Vec<String> {
        self.sources
            .iter()
            .filter(|span| span.range.start < range.end && range.start < span.range.end)
            .map(|span| span.filename.clone())
            .collect()
    }

    /// Whether no text was extracted
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A retrievable unit cut from a [`Document`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Globally unique chunk ID, assigned before any concurrent work
    pub id: Uuid,
    /// 0-based sequence number in document order within the batch
    pub chunk_id: u32,
    /// Ingestion batch that produced the chunk
    pub batch_id: Uuid,
    /// Text content
    pub content: String,
    /// Byte range of the chunk in the batch document
    pub byte_start: usize,
    pub byte_end: usize,
    /// Files the chunk's text came from
    pub sources: Vec<String>,
}

impl Chunk {
    /// Convert to index metadata
    pub fn to_metadata(&self) -> HashMap<String, serde_json::Value> {
        let mut meta = HashMap::new();
        meta.insert("chunk_id".to_string(), serde_json::json!(self.chunk_id));
        meta.insert("batch_id".to_string(), serde_json::json!(self.batch_id.to_string()));
        meta.insert("sources".to_string(), serde_json::json!(self.sources));
        meta
    }

    /// Pair the chunk with its embedding for insertion
    pub fn into_entry(self, embedding: Vec<f32>) -> IndexEntry {
        IndexEntry {
            id: self.id,
            chunk_index: self.chunk_id,
            metadata: self.to_metadata(),
            content: self.content,
            embedding,
        }
    }
}

/// One (text, vector, metadata) triple as stored in a collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Entry ID, unique within its collection
    pub id: Uuid,
    /// Sequence number of the chunk within its batch
    pub chunk_index: u32,
    /// Chunk text
    pub content: String,
    /// Embedding vector
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
    /// Arbitrary metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_detection() {
        assert_eq!(FileType::from_filename("report.PDF"), FileType::Pdf);
        assert_eq!(FileType::from_filename("notes.docx"), FileType::Docx);
        assert_eq!(FileType::from_filename("a.b.txt"), FileType::Txt);
        assert_eq!(FileType::from_filename("data.csv"), FileType::Unknown);
        assert_eq!(FileType::from_filename("README"), FileType::Unknown);
        assert!(!FileType::Unknown.is_supported());
    }

    #[test]
    fn test_document_sources_for_range() {
        let mut doc = Document::new(Uuid::new_v4());
        doc.append("a.txt", "alpha");
        doc.append("b.txt", "beta");

        assert_eq!(doc.text, "alpha\nbeta\n");
        assert_eq!(doc.sources_for(&(0..5)), vec!["a.txt".to_string()]);
        assert_eq!(doc.sources_for(&(6..10)), vec!["b.txt".to_string()]);
        assert_eq!(doc.sources_for(&(3..8)), vec!["a.txt".to_string(), "b.txt".to_string()]);
    }

    #[test]
    fn test_chunk_metadata() {
        let batch_id = Uuid::new_v4();
        let chunk = Chunk {
            id: Uuid::new_v4(),
            chunk_id: 3,
            batch_id,
            content: "text".to_string(),
            byte_start: 0,
            byte_end: 4,
            sources: vec!["a.txt".to_string()],
        };

        let entry = chunk.into_entry(vec![0.5, 0.5]);
        assert_eq!(entry.chunk_index, 3);
        assert_eq!(entry.metadata["chunk_id"], serde_json::json!(3));
        assert_eq!(entry.metadata["batch_id"], serde_json::json!(batch_id.to_string()));
        assert_eq!(entry.metadata["sources"], serde_json::json!(["a.txt"]));
    }
}
