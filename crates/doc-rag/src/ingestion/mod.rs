//! Document ingestion: text extraction and chunking

mod chunker;
mod parser;

pub use chunker::{Chunks, TextChunk, TextChunker};
pub use parser::{FileParser, TextExtractor};
