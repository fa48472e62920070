//! Recursive overlapping text chunker
//!
//! Text is split on the coarsest separator it contains (paragraph, line,
//! sentence, word, character). Pieces shorter than the chunk size are merged
//! greedily into chunks, carrying up to `overlap` characters of trailing
//! pieces into the next chunk. Pieces that are too long are split again with
//! the next separator. All lengths are counted in characters.

use std::collections::VecDeque;
use std::ops::Range;
use uuid::Uuid;

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{Chunk, Document};

/// Separators from coarsest to finest; `""` splits between characters
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " ", ""];

/// One chunk borrowed from the chunked text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunk<'a> {
    /// 0-based position in the chunk sequence
    pub index: u32,
    /// Chunk text, trimmed of surrounding whitespace
    pub text: &'a str,
    /// Byte offset of `text` in the input
    pub start: usize,
}

impl TextChunk<'_> {
    /// Byte range of the chunk in the input
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.text.len()
    }
}

/// Text chunker with configurable size and overlap
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    /// Target chunk size in characters
    chunk_size: usize,
    /// Overlap between chunks in characters
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker. `overlap` must be smaller than `chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidInput("chunk_size must be greater than zero".to_string()));
        }
        if overlap >= chunk_size {
            return Err(Error::InvalidInput(format!(
                "overlap ({}) must be less than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self { chunk_size, overlap })
    }

    /// Create a chunker from configuration
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Lazily split `text` into chunks
    pub fn chunks<'a>(&self, text: &'a str) -> Chunks<'a> {
        Chunks::new(text, self.chunk_size, self.overlap)
    }

    /// Chunk a batch document, assigning ids and sequence numbers in
    /// document order
    pub fn chunk_document<'a>(&self, doc: &'a Document) -> impl Iterator<Item = Chunk> + 'a {
        self.chunks(&doc.text).map(move |piece| {
            let range = piece.range();
            Chunk {
                id: Uuid::new_v4(),
                chunk_id: piece.index,
                batch_id: doc.batch_id,
                content: piece.text.to_string(),
                byte_start: range.start,
                byte_end: range.end,
                sources: doc.sources_for(&range),
            }
        })
    }
}

/// Split state for one segment of the input at one separator level
#[derive(Debug)]
struct Frame {
    pos: usize,
    end: usize,
    separator: &'static str,
    finer: &'static [&'static str],
    /// Pieces waiting to be merged, with their char lengths
    pending: VecDeque<(Range<usize>, usize)>,
    total: usize,
}

impl Frame {
    fn new(text: &str, range: Range<usize>, separators: &'static [&'static str]) -> Self {
        let segment = &text[range.clone()];
        let level = separators
            .iter()
            .position(|sep| sep.is_empty() || segment.contains(sep))
            .unwrap_or(separators.len().saturating_sub(1));
        Self {
            pos: range.start,
            end: range.end,
            separator: separators.get(level).copied().unwrap_or(""),
            finer: separators.get(level + 1..).unwrap_or(&[]),
            pending: VecDeque::new(),
            total: 0,
        }
    }

    /// Next piece of the segment, separator attached to its end
    fn next_piece(&mut self, text: &str) -> Option<Range<usize>> {
        if self.pos >= self.end {
            return None;
        }
        let rest = &text[self.pos..self.end];
        let len = if self.separator.is_empty() {
            rest.chars().next().map_or(rest.len(), char::len_utf8)
        } else {
            rest.find(self.separator)
                .map_or(rest.len(), |i| i + self.separator.len())
        };
        let piece = self.pos..self.pos + len;
        self.pos = piece.end;
        Some(piece)
    }

    /// Add a short piece, emitting a chunk first if it would not fit
    fn push(&mut self, piece: Range<usize>, len: usize, size: usize, overlap: usize, ready: &mut VecDeque<Range<usize>>) {
        if self.total + len > size && !self.pending.is_empty() {
            ready.push_back(self.merged());
            while self.total > overlap || (self.total + len > size && self.total > 0) {
                match self.pending.pop_front() {
                    Some((_, dropped)) => self.total -= dropped,
                    None => break,
                }
            }
        }
        self.pending.push_back((piece, len));
        self.total += len;
    }

    /// Emit whatever is pending; nothing carries over
    fn flush(&mut self, ready: &mut VecDeque<Range<usize>>) {
        if !self.pending.is_empty() {
            ready.push_back(self.merged());
            self.pending.clear();
            self.total = 0;
        }
    }

    fn merged(&self) -> Range<usize> {
        match (self.pending.front(), self.pending.back()) {
            (Some((first, _)), Some((last, _))) => first.start..last.end,
            _ => self.pos..self.pos,
        }
    }
}

/// Lazy chunk sequence produced by [`TextChunker::chunks`]
#[derive(Debug)]
pub struct Chunks<'a> {
    text: &'a str,
    chunk_size: usize,
    overlap: usize,
    stack: Vec<Frame>,
    ready: VecDeque<Range<usize>>,
    next_index: u32,
}

impl<'a> Chunks<'a> {
    fn new(text: &'a str, chunk_size: usize, overlap: usize) -> Self {
        let stack = if text.is_empty() {
            Vec::new()
        } else {
            vec![Frame::new(text, 0..text.len(), SEPARATORS)]
        };
        Self {
            text,
            chunk_size,
            overlap,
            stack,
            ready: VecDeque::new(),
            next_index: 0,
        }
    }

    /// Trim a merged range; whitespace-only ranges yield nothing
    fn finish(&mut self, range: Range<usize>) -> Option<TextChunk<'a>> {
        let raw = &self.text[range.clone()];
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let start = range.start + (raw.len() - raw.trim_start().len());
        let chunk = TextChunk {
            index: self.next_index,
            text: trimmed,
            start,
        };
        self.next_index += 1;
        Some(chunk)
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = TextChunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            while let Some(range) = self.ready.pop_front() {
                if let Some(chunk) = self.finish(range) {
                    return Some(chunk);
                }
            }

            let text = self.text;
            let frame = self.stack.last_mut()?;
            let Some(piece) = frame.next_piece(text) else {
                frame.flush(&mut self.ready);
                self.stack.pop();
                continue;
            };

            let len = text[piece.clone()].chars().count();
            if len < self.chunk_size {
                frame.push(piece, len, self.chunk_size, self.overlap, &mut self.ready);
                continue;
            }

            frame.flush(&mut self.ready);
            if frame.finer.is_empty() {
                self.ready.push_back(piece);
            } else {
                let finer = frame.finer;
                self.stack.push(Frame::new(text, piece, finer));
            }
        }
    }
}

impl std::iter::FusedIterator for Chunks<'_> {}
