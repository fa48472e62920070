//! Text extraction for PDF, DOCX and plain-text uploads

use crate::error::{Error, Result};
use crate::types::FileType;

/// Characters PDF fonts commonly emit in place of plain ASCII
const GLYPH_REPLACEMENTS: &[(char, &str)] = &[
    ('\u{00A0}', " "),
    ('\u{2010}', "-"),
    ('\u{2011}', "-"),
    ('\u{2013}', "-"),
    ('\u{2014}', "--"),
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{2022}', "* "),
    ('\u{2026}', "..."),
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
];

/// Normalize raw PDF text: drop NULs, map glyph artifacts, trim lines and
/// remove blank ones.
fn cleanup_pdf_text(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch == '\0' {
            continue;
        }
        match GLYPH_REPLACEMENTS.iter().find(|(glyph, _)| *glyph == ch) {
            Some((_, replacement)) => normalized.push_str(replacement),
            None => normalized.push(ch),
        }
    }

    normalized
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Turns the bytes of one uploaded file into plain text.
///
/// Called on the blocking pool under the per-file timeout.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, filename: &str, data: &[u8]) -> Result<String>;
}

/// Converts an uploaded file into plain text, dispatching on its extension
#[derive(Debug, Clone, Copy, Default)]
pub struct FileParser;

impl TextExtractor for FileParser {
    fn extract(&self, filename: &str, data: &[u8]) -> Result<String> {
        FileParser::extract(filename, data)
    }
}

impl FileParser {
    /// Extract the full plain text of a file.
    ///
    /// Unsupported extensions return [`Error::UnsupportedFileType`]; a
    /// recognized format that cannot be read, or yields no text, returns
    /// [`Error::FileParse`].
    pub fn extract(filename: &str, data: &[u8]) -> Result<String> {
        match FileType::from_filename(filename) {
            FileType::Pdf => Self::extract_pdf(filename, data),
            FileType::Docx => Self::extract_docx(filename, data),
            FileType::Txt => Ok(Self::extract_text(data)),
            FileType::Unknown => {
                let extension = filename
                    .rsplit_once('.')
                    .map(|(_, ext)| ext.to_lowercase())
                    .unwrap_or_default();
                Err(Error::UnsupportedFileType(extension))
            }
        }
    }

    fn extract_text(data: &[u8]) -> String {
        String::from_utf8_lossy(data).into_owned()
    }

    fn extract_pdf(filename: &str, data: &[u8]) -> Result<String> {
        let raw = match pdf_extract::extract_text_from_mem(data) {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                tracing::debug!("pdf-extract found no text in {}, trying fallback", filename);
                Self::extract_pdf_fallback(filename, data)?
            }
            Err(e) => {
                tracing::warn!("pdf-extract failed on {}: {}, trying fallback", filename, e);
                Self::extract_pdf_fallback(filename, data)?
            }
        };

        let content = cleanup_pdf_text(&raw);
        if content.is_empty() {
            return Err(Error::file_parse(
                filename,
                "No text content could be extracted from PDF",
            ));
        }
        Ok(content)
    }

    /// Fallback PDF extraction straight from the page content streams
    fn extract_pdf_fallback(filename: &str, data: &[u8]) -> Result<String> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;

        let mut text = String::new();
        for page_number in doc.get_pages().keys() {
            match doc.extract_text(&[*page_number]) {
                Ok(page_text) => {
                    text.push_str(&page_text);
                    text.push('\n');
                }
                Err(e) => {
                    tracing::debug!("No text on page {} of {}: {}", page_number, filename, e);
                }
            }
        }

        if text.trim().is_empty() {
            return Err(Error::file_parse(
                filename,
                "PDF appears to be image-based or has no extractable text",
            ));
        }
        Ok(text)
    }

    fn extract_docx(filename: &str, data: &[u8]) -> Result<String> {
        let docx = docx_rs::read_docx(data).map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut paragraphs = Vec::new();
        for child in &docx.document.children {
            match child {
                docx_rs::DocumentChild::Paragraph(p) => paragraphs.push(paragraph_text(p)),
                docx_rs::DocumentChild::Table(table) => collect_table_text(table, &mut paragraphs),
                _ => {}
            }
        }

        let content = paragraphs.join("\n");
        if content.trim().is_empty() {
            return Err(Error::file_parse(filename, "Document contains no text"));
        }
        Ok(content)
    }
}

fn paragraph_text(paragraph: &docx_rs::Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let docx_rs::ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                match run_child {
                    docx_rs::RunChild::Text(t) => text.push_str(&t.text),
                    docx_rs::RunChild::Tab(_) => text.push('\t'),
                    _ => {}
                }
            }
        }
    }
    text
}

/// Every cell paragraph, row by row
fn collect_table_text(table: &docx_rs::Table, out: &mut Vec<String>) {
    for row in &table.rows {
        let docx_rs::TableChild::TableRow(row) = row;
        for cell in &row.cells {
            let docx_rs::TableRowChild::TableCell(cell) = cell;
            for content in &cell.children {
                match content {
                    docx_rs::TableCellContent::Paragraph(p) => out.push(paragraph_text(p)),
                    docx_rs::TableCellContent::Table(nested) => collect_table_text(nested, out),
                    _ => {}
                }
            }
        }
    }
}
