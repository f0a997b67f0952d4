use std::path::Path;

use lopdf::content::Content;
use lopdf::{Document, Object};

use pdfmeta_core::{BackendError, PdfBackend, join_pages};

/// TJ offsets more negative than this (in thousandths of an em) are wide
/// enough to be a word gap rather than kerning.
const TJ_SPACE_THRESHOLD: f64 = -200.0;

/// Low-level container backend: decodes each page's content stream with
/// lopdf and collects the operands of the text-showing operators.
///
/// It knows nothing about font encodings beyond UTF-16BE and Latin-1, so it
/// is the last resort in the chain.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfBackend;

impl LopdfBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PdfBackend for LopdfBackend {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn extract_text(&self, path: &Path, max_pages: usize) -> Result<String, BackendError> {
        let doc = Document::load(path).map_err(|e| BackendError::OpenError(e.to_string()))?;

        let mut pages_text = Vec::new();
        for (_, page_id) in doc.get_pages().into_iter().take(max_pages) {
            let bytes = doc
                .get_page_content(page_id)
                .map_err(|e| BackendError::ExtractionError(e.to_string()))?;
            let content =
                Content::decode(&bytes).map_err(|e| BackendError::ExtractionError(e.to_string()))?;
            pages_text.push(text_from_content(&content));
        }

        Ok(join_pages(pages_text))
    }
}

fn push_line_break(text: &mut String) {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
}

fn text_from_content(content: &Content) -> String {
    let mut text = String::new();

    for op in &content.operations {
        match op.operator.as_str() {
            "Tj" => {
                if let Some(s) = op.operands.first().and_then(string_operand) {
                    text.push_str(&s);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    for item in items {
                        match item {
                            Object::Integer(n) if (*n as f64) < TJ_SPACE_THRESHOLD => {
                                text.push(' ')
                            }
                            Object::Real(n) if f64::from(*n) < TJ_SPACE_THRESHOLD => {
                                text.push(' ')
                            }
                            other => {
                                if let Some(s) = string_operand(other) {
                                    text.push_str(&s);
                                }
                            }
                        }
                    }
                }
            }
            // ' moves to the next line and shows its only operand; " does the
            // same with word and char spacing as the first two operands.
            "'" => {
                push_line_break(&mut text);
                if let Some(s) = op.operands.first().and_then(string_operand) {
                    text.push_str(&s);
                }
            }
            "\"" => {
                push_line_break(&mut text);
                if let Some(s) = op.operands.get(2).and_then(string_operand) {
                    text.push_str(&s);
                }
            }
            "Td" | "TD" | "T*" => push_line_break(&mut text),
            _ => {}
        }
    }

    text
}

fn string_operand(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
        _ => None,
    }
}

/// Decode a PDF string object: UTF-16BE when it carries a byte-order mark,
/// otherwise one byte per character (Latin-1, close enough to PDFDocEncoding
/// for the printable range).
pub(crate) fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}
