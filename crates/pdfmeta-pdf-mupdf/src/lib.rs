use std::path::Path;

use mupdf::{Document, TextPageFlags};

use pdfmeta_core::{BackendError, PdfBackend, join_pages};

/// MuPDF structured-text implementation of [`PdfBackend`].
///
/// This crate is the sole AGPL island: it isolates the mupdf dependency
/// (which is AGPL-3.0) so that builds without the `mupdf` feature of
/// `pdfmeta-ingest` do not transitively depend on it.
///
/// Text is read block by block and line by line, so running headers stay in
/// the output. On a first page those headers usually carry the journal name,
/// ISSN and DOI, which the field recognizers need.
#[derive(Debug, Clone, Copy)]
pub struct MupdfBackend {
    flags: TextPageFlags,
}

impl Default for MupdfBackend {
    fn default() -> Self {
        Self {
            flags: TextPageFlags::empty(),
        }
    }
}

impl MupdfBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the MuPDF structured-text flags (e.g. to preserve ligatures).
    pub fn with_flags(mut self, flags: TextPageFlags) -> Self {
        self.flags = flags;
        self
    }
}

fn extraction_err(e: mupdf::Error) -> BackendError {
    BackendError::ExtractionError(e.to_string())
}

impl PdfBackend for MupdfBackend {
    fn name(&self) -> &'static str {
        "mupdf"
    }

    fn extract_text(&self, path: &Path, max_pages: usize) -> Result<String, BackendError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| BackendError::OpenError("invalid path encoding".into()))?;

        let document =
            Document::open(path_str).map_err(|e| BackendError::OpenError(e.to_string()))?;

        let mut pages_text = Vec::new();

        for page_result in document.pages().map_err(extraction_err)?.take(max_pages) {
            let page = page_result.map_err(extraction_err)?;
            let text_page = page.to_text_page(self.flags).map_err(extraction_err)?;

            let mut page_text = String::new();
            for block in text_page.blocks() {
                for line in block.lines() {
                    page_text.extend(line.chars().map(|c| c.char().unwrap_or('\u{FFFD}')));
                    page_text.push('\n');
                }
            }
            pages_text.push(page_text);
        }

        Ok(join_pages(pages_text))
    }
}
