use std::path::Path;

use pdfmeta_core::{BackendError, PdfBackend, join_pages};

/// Page-object backend built on `pdf-extract`, which walks each page's
/// resources and fonts to map glyphs back to text.
///
/// `pdf-extract` is known to panic on some malformed fonts; the text
/// extractor runs every backend under `catch_unwind`, so a panic here
/// becomes a soft failure like any other.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractBackend;

impl PdfExtractBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PdfBackend for PdfExtractBackend {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn extract_text(&self, path: &Path, max_pages: usize) -> Result<String, BackendError> {
        let bytes = std::fs::read(path)?;
        let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes)
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?;

        Ok(join_pages(pages.into_iter().take(max_pages)))
    }
}
