use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for PDF text extraction backends.
///
/// Implementors provide the low-level text extraction step for at most
/// `max_pages` pages; the fallback chain and the length threshold live in
/// `pdfmeta_ingest::TextExtractor`. Errors returned here are soft: the
/// extractor logs them and moves on to the next backend.
pub trait PdfBackend: Send + Sync {
    /// Short identifier used in logs ("mupdf", "pdf-extract", ...).
    fn name(&self) -> &'static str;

    /// Extract the text of the first `max_pages` pages of a PDF file.
    fn extract_text(&self, path: &Path, max_pages: usize) -> Result<String, BackendError>;
}

/// Join per-page text with a blank line between pages, skipping pages that
/// produced no text at all.
pub fn join_pages<I>(pages: I) -> String
where
    I: IntoIterator<Item = String>,
{
    pages
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
