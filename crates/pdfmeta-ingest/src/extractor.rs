use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;

use pdfmeta_core::{ExtractError, ExtractionResult, PdfBackend};

use crate::backends::default_backends;

pub const DEFAULT_MAX_PAGES: usize = 5;
pub const DEFAULT_MIN_TEXT_CHARS: usize = 100;

/// Runs an ordered list of [`PdfBackend`]s and returns the first output that
/// is long enough to be real text.
///
/// Backend errors and panics are logged and absorbed; callers only ever see
/// `FileNotFound`, `NotAPdf` or `ExtractionFailed`.
pub struct TextExtractor {
    backends: Vec<Box<dyn PdfBackend>>,
    min_text_chars: usize,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor {
    /// Extractor with the default backend chain.
    pub fn new() -> Self {
        Self::with_backends(default_backends())
    }

    /// Extractor with an explicit backend chain, tried in order.
    pub fn with_backends(backends: Vec<Box<dyn PdfBackend>>) -> Self {
        Self {
            backends,
            min_text_chars: DEFAULT_MIN_TEXT_CHARS,
        }
    }

    /// Output must be strictly longer than `chars` characters to be accepted.
    pub fn with_min_text_chars(mut self, chars: usize) -> Self {
        self.min_text_chars = chars;
        self
    }

    pub fn backend_names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    pub fn extract_text(&self, path: &Path) -> ExtractionResult {
        self.extract_text_with_max_pages(path, DEFAULT_MAX_PAGES)
    }

    pub fn extract_text_with_max_pages(&self, path: &Path, max_pages: usize) -> ExtractionResult {
        if let Err(e) = check_pdf_path(path) {
            return ExtractionResult::failed(e);
        }

        for backend in &self.backends {
            let name = backend.name();
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                backend.extract_text(path, max_pages)
            }));

            match outcome {
                Ok(Ok(text)) => {
                    let chars = text.chars().count();
                    if chars > self.min_text_chars {
                        tracing::debug!(backend = name, chars, path = %path.display(), "text extracted");
                        return ExtractionResult::ok(text);
                    }
                    tracing::debug!(backend = name, chars, "backend output below threshold, trying next");
                }
                Ok(Err(e)) => {
                    tracing::warn!(backend = name, error = %e, path = %path.display(), "backend failed");
                }
                Err(_) => {
                    tracing::warn!(backend = name, path = %path.display(), "backend panicked");
                }
            }
        }

        ExtractionResult::failed(ExtractError::ExtractionFailed)
    }
}

/// Preconditions checked before any backend runs: the file exists and has a
/// `.pdf` extension (any case).
pub fn check_pdf_path(path: &Path) -> Result<(), ExtractError> {
    if !path.exists() {
        return Err(ExtractError::FileNotFound(path.to_path_buf()));
    }
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return Err(ExtractError::NotAPdf);
    }
    Ok(())
}
