use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;

use pdfmeta_core::{Config, ExtractedMetadata, MetadataSource};
use pdfmeta_parsing as fields;

use crate::extractor::{DEFAULT_MAX_PAGES, TextExtractor};

/// Assembles [`ExtractedMetadata`] for one PDF: one text extraction, then
/// every field recognizer over the same text.
pub struct MetadataExtractor {
    text: TextExtractor,
    max_pages: usize,
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataExtractor {
    pub fn new() -> Self {
        Self::with_text_extractor(TextExtractor::new())
    }

    pub fn with_text_extractor(text: TextExtractor) -> Self {
        Self {
            text,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            text: TextExtractor::new().with_min_text_chars(config.min_text_chars),
            max_pages: config.max_pages,
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn text_extractor(&self) -> &TextExtractor {
        &self.text
    }

    /// Extract and recognize. When no text can be extracted the result has
    /// `success == false`, the error message set and no recognizer runs.
    pub fn extract_metadata(&self, path: &Path) -> ExtractedMetadata {
        let extraction = self.text.extract_text_with_max_pages(path, self.max_pages);
        match extraction.into_result() {
            Ok(text) => recognize(&text),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "no text, skipping recognizers");
                ExtractedMetadata::failed(e.to_string())
            }
        }
    }
}

impl MetadataSource for MetadataExtractor {
    fn extract_metadata(&self, path: &Path) -> ExtractedMetadata {
        MetadataExtractor::extract_metadata(self, path)
    }
}

/// Run every field recognizer over already-extracted text.
///
/// A recognizer that panics is logged and its field left empty; the other
/// fields are unaffected.
pub fn recognize(text: &str) -> ExtractedMetadata {
    ExtractedMetadata {
        title: guarded("titulo", || fields::extract_title(text)),
        authors: guarded("autores", || fields::extract_authors(text)),
        year: guarded("anio_publicacion", || fields::extract_year(text)),
        doi: guarded("doi", || fields::extract_doi(text)),
        issn: guarded("issn", || fields::extract_issn(text)),
        abstract_text: guarded("resumen", || fields::extract_abstract(text)),
        keywords: guarded("palabras_clave", || fields::extract_keywords(text)),
        emails: guarded("emails", || fields::extract_emails(text)),
        success: true,
        error: None,
    }
}

fn guarded<T: Default>(field: &'static str, recognizer: impl FnOnce() -> T) -> T {
    catch_unwind(AssertUnwindSafe(recognizer)).unwrap_or_else(|_| {
        tracing::warn!(field, "recognizer panicked, leaving field empty");
        T::default()
    })
}

/// Extract metadata with the default backend chain.
pub fn extract_metadata(path: &Path) -> ExtractedMetadata {
    MetadataExtractor::new().extract_metadata(path)
}
