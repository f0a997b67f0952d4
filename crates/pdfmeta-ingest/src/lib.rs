//! PDF ingestion: the text-extraction fallback chain, container info, and
//! metadata assembly on top of the field recognizers.

pub mod backends;
pub mod extractor;
pub mod info;
pub mod metadata;

// Re-export domain types for convenience
pub use pdfmeta_core::{ExtractError, ExtractedMetadata, ExtractionResult, PdfInfo};

pub use backends::{LopdfBackend, PdfExtractBackend, default_backends};
pub use extractor::{DEFAULT_MAX_PAGES, DEFAULT_MIN_TEXT_CHARS, TextExtractor, check_pdf_path};
pub use info::get_pdf_info;
pub use metadata::{MetadataExtractor, extract_metadata, recognize};

#[cfg(feature = "mupdf")]
pub use pdfmeta_pdf_mupdf::MupdfBackend;
