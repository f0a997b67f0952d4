//! Pure-Rust text extraction backends. The MuPDF backend lives in its own
//! crate behind the `mupdf` feature.

mod container;
mod page_objects;

pub(crate) use container::decode_pdf_string;
pub use container::LopdfBackend;
pub use page_objects::PdfExtractBackend;

use pdfmeta_core::PdfBackend;

/// The default fallback chain: structured text first, then page objects,
/// then the raw container.
pub fn default_backends() -> Vec<Box<dyn PdfBackend>> {
    let mut backends: Vec<Box<dyn PdfBackend>> = Vec::new();
    #[cfg(feature = "mupdf")]
    backends.push(Box::new(pdfmeta_pdf_mupdf::MupdfBackend::new()));
    backends.push(Box::new(PdfExtractBackend::new()));
    backends.push(Box::new(LopdfBackend::new()));
    backends
}
