use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

pub mod backend;
pub mod config_file;

pub use backend::{BackendError, PdfBackend, join_pages};

/// Labels used for the six core bibliographic fields when reporting what
/// extraction could not find.
pub const CORE_FIELD_LABELS: [&str; 6] = ["titulo", "autores", "año", "DOI", "ISSN", "resumen"];

/// Public extraction error taxonomy.
///
/// `BackendError` never escapes the text extractor; callers only ever see
/// these three variants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("file is not a PDF")]
    NotAPdf,
    #[error("could not extract text; file may be protected or image-based")]
    ExtractionFailed,
}

/// Outcome of one text-extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub success: bool,
    pub text: Option<String>,
    pub error: Option<ExtractError>,
}

impl ExtractionResult {
    pub fn ok(text: String) -> Self {
        Self {
            success: true,
            text: Some(text),
            error: None,
        }
    }

    pub fn failed(error: ExtractError) -> Self {
        Self {
            success: false,
            text: None,
            error: Some(error),
        }
    }

    /// Convert into a `Result`, for callers that prefer `?`.
    pub fn into_result(self) -> Result<String, ExtractError> {
        match (self.text, self.error) {
            (Some(text), None) if self.success => Ok(text),
            (_, Some(err)) => Err(err),
            _ => Err(ExtractError::ExtractionFailed),
        }
    }
}

/// Structured bibliographic metadata recovered from one PDF.
///
/// The confidence score is never stored; [`ExtractedMetadata::confidence`]
/// derives it from field presence every time it is read, and serialization
/// emits the derived value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedMetadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub doi: Option<String>,
    pub issn: Option<String>,
    pub abstract_text: Option<String>,
    pub keywords: Vec<String>,
    pub emails: Vec<String>,
    pub success: bool,
    pub error: Option<String>,
}

/// Which of the six core fields were recognized. `autores` carries the
/// author count rather than a flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FieldPresence {
    pub titulo: bool,
    pub autores: usize,
    pub anio: bool,
    pub doi: bool,
    pub issn: bool,
    pub resumen: bool,
}

impl FieldPresence {
    fn flags(&self) -> [bool; 6] {
        [
            self.titulo,
            self.autores > 0,
            self.anio,
            self.doi,
            self.issn,
            self.resumen,
        ]
    }
}

impl ExtractedMetadata {
    /// Result for a file whose text could not be extracted. Every field is
    /// left at its empty default.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn field_presence(&self) -> FieldPresence {
        FieldPresence {
            titulo: non_empty(&self.title),
            autores: self.authors.len(),
            anio: self.year.is_some(),
            doi: non_empty(&self.doi),
            issn: non_empty(&self.issn),
            resumen: non_empty(&self.abstract_text),
        }
    }

    /// Fraction of the six core fields that were recognized.
    pub fn confidence(&self) -> f64 {
        let found = self
            .field_presence()
            .flags()
            .iter()
            .filter(|present| **present)
            .count();
        found as f64 / CORE_FIELD_LABELS.len() as f64
    }

    /// Labels of the core fields that are missing, in canonical order.
    pub fn missing_fields(&self) -> Vec<String> {
        self.field_presence()
            .flags()
            .iter()
            .zip(CORE_FIELD_LABELS)
            .filter(|(present, _)| !**present)
            .map(|(_, label)| label.to_string())
            .collect()
    }
}

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

impl Serialize for ExtractedMetadata {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut s = serializer.serialize_struct("ExtractedMetadata", 11)?;
        s.serialize_field("titulo", &self.title)?;
        s.serialize_field("autores", &self.authors)?;
        s.serialize_field("anio_publicacion", &self.year)?;
        s.serialize_field("doi", &self.doi)?;
        s.serialize_field("issn", &self.issn)?;
        s.serialize_field("resumen", &self.abstract_text)?;
        s.serialize_field("palabras_clave", &self.keywords)?;
        s.serialize_field("emails", &self.emails)?;
        s.serialize_field("success", &self.success)?;
        s.serialize_field("error", &self.error)?;
        s.serialize_field("confidence", &self.confidence())?;
        s.end()
    }
}

/// Container-level attributes of a PDF, independent of its text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PdfInfo {
    pub num_pages: Option<usize>,
    pub file_size: Option<u64>,
    pub encrypted: bool,
    pub pdf_version: Option<String>,
    pub metadata: BTreeMap<String, Option<String>>,
}

/// Anything that can turn a PDF path into assembled metadata.
///
/// Implementations must not panic or return early with an error: failures
/// are reported through `ExtractedMetadata::success`/`error`.
pub trait MetadataSource: Send + Sync {
    fn extract_metadata(&self, path: &Path) -> ExtractedMetadata;
}

/// Fallback catalog entries used when an article is created without an
/// explicit production type or status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogDefaults {
    pub production_type: String,
    pub status: String,
    pub status_color: String,
}

impl Default for CatalogDefaults {
    fn default() -> Self {
        Self {
            production_type: "Artículo científico".to_string(),
            status: "Publicado".to_string(),
            status_color: "#28a745".to_string(),
        }
    }
}

/// Runtime configuration shared by the extractor, the batch coordinator and
/// the binaries.
#[derive(Clone)]
pub struct Config {
    pub max_pages: usize,
    pub min_text_chars: usize,
    pub max_workers: usize,
    pub max_files_per_batch: usize,
    pub max_upload_bytes: u64,
    pub allowed_extensions: Vec<String>,
    pub upload_dir: PathBuf,
    pub database_path: PathBuf,
    pub per_file_timeout: Duration,
    pub session_max_age: Duration,
    pub catalog: CatalogDefaults,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("max_pages", &self.max_pages)
            .field("min_text_chars", &self.min_text_chars)
            .field("max_workers", &self.max_workers)
            .field("max_files_per_batch", &self.max_files_per_batch)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("allowed_extensions", &self.allowed_extensions)
            .field("upload_dir", &self.upload_dir)
            .field("database_path", &self.database_path)
            .field("per_file_timeout_secs", &self.per_file_timeout.as_secs())
            .field("session_max_age_hours", &(self.session_max_age.as_secs() / 3600))
            .field("catalog", &self.catalog)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_pages: 5,
            min_text_chars: 100,
            max_workers: 5,
            max_files_per_batch: 10,
            max_upload_bytes: 10 * 1024 * 1024,
            allowed_extensions: vec!["pdf".to_string()],
            upload_dir: PathBuf::from("uploads/pdfs"),
            database_path: PathBuf::from("instance/articulos.db"),
            per_file_timeout: Duration::from_secs(120),
            session_max_age: Duration::from_secs(24 * 3600),
            catalog: CatalogDefaults::default(),
        }
    }
}
