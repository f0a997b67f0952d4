//! Batch ingestion: a bounded worker pool that saves, extracts and persists
//! uploaded PDFs, isolating per-file failures and reporting live progress.

use std::time::Duration;

use serde::{Serialize, Serializer};
use thiserror::Error;

use pdfmeta_core::FieldPresence;

pub mod coordinator;
pub mod pipeline;
pub mod session;

pub use coordinator::{BatchIngestionCoordinator, BatchOptions, ProgressCallback};
pub use pipeline::{CommitGate, Pipeline};
pub use session::{
    InMemorySessionStore, SessionProgress, SessionStatus, SessionStore, UploadSession,
    cleanup_old_sessions, create_upload_session, new_session_id,
};

/// One uploaded file as received from the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

/// Request-level validation failure. Reported before any file is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("no files were provided")]
    NoFiles,
    #[error("too many files: at most {max} per batch, got {got}")]
    TooManyFiles { max: usize, got: usize },
}

/// Why a single file did not become an article.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FileError {
    #[error("failed to save file: {0}")]
    Storage(String),
    #[error("metadata extraction failed: {0}")]
    Extraction(String),
    #[error("failed to persist article: {0}")]
    Persistence(String),
    #[error("processing timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("batch cancelled before this file was processed")]
    Cancelled,
    #[error("worker panicked: {0}")]
    Panicked(String),
}

/// A file that became an article.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileOutcome {
    pub filename: String,
    pub article_id: i64,
    pub title: String,
    pub confidence: f64,
    pub processing_time_seconds: f64,
    pub extracted_fields: FieldPresence,
    /// Author linkage failed after the article was stored; the article is
    /// kept and flagged incomplete.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub authors_incomplete: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileFailure {
    pub filename: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: FileError,
}

fn serialize_display<S: Serializer>(error: &FileError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(error)
}

/// Aggregated result of one batch. `total == success + errors` always holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchResult {
    pub total: usize,
    pub success: usize,
    pub errors: usize,
    pub results: Vec<FileOutcome>,
    pub error_details: Vec<FileFailure>,
}

/// Reject an empty batch or one over the per-request limit.
pub fn validate_batch(files: &[UploadedFile], max_files: usize) -> Result<(), BatchError> {
    if files.is_empty() {
        return Err(BatchError::NoFiles);
    }
    if files.len() > max_files {
        return Err(BatchError::TooManyFiles {
            max: max_files,
            got: files.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation() {
        assert_eq!(validate_batch(&[], 10), Err(BatchError::NoFiles));

        let files: Vec<_> = (0..11)
            .map(|i| UploadedFile::new(format!("{i}.pdf"), b"x".to_vec()))
            .collect();
        assert_eq!(
            validate_batch(&files, 10),
            Err(BatchError::TooManyFiles { max: 10, got: 11 })
        );
        assert!(validate_batch(&files[..10], 10).is_ok());
    }

    #[test]
    fn result_serializes_with_error_messages() {
        let result = BatchResult {
            total: 2,
            success: 1,
            errors: 1,
            results: vec![FileOutcome {
                filename: "a.pdf".into(),
                article_id: 7,
                title: "T".into(),
                confidence: 0.5,
                processing_time_seconds: 0.25,
                extracted_fields: FieldPresence {
                    titulo: true,
                    autores: 2,
                    ..Default::default()
                },
                authors_incomplete: false,
            }],
            error_details: vec![FileFailure {
                filename: "b.pdf".into(),
                error: FileError::Timeout(Duration::from_secs(120)),
            }],
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["total"], 2);
        assert_eq!(json["results"][0]["extracted_fields"]["autores"], 2);
        assert_eq!(json["results"][0]["extracted_fields"]["doi"], false);
        assert!(json["results"][0].get("authors_incomplete").is_none());
        assert_eq!(
            json["error_details"][0]["error"],
            "processing timed out after 120s"
        );
    }
}
