use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use pdfmeta_batch::{BatchResult, SessionProgress};
use pdfmeta_core::{ExtractedMetadata, PdfInfo};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// JSON `{"error": ...}` with the given status.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Reply to a background batch submission.
#[derive(Debug, Serialize)]
pub struct AsyncBatchResponse {
    pub session_id: String,
    pub total: usize,
    pub status_url: String,
}

/// Progress of an upload session, plus the final result once it is done.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub progress: SessionProgress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<BatchResult>,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub filename: String,
    pub metadata: ExtractedMetadata,
    pub pdf_info: PdfInfo,
}
