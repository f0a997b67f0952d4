use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use pdfmeta_batch::UploadedFile;
use pdfmeta_core::MetadataSource;

use crate::models::{ExtractResponse, error_response};
use crate::state::AppState;
use crate::upload;

/// `POST /api/articles/extract`: recognize one PDF without storing anything.
///
/// The upload lives in a temporary directory for the duration of the call.
/// A file that is not a PDF still gets a 200 with `success: false` in the
/// metadata, the same shape the batch pipeline sees.
pub async fn extract(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let file = match upload::parse_single(multipart).await {
        Ok(file) => file,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    let metadata = Arc::clone(&state.metadata);
    let run = tokio::task::spawn_blocking(move || extract_upload(metadata.as_ref(), file));

    match run.await {
        Ok(Ok(response)) => Json(response).into_response(),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "could not stage upload for extraction");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to store the upload")
        }
        Err(e) => {
            tracing::error!(error = %e, "extraction task failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error while extracting metadata",
            )
        }
    }
}

fn extract_upload(
    metadata: &dyn MetadataSource,
    file: UploadedFile,
) -> std::io::Result<ExtractResponse> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join(pdfmeta_store::sanitize_filename(&file.filename));
    std::fs::write(&path, &file.bytes)?;

    let meta = metadata.extract_metadata(&path);
    let pdf_info = pdfmeta_ingest::get_pdf_info(&path);
    tracing::info!(
        filename = %file.filename,
        success = meta.success,
        confidence = meta.confidence(),
        "single file extracted"
    );

    Ok(ExtractResponse {
        filename: file.filename,
        metadata: meta,
        pdf_info,
    })
}
