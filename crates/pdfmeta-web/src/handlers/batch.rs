use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use pdfmeta_batch::{BatchOptions, UploadedFile, create_upload_session};

use crate::models::{AsyncBatchResponse, SessionResponse, error_response};
use crate::state::AppState;
use crate::upload::{self, BATCH_FIELDS};

/// Parse and validate the uploaded batch, or produce the 400 reply.
async fn accept_batch(state: &AppState, multipart: Multipart) -> Result<Vec<UploadedFile>, Response> {
    let files = upload::parse_files(multipart, BATCH_FIELDS)
        .await
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e))?;
    state
        .coordinator
        .validate(&files)
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.to_string()))?;
    Ok(files)
}

/// `POST /api/articles/batch`: process the batch and reply with the result.
///
/// Per-file failures are part of the 200 payload; only request validation
/// (400) and an unexpected failure of the batch itself (500) change the status.
pub async fn batch(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let files = match accept_batch(&state, multipart).await {
        Ok(files) => files,
        Err(response) => return response,
    };

    let coordinator = Arc::clone(&state.coordinator);
    let run = tokio::spawn(async move { coordinator.process_files(files, None).await });

    match run.await {
        Ok(Ok(result)) => Json(result).into_response(),
        Ok(Err(e)) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        Err(e) => {
            tracing::error!(error = %e, "batch processing failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error while processing the batch",
            )
        }
    }
}

/// `POST /api/articles/batch/async`: start the batch in the background and
/// reply with a session id to poll.
pub async fn batch_async(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let files = match accept_batch(&state, multipart).await {
        Ok(files) => files,
        Err(response) => return response,
    };

    let total = files.len();
    let session = create_upload_session(state.sessions.as_ref(), total);
    let session_id = session.session_id;

    let options = BatchOptions::new().with_session(Arc::clone(&state.sessions), session_id.clone());
    let coordinator = Arc::clone(&state.coordinator);
    let sessions = Arc::clone(&state.sessions);
    let id = session_id.clone();

    tokio::spawn(async move {
        let run = tokio::spawn(async move { coordinator.process_files_tracked(files, options).await });
        let failed = match run.await {
            Ok(Ok(_)) => false,
            Ok(Err(e)) => {
                tracing::error!(session_id = %id, error = %e, "background batch rejected");
                true
            }
            Err(e) => {
                tracing::error!(session_id = %id, error = %e, "background batch failed");
                true
            }
        };
        if failed {
            sessions.update(&id, &mut |s: &mut pdfmeta_batch::UploadSession| s.mark_failed());
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(AsyncBatchResponse {
            status_url: format!("/api/articles/batch/{session_id}"),
            session_id,
            total,
        }),
    )
        .into_response()
}

/// `GET /api/articles/batch/{session_id}`: progress of a background batch.
pub async fn batch_status(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Response {
    match state.sessions.get(&session_id) {
        Some(session) => Json(SessionResponse {
            progress: session.progress(chrono::Local::now()),
            result: session.result,
        })
        .into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Upload session not found"),
    }
}
