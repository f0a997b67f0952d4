use std::sync::Arc;

use pdfmeta_batch::{BatchIngestionCoordinator, SessionStore};
use pdfmeta_core::MetadataSource;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub coordinator: Arc<BatchIngestionCoordinator>,
    pub sessions: Arc<dyn SessionStore>,
    /// Used by the single-file extraction endpoint.
    pub metadata: Arc<dyn MetadataSource>,
}
