use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pdfmeta_batch::{BatchIngestionCoordinator, InMemorySessionStore, SessionStore, cleanup_old_sessions};
use pdfmeta_core::{Config, MetadataSource, config_file};
use pdfmeta_ingest::MetadataExtractor;

mod handlers;
mod models;
mod state;
mod upload;

use state::AppState;

const ENV_ADDR: &str = "PDFMETA_ADDR";
const DEFAULT_ADDR: &str = "0.0.0.0:5001";

/// Room for multipart framing on top of the file bytes themselves.
const MULTIPART_SLACK_BYTES: usize = 1024 * 1024;

const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdfmeta=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config_file::resolve_config();
    tracing::debug!(?config, "configuration resolved");

    let coordinator = BatchIngestionCoordinator::from_config(&config)?;
    let metadata: Arc<dyn MetadataSource> = Arc::new(MetadataExtractor::from_config(&config));
    let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());

    let state = Arc::new(AppState {
        coordinator: Arc::new(coordinator),
        sessions: Arc::clone(&sessions),
        metadata,
    });

    spawn_session_cleanup(sessions, config.session_max_age);

    let addr: SocketAddr = std::env::var(ENV_ADDR)
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        upload_dir = %config.upload_dir.display(),
        database = %config.database_path.display(),
        workers = config.max_workers,
        "listening"
    );

    axum::serve(listener, app(state, body_limit(&config)))
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutting down");
            }
        })
        .await?;

    Ok(())
}

/// Largest request body accepted: a full batch of maximum-size files.
fn body_limit(config: &Config) -> usize {
    (config.max_upload_bytes as usize)
        .saturating_mul(config.max_files_per_batch)
        .saturating_add(MULTIPART_SLACK_BYTES)
}

fn app(state: Arc<AppState>, body_limit: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/articles/extract", post(handlers::extract::extract))
        .route("/api/articles/batch", post(handlers::batch::batch))
        .route("/api/articles/batch/async", post(handlers::batch::batch_async))
        .route(
            "/api/articles/batch/{session_id}",
            get(handlers::batch::batch_status),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Periodically drop upload sessions older than `max_age`.
fn spawn_session_cleanup(sessions: Arc<dyn SessionStore>, max_age: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = cleanup_old_sessions(sessions.as_ref(), max_age);
            if removed > 0 {
                tracing::info!(removed, "expired upload sessions removed");
            }
        }
    });
}


#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use pdfmeta_core::Config;

    use crate::test_support::TestApp;

    #[tokio::test]
    async fn health_is_ok() {
        let app = TestApp::new(10);
        let response = app
            .router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"ok");
    }

    #[test]
    fn body_limit_covers_a_full_batch() {
        let config = Config::default();
        let limit = super::body_limit(&config);
        assert!(limit > config.max_upload_bytes as usize * config.max_files_per_batch);
    }
}
