//! Browser upload front-end: drag a DWFX in, get a PDF back.
//!
//! A deliberately small axum surface over the same shared [`Dispatcher`]
//! as the CLI front-ends:
//!
//! | Route | Method | Purpose |
//! |-------|--------|---------|
//! | `/`                    | GET  | embedded single-page upload UI |
//! | `/upload`              | POST | multipart upload, convert, per-file results |
//! | `/download/{filename}` | GET  | one converted PDF |
//! | `/download-all`        | POST | named PDFs bundled into a ZIP |
//! | `/api/files`           | GET  | live list of converted PDFs |
//!
//! Uploads need no debounce: upload completion is already a well-defined
//! event, so each staged file is submitted directly to the dispatcher.

mod handlers;

use crate::dispatch::Dispatcher;
use crate::error::Dwfx2PdfError;
use crate::store::ResultStore;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Largest accepted request body. Uploads beyond this are answered with
/// 413 before any staging happens.
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Shared state for the web handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub store: ResultStore,
    /// Staging area for uploaded bytes; entries live only for the duration
    /// of one conversion.
    pub upload_dir: PathBuf,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/upload", post(handlers::upload))
        .route("/download/{filename}", get(handlers::download))
        .route("/download-all", post(handlers::download_all))
        .route("/api/files", get(handlers::list_files))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(dispatcher: Dispatcher, addr: &str) -> Result<(), Dwfx2PdfError> {
    let config = dispatcher.config().clone();
    let upload_dir = PathBuf::from("uploads");

    std::fs::create_dir_all(&upload_dir).map_err(|source| Dwfx2PdfError::InputDirUnusable {
        path: upload_dir.clone(),
        source,
    })?;
    std::fs::create_dir_all(&config.output_dir).map_err(|source| {
        Dwfx2PdfError::OutputDirUnusable {
            path: config.output_dir.clone(),
            source,
        }
    })?;

    let state = AppState {
        store: ResultStore::new(&config.output_dir),
        dispatcher,
        upload_dir,
    };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| Dwfx2PdfError::ServerBind {
            addr: addr.to_string(),
            source,
        })?;

    info!("Web UI listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down web server");
        })
        .await
        .map_err(|e| Dwfx2PdfError::Internal(format!("server error: {e}")))
}
