//! Request handlers for the upload surface.

use super::AppState;
use crate::task::{ConversionTask, Outcome, INPUT_EXTENSION, OUTPUT_EXTENSION};
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path as UrlPath, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

/// Embedded single-page UI; no static-file serving, no template engine.
pub async fn index() -> Html<&'static str> {
    Html(include_str!("index.html"))
}

/// Per-file entry in the upload response.
#[derive(Debug, Serialize)]
struct UploadResult {
    name: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pdf_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl UploadResult {
    fn rejected(name: String, error: impl Into<String>) -> Self {
        Self {
            name,
            success: false,
            pdf_name: None,
            error: Some(error.into()),
        }
    }

    fn from_outcome(name: String, outcome: &Outcome) -> Self {
        Self {
            name,
            success: outcome.success(),
            pdf_name: outcome.output_name.clone(),
            error: outcome.error.as_ref().map(|e| e.to_string()),
        }
    }
}

/// Accept a multipart batch of DWFX files, convert each through the shared
/// pool, and report per-file results. One bad file never aborts the rest.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, Response> {
    if let Err(e) = tokio::fs::create_dir_all(&state.upload_dir).await {
        return Err(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Cannot create upload dir: {e}"),
        ));
    }

    let mut results: Vec<UploadResult> = Vec::new();
    let mut saw_file = false;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(multipart_error(e)),
        };
        if field.name() != Some("files") {
            continue;
        }
        let Some(original_name) = field.file_name().map(sanitize_file_name) else {
            continue;
        };
        if original_name.is_empty() {
            continue;
        }
        saw_file = true;

        if !has_dwfx_name(&original_name) {
            results.push(UploadResult::rejected(
                original_name,
                format!("Not a .{INPUT_EXTENSION} file"),
            ));
            continue;
        }

        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return Err(multipart_error(e)),
        };

        let result = convert_upload(&state, &original_name, &bytes).await;
        results.push(result);
    }

    if !saw_file {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "No files provided".to_string(),
        ));
    }

    Ok(Json(json!({ "results": results })))
}

/// Stage one uploaded payload, run it through the dispatcher, clean up.
async fn convert_upload(state: &AppState, original_name: &str, bytes: &[u8]) -> UploadResult {
    // Unique staging prefix: concurrent uploads of the same file name must
    // not clobber each other's bytes.
    let id = Uuid::new_v4().simple().to_string();
    let staged = state
        .upload_dir
        .join(format!("{}_{original_name}", &id[..8]));

    if let Err(e) = tokio::fs::write(&staged, bytes).await {
        return UploadResult::rejected(original_name.to_string(), format!("Staging failed: {e}"));
    }

    // The produced PDF keeps the original base name, not the staged one.
    let output_path = state
        .store
        .output_dir()
        .join(Path::new(original_name).with_extension(OUTPUT_EXTENSION));
    let task = ConversionTask {
        input_path: staged.clone(),
        output_path,
        // Uploading the same document again is an explicit request to
        // reconvert it.
        overwrite: true,
    };

    let outcome = state.dispatcher.submit_one(task).await;
    if let Err(e) = tokio::fs::remove_file(&staged).await {
        warn!("Could not remove staged upload {}: {}", staged.display(), e);
    }

    info!(
        "Upload {}: {}",
        original_name,
        if outcome.success() { "ok" } else { "failed" }
    );
    UploadResult::from_outcome(original_name.to_string(), &outcome)
}

/// Serve one converted PDF as an attachment.
pub async fn download(
    State(state): State<AppState>,
    UrlPath(filename): UrlPath<String>,
) -> Response {
    let Some(path) = state.store.resolve(&filename) else {
        return error_response(StatusCode::NOT_FOUND, "File not found".to_string());
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "application/pdf".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{filename}\""),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Read failed: {e}"),
        ),
    }
}

#[derive(Debug, Deserialize)]
pub struct DownloadAllRequest {
    #[serde(default)]
    files: Vec<String>,
}

/// Bundle the named PDFs into one ZIP stream.
///
/// Names that no longer exist are skipped rather than failing the archive;
/// the client asked for a snapshot of files that may be deleted between
/// listing and download.
pub async fn download_all(
    State(state): State<AppState>,
    Json(request): Json<DownloadAllRequest>,
) -> Response {
    if request.files.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No files specified".to_string());
    }

    let paths: Vec<(String, PathBuf)> = request
        .files
        .iter()
        .filter_map(|name| state.store.resolve(name).map(|p| (name.clone(), p)))
        .collect();

    let archive = tokio::task::spawn_blocking(move || build_zip(&paths)).await;
    match archive {
        Ok(Ok(bytes)) => (
            [
                (header::CONTENT_TYPE, "application/zip".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"converted.zip\"".to_string(),
                ),
            ],
            bytes,
        )
            .into_response(),
        Ok(Err(e)) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Archive failed: {e}"),
        ),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Archive task failed: {e}"),
        ),
    }
}

/// Live list of converted PDFs, re-derived from the output directory on
/// every call.
pub async fn list_files(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "files": state.store.list_outputs() }))
}

// ── Helpers ──────────────────────────────────────────────────────────────

/// ZIP construction is CPU- and disk-bound; runs inside `spawn_blocking`.
fn build_zip(paths: &[(String, PathBuf)]) -> std::io::Result<Vec<u8>> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    for (name, path) in paths {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Skipping '{name}' in archive: {e}");
                continue;
            }
        };
        writer.start_file(name, options).map_err(to_io_error)?;
        writer.write_all(&bytes)?;
    }

    Ok(writer.finish().map_err(to_io_error)?.into_inner())
}

fn to_io_error(e: zip::result::ZipError) -> std::io::Error {
    std::io::Error::other(e)
}

/// Drop any path components a client smuggled into the file name.
fn sanitize_file_name(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn has_dwfx_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(INPUT_EXTENSION))
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn multipart_error(e: MultipartError) -> Response {
    error_response(e.status(), e.body_text())
}
