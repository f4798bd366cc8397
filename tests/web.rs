//! In-process tests for the web upload surface.
//!
//! The router is exercised with `tower::ServiceExt::oneshot` (no sockets,
//! no browser) and the converter is stubbed with a shell script, so the
//! whole upload/convert/download flow runs hermetically.
#![cfg(unix)]

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use dwfx2pdf::web::{router, AppState};
use dwfx2pdf::{ConvertConfig, Dispatcher, ResultStore};
use serde_json::Value;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tower::ServiceExt;

// ── Test helpers ─────────────────────────────────────────────────────────────

const BOUNDARY: &str = "dwfx2pdf-test-boundary";

struct WebFixture {
    _root: tempfile::TempDir,
    output_dir: PathBuf,
    app: Router,
}

fn write_stub(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-xpstopdf");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

impl WebFixture {
    fn new() -> Self {
        Self::with_stub("cp \"$1\" \"$2\"")
    }

    fn with_stub(stub_body: &str) -> Self {
        let root = tempfile::tempdir().unwrap();
        let output_dir = root.path().join("pdf");
        let upload_dir = root.path().join("uploads");
        fs::create_dir_all(&output_dir).unwrap();
        fs::create_dir_all(&upload_dir).unwrap();

        let config = ConvertConfig::builder()
            .input_dir(root.path().join("dwfx"))
            .output_dir(&output_dir)
            .converter(write_stub(root.path(), stub_body))
            .max_workers(2)
            .build()
            .unwrap();

        let app = router(AppState {
            dispatcher: Dispatcher::new(config).unwrap(),
            store: ResultStore::new(&output_dir),
            upload_dir,
        });

        Self {
            _root: root,
            output_dir,
            app,
        }
    }
}

/// Build a `multipart/form-data` body with one `files` part per entry.
fn multipart_body(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (filename, bytes) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"files\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(parts: &[(&str, &[u8])]) -> Request<Body> {
    Request::post("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ── Upload ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_converts_and_reports_pdf_name() {
    let fx = WebFixture::new();
    let response = fx
        .app
        .clone()
        .oneshot(upload_request(&[("drawing.dwfx", b"dwfx payload")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let result = &json["results"][0];
    assert_eq!(result["success"], true);
    assert_eq!(result["name"], "drawing.dwfx");
    assert_eq!(result["pdf_name"], "drawing.pdf");
    assert!(fx.output_dir.join("drawing.pdf").is_file());
}

#[tokio::test]
async fn non_dwfx_upload_is_rejected_per_file() {
    let fx = WebFixture::new();
    let response = fx
        .app
        .clone()
        .oneshot(upload_request(&[
            ("notes.txt", b"plain text"),
            ("ok.dwfx", b"real one"),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);

    assert_eq!(results[0]["success"], false);
    let error = results[0]["error"].as_str().unwrap().to_lowercase();
    assert!(error.contains("not a .dwfx"), "got: {error}");

    // The bad file never aborts its siblings.
    assert_eq!(results[1]["success"], true);
}

#[tokio::test]
async fn upload_without_files_is_bad_request() {
    let fx = WebFixture::new();
    let response = fx
        .app
        .clone()
        .oneshot(upload_request(&[]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn failed_conversion_reports_error_per_file() {
    let fx = WebFixture::with_stub("echo 'corrupt container' >&2\nexit 1");
    let response = fx
        .app
        .clone()
        .oneshot(upload_request(&[("bad.dwfx", b"garbage")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let result = &json["results"][0];
    assert_eq!(result["success"], false);
    assert!(result["error"]
        .as_str()
        .unwrap()
        .contains("corrupt container"));
    assert!(!fx.output_dir.join("bad.pdf").exists());
}

#[tokio::test]
async fn uploaded_filenames_are_sanitized() {
    let fx = WebFixture::new();
    let response = fx
        .app
        .clone()
        .oneshot(upload_request(&[("../../escape.dwfx", b"payload")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["results"][0]["name"], "escape.dwfx");
    assert!(fx.output_dir.join("escape.pdf").is_file());
}

// ── Listing & download ───────────────────────────────────────────────────────

#[tokio::test]
async fn file_listing_reflects_live_directory() {
    let fx = WebFixture::new();

    let response = fx
        .app
        .clone()
        .oneshot(Request::get("/api/files").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(json_body(response).await["files"], serde_json::json!([]));

    fs::write(fx.output_dir.join("late.pdf"), b"pdf bytes").unwrap();

    let response = fx
        .app
        .clone()
        .oneshot(Request::get("/api/files").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(
        json_body(response).await["files"],
        serde_json::json!(["late.pdf"])
    );
}

#[tokio::test]
async fn download_serves_pdf_and_404s_missing() {
    let fx = WebFixture::new();
    fs::write(fx.output_dir.join("have.pdf"), b"pdf bytes").unwrap();

    let response = fx
        .app
        .clone()
        .oneshot(Request::get("/download/have.pdf").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/pdf"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"pdf bytes");

    let response = fx
        .app
        .clone()
        .oneshot(
            Request::get("/download/nothing.pdf")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ── Bulk ZIP ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn download_all_requires_a_file_list() {
    let fx = WebFixture::new();
    let response = fx
        .app
        .clone()
        .oneshot(
            Request::post("/download-all")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"files": []}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn download_all_bundles_existing_files() {
    let fx = WebFixture::new();
    fs::write(fx.output_dir.join("one.pdf"), b"first").unwrap();
    fs::write(fx.output_dir.join("two.pdf"), b"second").unwrap();

    let response = fx
        .app
        .clone()
        .oneshot(
            Request::post("/download-all")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"files": ["one.pdf", "two.pdf", "ghost.pdf"]}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/zip"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    // A populated ZIP starts with a local-file-header signature.
    assert_eq!(&bytes[..4], b"PK\x03\x04");
}

// ── Index page ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn index_page_mentions_dwfx() {
    let fx = WebFixture::new();
    let response = fx
        .app
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let page = String::from_utf8_lossy(&bytes).to_lowercase();
    assert!(page.contains("dwfx"));
}
