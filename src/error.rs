//! Error types for the dwfx2pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Dwfx2PdfError`] — **Fatal**: the run cannot proceed at all
//!   (invalid configuration, unusable directories, server bind failure).
//!   Returned as `Err(Dwfx2PdfError)` from the top-level entry points.
//!
//! * [`ConvertError`] — **Per-file**: one conversion failed (converter
//!   missing, crashed, produced nothing) but every other file is fine.
//!   Stored inside [`crate::task::Outcome`] so callers can inspect partial
//!   success rather than losing the whole batch to one bad file.
//!
//! The separation lets callers decide their own tolerance: the batch CLI
//! exits non-zero after reporting every outcome, watch mode logs and keeps
//! running, and the web surface maps each [`ConvertError`] to a per-file
//! JSON entry.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the dwfx2pdf library.
///
/// Per-file failures use [`ConvertError`] and are stored in
/// [`crate::task::Outcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Dwfx2PdfError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Directory errors ──────────────────────────────────────────────────
    /// The input directory could not be created or read.
    #[error("Input directory '{path}' is unusable: {source}")]
    InputDirUnusable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The output directory could not be created.
    #[error("Output directory '{path}' is unusable: {source}")]
    OutputDirUnusable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Watch errors ──────────────────────────────────────────────────────
    /// The filesystem watcher could not be installed on the input directory.
    #[error("Failed to watch '{path}': {detail}")]
    WatchFailed { path: PathBuf, detail: String },

    // ── Web errors ────────────────────────────────────────────────────────
    /// The web server could not bind its listen address.
    #[error("Failed to bind '{addr}': {source}")]
    ServerBind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A per-file conversion failure.
///
/// Captured as data inside [`crate::task::Outcome`]; never crosses a task
/// boundary as `Err`, so one bad file cannot abort its siblings or the
/// worker pool.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ConvertError {
    /// The `xpstopdf` binary is not on $PATH (or any known fallback location).
    #[error(
        "Missing `xpstopdf`. Install it with: brew install libgxps (macOS) \
         or your distribution's libgxps package."
    )]
    ConverterNotFound,

    /// The converter exited non-zero. `diagnostic` is its captured stderr,
    /// truncated to a bounded length.
    #[error("xpstopdf failed{}: {diagnostic}", .status.map(|s| format!(" (exit {s})")).unwrap_or_default())]
    ConverterCrashed {
        /// Exit code, if the process exited rather than being signalled.
        status: Option<i32>,
        diagnostic: String,
    },

    /// The converter reported success but the output file is missing or empty.
    #[error("xpstopdf exited 0 but produced no usable output")]
    EmptyOutput,

    /// Input unreadable, output directory unwritable, or staging failed.
    #[error("I/O error: {detail}")]
    Io { detail: String },

    /// A worker hit an unexpected fault (bug, panic). Converted at the task
    /// boundary so the pool and sibling tasks are unaffected.
    #[error("Internal worker error: {detail}")]
    Internal { detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converter_crashed_display_with_status() {
        let e = ConvertError::ConverterCrashed {
            status: Some(1),
            diagnostic: "cannot open input".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("exit 1"), "got: {msg}");
        assert!(msg.contains("cannot open input"));
    }

    #[test]
    fn converter_crashed_display_signalled() {
        let e = ConvertError::ConverterCrashed {
            status: None,
            diagnostic: "killed".into(),
        };
        assert!(!e.to_string().contains("exit"));
    }

    #[test]
    fn converter_not_found_names_install_command() {
        assert!(ConvertError::ConverterNotFound
            .to_string()
            .contains("brew install libgxps"));
    }

    #[test]
    fn invalid_config_display() {
        let e = Dwfx2PdfError::InvalidConfig("max_workers must be >= 1".into());
        assert!(e.to_string().contains("max_workers"));
    }

    #[test]
    fn convert_error_serialises() {
        let e = ConvertError::EmptyOutput;
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("EmptyOutput"));
    }
}
