//! # dwfx2pdf
//!
//! Convert DWFX documents to PDF by orchestrating the `xpstopdf` converter
//! from libgxps.
//!
//! ## Why this crate?
//!
//! DWFX is a zip-based page-description container (an XPS sibling) that
//! almost nothing opens directly. libgxps converts single files fine, but
//! real deployments have folders of hundreds of drawings, network shares
//! where files appear mid-copy, and users who just want a browser page to
//! drop a file on. This crate adds the orchestration: bounded-concurrency
//! batch conversion, a size-stability debounce so half-copied files are
//! never converted, and a small web upload surface, all over one shared
//! worker pool.
//!
//! ## Pipeline Overview
//!
//! ```text
//! .dwfx files
//!  │
//!  ├─ batch   enumerate a directory once          ─┐
//!  ├─ watch   notify events → stability gate       ├─ Dispatcher (N workers)
//!  └─ web     multipart upload → staging           ─┘      │
//!                                                     xpstopdf per file
//!                                                          │
//!                                                    .pdf + Outcome
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dwfx2pdf::{convert_dir, ConvertConfig, Dispatcher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConvertConfig::builder()
//!         .input_dir("dwfx")
//!         .output_dir("pdf")
//!         .max_workers(4)
//!         .build()?;
//!     let dispatcher = Dispatcher::new(config)?;
//!     let summary = convert_dir(&dispatcher).await?;
//!     eprintln!("{} converted, {} failed", summary.converted, summary.failed);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `dwfx2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! dwfx2pdf = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod progress;
pub mod store;
pub mod task;
pub mod watch;
pub mod web;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConvertConfig, ConvertConfigBuilder};
pub use convert::{convert_dir, BatchSummary};
pub use dispatch::Dispatcher;
pub use error::{ConvertError, Dwfx2PdfError};
pub use gate::StabilityGate;
pub use progress::ConvertProgress;
pub use store::ResultStore;
pub use task::{ConversionTask, Outcome};
