//! One-shot batch conversion: enumerate a directory, convert everything.
//!
//! This is the `dwfx2pdf convert` front-end. It enumerates the input
//! directory exactly once, submits the whole set to the shared
//! [`Dispatcher`], and reports one [`Outcome`] per input file in directory
//! order. Per-file failures never abort the batch; the caller inspects the
//! returned [`BatchSummary`] to decide the process exit code.

use crate::dispatch::Dispatcher;
use crate::error::Dwfx2PdfError;
use crate::task::{ConversionTask, Outcome, INPUT_EXTENSION};
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Aggregate result of one batch run.
#[derive(Debug)]
pub struct BatchSummary {
    /// One outcome per input file, aligned with the sorted enumeration order.
    pub outcomes: Vec<Outcome>,
    /// Files actually converted in this run.
    pub converted: usize,
    /// Files whose PDF already existed (overwrite policy declined).
    pub skipped: usize,
    /// Files that failed.
    pub failed: usize,
    /// Wall-clock time for the whole batch.
    pub duration: std::time::Duration,
}

impl BatchSummary {
    fn from_outcomes(outcomes: Vec<Outcome>, duration: std::time::Duration) -> Self {
        let converted = outcomes.iter().filter(|o| o.success() && !o.skipped).count();
        let skipped = outcomes.iter().filter(|o| o.skipped).count();
        let failed = outcomes.iter().filter(|o| !o.success()).count();
        Self {
            outcomes,
            converted,
            skipped,
            failed,
            duration,
        }
    }

    /// True when at least one file failed.
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Convert every `.dwfx` file currently in the input directory.
///
/// Creates both directories if missing. An empty input directory is a
/// successful batch of zero files, not an error.
pub async fn convert_dir(dispatcher: &Dispatcher) -> Result<BatchSummary, Dwfx2PdfError> {
    let start = Instant::now();
    let config = dispatcher.config();

    std::fs::create_dir_all(&config.input_dir).map_err(|source| {
        Dwfx2PdfError::InputDirUnusable {
            path: config.input_dir.clone(),
            source,
        }
    })?;
    std::fs::create_dir_all(&config.output_dir).map_err(|source| {
        Dwfx2PdfError::OutputDirUnusable {
            path: config.output_dir.clone(),
            source,
        }
    })?;

    let inputs = enumerate_inputs(&config.input_dir)?;
    if inputs.is_empty() {
        info!("No .{} files found in '{}'", INPUT_EXTENSION, config.input_dir.display());
        return Ok(BatchSummary::from_outcomes(Vec::new(), start.elapsed()));
    }

    let tasks: Vec<ConversionTask> = inputs
        .iter()
        .map(|input| ConversionTask::new(input, &config.output_dir, config.overwrite))
        .collect();

    info!(
        "Starting conversion of {} file(s) using {} worker(s)",
        tasks.len(),
        config.max_workers
    );
    if let Some(ref cb) = config.progress {
        cb.on_batch_start(tasks.len());
    }

    // join_all keeps outcomes positionally aligned with the task list even
    // though completion order depends on converter speed.
    let progress = config.progress.clone();
    let outcomes = join_all(tasks.into_iter().map(|task| {
        let progress = progress.clone();
        async move {
            let outcome = dispatcher.submit_one(task).await;
            if let Some(ref cb) = progress {
                cb.on_file_done(&outcome);
            }
            outcome
        }
    }))
    .await;

    let summary = BatchSummary::from_outcomes(outcomes, start.elapsed());
    info!(
        "Done. {} converted, {} skipped, {} failed in {}ms",
        summary.converted,
        summary.skipped,
        summary.failed,
        summary.duration.as_millis()
    );
    Ok(summary)
}

/// Sorted list of `.dwfx` files (case-insensitive) directly inside `dir`.
/// Subdirectories are not descended into.
pub fn enumerate_inputs(dir: &Path) -> Result<Vec<PathBuf>, Dwfx2PdfError> {
    let entries = std::fs::read_dir(dir).map_err(|source| Dwfx2PdfError::InputDirUnusable {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut inputs: Vec<PathBuf> = entries
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            if path.is_file() && has_input_extension(&path) {
                Some(path)
            } else {
                None
            }
        })
        .collect();
    inputs.sort();
    Ok(inputs)
}

/// Case-insensitive `.dwfx` check.
pub fn has_input_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(INPUT_EXTENSION))
}
