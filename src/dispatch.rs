//! Work dispatch: a single bounded worker pool shared by every submitter.
//!
//! Batch conversion, the directory watcher, and web uploads all funnel
//! their [`ConversionTask`]s through one [`Dispatcher`], so total converter
//! concurrency is capped at `max_workers` no matter how many front-ends are
//! active at once. A large batch and a flood of watched files contend for
//! the same slots instead of each getting their own pool.
//!
//! The pool performs zero retries; retry, if desired, is a caller
//! decision (watch mode naturally re-submits when the next file-change
//! event arrives).

use crate::config::ConvertConfig;
use crate::error::{ConvertError, Dwfx2PdfError};
use crate::task::{self, ConversionTask, Outcome};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::error;

/// Bounded dispatch-and-collect layer over the conversion tasks.
///
/// Cheap to clone; clones share the same permit pool.
#[derive(Clone)]
pub struct Dispatcher {
    config: Arc<ConvertConfig>,
    /// Fair (FIFO) permit pool: excess tasks queue in submission order.
    permits: Arc<Semaphore>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("max_workers", &self.config.max_workers)
            .field("available_permits", &self.permits.available_permits())
            .finish()
    }
}

impl Dispatcher {
    /// Construct the pool. Fails before any task runs if the configured
    /// worker count cannot form a pool; this is a configuration error,
    /// distinct from per-task failures.
    pub fn new(config: ConvertConfig) -> Result<Self, Dwfx2PdfError> {
        if config.max_workers == 0 {
            return Err(Dwfx2PdfError::InvalidConfig(
                "worker pool requires max_workers ≥ 1".into(),
            ));
        }
        Ok(Self {
            permits: Arc::new(Semaphore::new(config.max_workers)),
            config: Arc::new(config),
        })
    }

    /// Configuration this pool was built with.
    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// Submit one task and wait for its outcome.
    ///
    /// The task runs on its own spawned worker once a permit is available;
    /// an unexpected fault inside the worker (a bug, not a converter
    /// failure) is caught at this boundary and reported as
    /// [`ConvertError::Internal`] rather than crashing the pool.
    pub async fn submit_one(&self, task: ConversionTask) -> Outcome {
        let source_name = task
            .input_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| task.input_path.display().to_string());

        let permits = Arc::clone(&self.permits);
        let config = Arc::clone(&self.config);
        let worker = tokio::spawn(async move {
            match permits.acquire_owned().await {
                Ok(_permit) => task::execute(&task, &config).await,
                // The semaphore is never closed while a Dispatcher is alive;
                // surface it as data if that invariant is ever broken.
                Err(_) => internal_outcome(
                    task.input_path.display().to_string(),
                    "worker pool closed".into(),
                ),
            }
        });

        match worker.await {
            Ok(outcome) => outcome,
            Err(join_err) => {
                error!("Worker for '{}' faulted: {}", source_name, join_err);
                internal_outcome(source_name, join_err.to_string())
            }
        }
    }

    /// Run a whole batch, collecting outcomes in submission order.
    ///
    /// At most `max_workers` tasks execute concurrently; the rest queue
    /// FIFO. Completion order varies with converter speed, but the returned
    /// vector is always positionally aligned with `tasks`.
    pub async fn run_batch(&self, tasks: Vec<ConversionTask>) -> Vec<Outcome> {
        join_all(tasks.into_iter().map(|t| self.submit_one(t))).await
    }
}

fn internal_outcome(source_name: String, detail: String) -> Outcome {
    Outcome {
        source_name,
        output_name: None,
        skipped: false,
        error: Some(ConvertError::Internal { detail }),
        duration: Duration::ZERO,
    }
}
