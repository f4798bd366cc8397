//! Configuration types for DWFX-to-PDF conversion.
//!
//! All runtime behaviour is controlled through [`ConvertConfig`], built via
//! its [`ConvertConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across the batch, watch, and web front-ends, and
//! to diff two runs to understand why their outcomes differ.
//!
//! # Design choice: builder over constructor
//! The builder lets callers set only what they care about and rely on
//! well-documented defaults for the rest; `build()` rejects impossible
//! combinations (zero workers, zero stability checks) before any task runs.

use crate::error::Dwfx2PdfError;
use crate::progress::ConvertProgress;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Configuration shared by every conversion front-end.
///
/// Built via [`ConvertConfig::builder()`] or using
/// [`ConvertConfig::default()`].
///
/// # Example
/// ```rust
/// use dwfx2pdf::ConvertConfig;
///
/// let config = ConvertConfig::builder()
///     .input_dir("dwfx")
///     .output_dir("pdf")
///     .max_workers(8)
///     .overwrite(true)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConvertConfig {
    /// Directory scanned for `.dwfx` files (batch) or watched (watch mode).
    /// Created if missing. Default: `"dwfx"`.
    pub input_dir: PathBuf,

    /// Directory converted PDFs are written to. Created if missing.
    /// Default: `"pdf"`.
    pub output_dir: PathBuf,

    /// Reconvert files whose PDF already exists. Default: false.
    ///
    /// With `false`, a task whose output is already on disk short-circuits
    /// to a skipped outcome without spawning the converter, so re-running
    /// the same batch is cheap and idempotent.
    pub overwrite: bool,

    /// Concurrency ceiling for the shared worker pool. Default: 4.
    ///
    /// Every submitter — a batch call, the watcher, web uploads — contends
    /// for the same `max_workers` slots, so a large batch and a flood of
    /// watched files cannot multiply the number of live `xpstopdf`
    /// processes past this bound.
    pub max_workers: usize,

    /// Explicit path to the `xpstopdf` binary. Default: None (resolved from
    /// $PATH, then the Homebrew keg-only locations).
    ///
    /// Tests point this at a stub script; deployments use it when libgxps
    /// is installed somewhere unusual.
    pub converter: Option<PathBuf>,

    /// Interval between stability polls in watch mode. Default: 250 ms.
    pub poll_interval: Duration,

    /// Consecutive unchanged-size polls required before a watched file is
    /// considered safe to convert. Default: 2.
    ///
    /// A file still being copied grows between polls and never reaches the
    /// threshold; once writes stop, two quiet polls spaced `poll_interval`
    /// apart confirm quiescence without reading file contents.
    pub stability_checks: u32,

    /// Upper bound on captured converter stderr kept in an outcome, in
    /// bytes. Default: 4096.
    pub max_diagnostic_bytes: usize,

    /// Optional per-file progress callback for batch conversion.
    pub progress: Option<Arc<dyn ConvertProgress>>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("dwfx"),
            output_dir: PathBuf::from("pdf"),
            overwrite: false,
            max_workers: 4,
            converter: None,
            poll_interval: Duration::from_millis(250),
            stability_checks: 2,
            max_diagnostic_bytes: 4096,
            progress: None,
        }
    }
}

impl fmt::Debug for ConvertConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvertConfig")
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field("overwrite", &self.overwrite)
            .field("max_workers", &self.max_workers)
            .field("converter", &self.converter)
            .field("poll_interval", &self.poll_interval)
            .field("stability_checks", &self.stability_checks)
            .field("max_diagnostic_bytes", &self.max_diagnostic_bytes)
            .field("progress", &self.progress.as_ref().map(|_| "<dyn ConvertProgress>"))
            .finish()
    }
}

impl ConvertConfig {
    /// Create a new builder for `ConvertConfig`.
    pub fn builder() -> ConvertConfigBuilder {
        ConvertConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConvertConfig`].
#[derive(Debug)]
pub struct ConvertConfigBuilder {
    config: ConvertConfig,
}

impl ConvertConfigBuilder {
    pub fn input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.input_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn overwrite(mut self, v: bool) -> Self {
        self.config.overwrite = v;
        self
    }

    pub fn max_workers(mut self, n: usize) -> Self {
        self.config.max_workers = n.max(1);
        self
    }

    pub fn converter(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.converter = Some(path.into());
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn stability_checks(mut self, n: u32) -> Self {
        self.config.stability_checks = n.max(1);
        self
    }

    pub fn max_diagnostic_bytes(mut self, n: usize) -> Self {
        self.config.max_diagnostic_bytes = n;
        self
    }

    pub fn progress(mut self, cb: Arc<dyn ConvertProgress>) -> Self {
        self.config.progress = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConvertConfig, Dwfx2PdfError> {
        let c = &self.config;
        if c.max_workers == 0 {
            return Err(Dwfx2PdfError::InvalidConfig(
                "max_workers must be ≥ 1".into(),
            ));
        }
        if c.stability_checks == 0 {
            return Err(Dwfx2PdfError::InvalidConfig(
                "stability_checks must be ≥ 1".into(),
            ));
        }
        if c.poll_interval.is_zero() {
            return Err(Dwfx2PdfError::InvalidConfig(
                "poll_interval must be non-zero".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ConvertConfig::builder().build().unwrap();
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.stability_checks, 2);
        assert!(!config.overwrite);
    }

    #[test]
    fn builder_clamps_worker_count() {
        let config = ConvertConfig::builder().max_workers(0).build().unwrap();
        assert_eq!(config.max_workers, 1);
    }

    #[test]
    fn zero_poll_interval_rejected() {
        let mut config = ConvertConfig::default();
        config.poll_interval = Duration::ZERO;
        let err = ConvertConfigBuilder { config }.build().unwrap_err();
        assert!(err.to_string().contains("poll_interval"));
    }

    #[test]
    fn debug_output_is_printable() {
        let config = ConvertConfig::default();
        let s = format!("{config:?}");
        assert!(s.contains("max_workers"));
        assert!(s.contains("progress"));
    }
}
