//! One unit of conversion work: a single DWFX file in, a single PDF out.
//!
//! The actual page transcoding is delegated to `xpstopdf` (libgxps), invoked
//! as a child process. This module owns the whole subprocess contract:
//! locating the binary, classifying its exit, retrying once under an `.xps`
//! alias for builds that refuse the `.dwfx` extension, and cleaning up
//! partial output so a later retry starts from a blank slate.
//!
//! Every failure is captured as data in an [`Outcome`] — `execute` never
//! returns `Err`, so one bad file cannot abort the worker pool or its
//! sibling tasks.

use crate::config::ConvertConfig;
use crate::error::ConvertError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

/// Recognised input extension (compared case-insensitively).
pub const INPUT_EXTENSION: &str = "dwfx";

/// Extension of produced files.
pub const OUTPUT_EXTENSION: &str = "pdf";

/// Known keg-only Homebrew install locations for libgxps.
///
/// Homebrew's libgxps is often not linked onto $PATH due to conflicts, so
/// `which` alone misses it.
const FALLBACK_CONVERTER_PATHS: &[&str] = &[
    "/opt/homebrew/opt/libgxps/bin/xpstopdf",
    "/usr/local/opt/libgxps/bin/xpstopdf",
];

/// Pure description of one unit of work: input path, derived output path,
/// and the overwrite policy. Immutable once created; consumed exactly once
/// by a worker.
#[derive(Debug, Clone)]
pub struct ConversionTask {
    /// Source `.dwfx` file.
    pub input_path: PathBuf,
    /// Destination `.pdf`, derived from the input base name.
    pub output_path: PathBuf,
    /// If false and `output_path` exists, the task short-circuits to a
    /// skipped outcome without spawning the converter.
    pub overwrite: bool,
}

impl ConversionTask {
    /// Build a task for `input_path`, deriving the output path from its base
    /// name: same stem, `output_dir`, extension swapped to `.pdf`.
    pub fn new(input_path: impl Into<PathBuf>, output_dir: &Path, overwrite: bool) -> Self {
        let input_path = input_path.into();
        let file_name = input_path
            .with_extension(OUTPUT_EXTENSION)
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("output.pdf"));
        Self {
            output_path: output_dir.join(file_name),
            input_path,
            overwrite,
        }
    }

    fn source_name(&self) -> String {
        self.input_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.input_path.display().to_string())
    }

    fn output_name(&self) -> String {
        self.output_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.output_path.display().to_string())
    }
}

/// The immutable success/failure record produced by converting one file.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    /// Base name of the source file.
    pub source_name: String,
    /// Base name of the produced PDF. Present iff the conversion succeeded
    /// (or was skipped because the PDF already existed).
    pub output_name: Option<String>,
    /// True when the overwrite policy declined to reconvert an existing PDF.
    /// A skip counts as success: the requested output is on disk.
    pub skipped: bool,
    /// Present iff the conversion failed.
    pub error: Option<ConvertError>,
    /// Wall-clock time spent on this task.
    pub duration: Duration,
}

impl Outcome {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

/// Resolve the converter binary, from most-specific to least-specific:
/// explicit config override, `$PATH`, then the Homebrew keg-only locations.
pub fn resolve_converter(config: &ConvertConfig) -> Result<PathBuf, ConvertError> {
    if let Some(ref path) = config.converter {
        if path.exists() {
            return Ok(path.clone());
        }
        return Err(ConvertError::ConverterNotFound);
    }

    if let Ok(found) = which::which("xpstopdf") {
        return Ok(found);
    }

    for candidate in FALLBACK_CONVERTER_PATHS {
        let p = Path::new(candidate);
        if p.exists() {
            return Ok(p.to_path_buf());
        }
    }

    Err(ConvertError::ConverterNotFound)
}

/// Execute one conversion task to completion.
///
/// Success requires the converter to exit 0 **and** leave a non-empty file
/// at `output_path` — a converter that reports success while silently
/// producing nothing is classified as [`ConvertError::EmptyOutput`].
/// On any failure, a partially written output is removed.
pub async fn execute(task: &ConversionTask, config: &ConvertConfig) -> Outcome {
    let start = Instant::now();
    let source_name = task.source_name();

    // Idempotent re-run policy: an existing PDF satisfies the request.
    if !task.overwrite && task.output_path.exists() {
        debug!("Skip (exists): {}", task.output_name());
        return Outcome {
            source_name,
            output_name: Some(task.output_name()),
            skipped: true,
            error: None,
            duration: start.elapsed(),
        };
    }

    match run_converter(task, config).await {
        Ok(()) => Outcome {
            source_name,
            output_name: Some(task.output_name()),
            skipped: false,
            error: None,
            duration: start.elapsed(),
        },
        Err(error) => {
            // A failed attempt may leave a truncated PDF behind; remove it
            // so a retry starts clean and the output dir only ever lists
            // complete documents.
            if task.output_path.exists() {
                if let Err(e) = tokio::fs::remove_file(&task.output_path).await {
                    warn!(
                        "Could not remove partial output {}: {}",
                        task.output_path.display(),
                        e
                    );
                }
            }
            Outcome {
                source_name,
                output_name: None,
                skipped: false,
                error: Some(error),
                duration: start.elapsed(),
            }
        }
    }
}

/// Invoke `xpstopdf INPUT OUTPUT`, retrying once under an `.xps` alias.
///
/// DWFX is a zip-based container nearly identical to XPS, but some libgxps
/// builds are picky about the extension. The first attempt uses the file
/// as-is; on a non-zero exit we copy it to a sibling `<name>.dwfx.xps` and
/// try again, reporting both diagnostics if the retry also fails.
async fn run_converter(task: &ConversionTask, config: &ConvertConfig) -> Result<(), ConvertError> {
    let converter = resolve_converter(config)?;

    let first = invoke(&converter, &task.input_path, &task.output_path).await?;
    if first.status.success() {
        return check_output_usable(&task.output_path).await;
    }

    let alias = task.input_path.with_extension("dwfx.xps");
    tokio::fs::copy(&task.input_path, &alias)
        .await
        .map_err(|e| ConvertError::Io {
            detail: format!("failed to stage .xps alias: {e}"),
        })?;

    let second = invoke(&converter, &alias, &task.output_path).await;
    if let Err(e) = tokio::fs::remove_file(&alias).await {
        warn!("Could not remove alias {}: {}", alias.display(), e);
    }
    let second = second?;

    if second.status.success() {
        return check_output_usable(&task.output_path).await;
    }

    let diagnostic = truncate_diagnostic(
        &format!(
            "{}; retry with .xps alias: {}",
            stderr_excerpt(&first),
            stderr_excerpt(&second)
        ),
        config.max_diagnostic_bytes,
    );
    Err(ConvertError::ConverterCrashed {
        status: second.status.code(),
        diagnostic,
    })
}

async fn invoke(converter: &Path, input: &Path, output: &Path) -> Result<Output, ConvertError> {
    debug!(
        "Running {} {} {}",
        converter.display(),
        input.display(),
        output.display()
    );
    Command::new(converter)
        .arg(input)
        .arg(output)
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConvertError::ConverterNotFound
            } else {
                ConvertError::Io {
                    detail: format!("failed to spawn {}: {e}", converter.display()),
                }
            }
        })
}

/// Exit 0 alone is not success: the output must exist and be non-empty.
async fn check_output_usable(output_path: &Path) -> Result<(), ConvertError> {
    match tokio::fs::metadata(output_path).await {
        Ok(meta) if meta.len() > 0 => Ok(()),
        Ok(_) | Err(_) => Err(ConvertError::EmptyOutput),
    }
}

fn stderr_excerpt(output: &Output) -> String {
    let text = String::from_utf8_lossy(&output.stderr);
    let text = text.trim();
    if text.is_empty() {
        "(no diagnostic output)".to_string()
    } else {
        text.to_string()
    }
}

/// Bound the diagnostic carried inside an outcome; converter stderr can be
/// arbitrarily large on deeply broken inputs.
fn truncate_diagnostic(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}… ({} bytes truncated)", &s[..end], s.len() - end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_swaps_extension() {
        let task = ConversionTask::new("/in/drawing.dwfx", Path::new("/out"), false);
        assert_eq!(task.output_path, PathBuf::from("/out/drawing.pdf"));
    }

    #[test]
    fn output_path_handles_uppercase_extension() {
        let task = ConversionTask::new("/in/PLAN.DWFX", Path::new("/out"), false);
        assert_eq!(task.output_path, PathBuf::from("/out/PLAN.pdf"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let s = "héllo wörld".repeat(100);
        let t = truncate_diagnostic(&s, 37);
        assert!(t.starts_with('h'));
        assert!(t.contains("truncated"));
    }

    #[test]
    fn short_diagnostic_untouched() {
        assert_eq!(truncate_diagnostic("fine", 4096), "fine");
    }

    #[test]
    fn missing_override_is_converter_not_found() {
        let config = ConvertConfig::builder()
            .converter("/nonexistent/xpstopdf")
            .build()
            .unwrap();
        assert!(matches!(
            resolve_converter(&config),
            Err(ConvertError::ConverterNotFound)
        ));
    }
}
