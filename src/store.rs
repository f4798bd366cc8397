//! Registry of converted outputs, derived from the output directory.
//!
//! Deliberately not an in-memory cache: every query re-reads the directory,
//! so the answer is always consistent with what is actually on disk. The
//! conversion pipeline, an operator deleting files by hand, and a second
//! process writing into the same directory all stay visible without any
//! invalidation protocol.

use crate::task::OUTPUT_EXTENSION;
use std::path::{Component, Path, PathBuf};
use tracing::warn;

/// Read-only view over the output directory.
#[derive(Debug, Clone)]
pub struct ResultStore {
    output_dir: PathBuf,
}

impl ResultStore {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Names of all converted PDFs currently on disk, sorted.
    ///
    /// An unreadable output directory yields an empty list (it may simply
    /// not have been created yet — nothing has been converted).
    pub fn list_outputs(&self) -> Vec<String> {
        let entries = match std::fs::read_dir(&self.output_dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let path = entry.path();
                if !path.is_file() {
                    return None;
                }
                let ext = path.extension()?.to_str()?;
                if !ext.eq_ignore_ascii_case(OUTPUT_EXTENSION) {
                    return None;
                }
                Some(path.file_name()?.to_str()?.to_string())
            })
            .collect();
        names.sort();
        names
    }

    /// Map a bare output name to its on-disk path, iff it exists.
    ///
    /// Names containing path separators or parent components are rejected:
    /// download requests must not be able to reach outside the output
    /// directory.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let candidate = Path::new(name);
        let is_bare_name = candidate.components().count() == 1
            && matches!(candidate.components().next(), Some(Component::Normal(_)));
        if !is_bare_name {
            warn!("Rejected suspicious output name: {name:?}");
            return None;
        }

        let path = self.output_dir.join(name);
        if path.is_file() {
            Some(path)
        } else {
            None
        }
    }
}
