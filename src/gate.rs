//! Size-stability gate: decides when a watched file has finished arriving.
//!
//! Filesystem notifications fire long before a large file is fully written;
//! a network-drive drop can trigger a create event seconds before the last
//! byte lands. Acting on the event directly would feed half-copied files to
//! the converter. The gate instead tracks each candidate path and only
//! releases it after its size has been observed unchanged for a required
//! number of consecutive polls.
//!
//! Event streams can coalesce, drop, or duplicate notifications, so
//! correctness never depends on event identity: an event merely *arms* a
//! path, and the periodic re-stat is what detects ongoing writes. The gate
//! is a plain synchronous state machine with a single owner (the watch
//! loop); nothing else may touch its records.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, trace};

/// Per-path debounce state. One live record per path, owned exclusively by
/// the gate; deleted on release or when the path disappears.
#[derive(Debug)]
struct StabilityRecord {
    /// Size at the most recent observation. `None` until first observed
    /// (the arming stat may race with the file's creation).
    last_size: Option<u64>,
    /// Consecutive polls at an unchanged size.
    stable_count: u32,
    /// When this record was created, for settle-latency logging.
    first_seen_at: Instant,
}

/// Debounce state machine for watched paths.
///
/// `arm` on every matching filesystem event; `poll` on a fixed timer. Paths
/// returned by [`StabilityGate::poll`] are stable and ready to convert;
/// their records are gone, so a later rewrite of the same path starts
/// debouncing from zero.
#[derive(Debug)]
pub struct StabilityGate {
    records: HashMap<PathBuf, StabilityRecord>,
    /// Required consecutive unchanged-size polls (K).
    required_checks: u32,
}

impl StabilityGate {
    pub fn new(required_checks: u32) -> Self {
        Self {
            records: HashMap::new(),
            required_checks: required_checks.max(1),
        }
    }

    /// Start tracking `path`, or re-arm it if already tracked.
    ///
    /// Re-arming is deliberately a no-op on the existing record: duplicate
    /// events must not reset progress, and a reset is unnecessary: if the
    /// file is still being written, the next poll sees a changed size and
    /// resets the counter itself.
    pub fn arm(&mut self, path: &Path) {
        if self.records.contains_key(path) {
            trace!("Re-armed (already tracking): {}", path.display());
            return;
        }
        let last_size = std::fs::metadata(path).map(|m| m.len()).ok();
        debug!("Tracking new candidate: {}", path.display());
        self.records.insert(
            path.to_path_buf(),
            StabilityRecord {
                last_size,
                stable_count: 0,
                first_seen_at: Instant::now(),
            },
        );
    }

    /// Re-stat every tracked path and return the ones that just became
    /// stable. Called once per poll interval by the watch loop.
    ///
    /// A path whose stat fails is discarded silently: it vanished before
    /// stabilizing (moved away, deleted), which is expected under
    /// concurrent file shuffling, and no task is ever created for it.
    pub fn poll(&mut self) -> Vec<PathBuf> {
        let mut released = Vec::new();
        let required = self.required_checks;

        self.records.retain(|path, record| {
            let size = match std::fs::metadata(path) {
                Ok(meta) => meta.len(),
                Err(_) => {
                    debug!("Discarded (vanished before stable): {}", path.display());
                    return false;
                }
            };

            match record.last_size {
                Some(last) if last == size => {
                    record.stable_count += 1;
                    if record.stable_count >= required {
                        debug!(
                            "Stable after {:?}: {}",
                            record.first_seen_at.elapsed(),
                            path.display()
                        );
                        released.push(path.clone());
                        return false;
                    }
                }
                Some(_) => {
                    // Still growing; start the quiet period over.
                    record.stable_count = 0;
                    record.last_size = Some(size);
                }
                None => {
                    record.last_size = Some(size);
                }
            }
            true
        });

        released
    }

    /// Number of paths currently tracked.
    pub fn tracked(&self) -> usize {
        self.records.len()
    }
}
