//! Continuous directory watch: convert files as they are dropped in.
//!
//! `notify` delivers raw create/modify events, which fire while a file is
//! still being copied. The watcher is therefore a thin event source: every
//! matching path is forwarded into the [`StabilityGate`], and a fixed timer
//! drives the gate's polling until each file settles. Only settled paths
//! become conversion tasks, submitted to the same shared [`Dispatcher`] as
//! batch and upload work.
//!
//! The gate has a single owner: this loop. Event arming and polling are
//! serialized onto it, so no locking protects the records, and workers
//! never touch them.

use crate::convert::has_input_extension;
use crate::dispatch::Dispatcher;
use crate::error::Dwfx2PdfError;
use crate::gate::StabilityGate;
use crate::task::{ConversionTask, Outcome};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use std::future::Future;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// Watch the configured input directory until `shutdown` resolves.
///
/// Newly stable `.dwfx` files are converted as they settle; failures are
/// logged and the watch keeps running. On shutdown the event subscription
/// is dropped first, then in-flight conversions are awaited rather than
/// killed, so no half-written PDF is left behind by the shutdown itself.
pub async fn run(
    dispatcher: Dispatcher,
    shutdown: impl Future<Output = ()>,
) -> Result<(), Dwfx2PdfError> {
    let config = dispatcher.config().clone();

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

    let (event_tx, event_rx) = mpsc::unbounded_channel::<PathBuf>();

    // The notify callback runs on notify's own thread; it only filters and
    // forwards paths, everything stateful happens in the async loop.
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                    return;
                }
                for path in event.paths {
                    if has_input_extension(&path) {
                        // Receiver gone means we are shutting down.
                        let _ = event_tx.send(path);
                    }
                }
            }
            Err(e) => warn!("Watch error: {e}"),
        },
        notify::Config::default(),
    )
    .map_err(|e| Dwfx2PdfError::WatchFailed {
        path: config.input_dir.clone(),
        detail: e.to_string(),
    })?;

    watcher
        .watch(&config.input_dir, RecursiveMode::NonRecursive)
        .map_err(|e| Dwfx2PdfError::WatchFailed {
            path: config.input_dir.clone(),
            detail: e.to_string(),
        })?;

    info!(
        "Watching '{}' (drop .dwfx files here); PDFs appear in '{}'",
        config.input_dir.display(),
        config.output_dir.display()
    );

    // Returns only after in-flight conversions have drained; events that
    // arrive during the drain are discarded with the channel.
    event_loop(dispatcher, event_rx, shutdown).await;

    drop(watcher);
    Ok(())
}

/// The single-owner loop: arm on events, poll on the timer, submit releases.
///
/// Split from [`run`] so tests can drive it with a hand-fed channel instead
/// of a live notify subscription.
async fn event_loop(
    dispatcher: Dispatcher,
    mut events: mpsc::UnboundedReceiver<PathBuf>,
    shutdown: impl Future<Output = ()>,
) {
    let config = dispatcher.config().clone();
    let mut gate = StabilityGate::new(config.stability_checks);
    let mut in_flight: JoinSet<()> = JoinSet::new();

    let mut poll_timer = tokio::time::interval(config.poll_interval);
    poll_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = events.recv() => match event {
                Some(path) => gate.arm(&path),
                // Event source hung up; nothing further will arrive.
                None => break,
            },
            _ = poll_timer.tick() => {
                for path in gate.poll() {
                    let task = ConversionTask::new(
                        path,
                        &config.output_dir,
                        config.overwrite,
                    );
                    let dispatcher = dispatcher.clone();
                    in_flight.spawn(async move {
                        log_outcome(&dispatcher.submit_one(task).await);
                    });
                }
            }
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
        }
    }

    if !in_flight.is_empty() {
        info!(
            "Shutting down; waiting for {} in-flight conversion(s)",
            in_flight.len()
        );
    }
    while in_flight.join_next().await.is_some() {}
}

fn log_outcome(outcome: &Outcome) {
    match (&outcome.error, outcome.skipped) {
        (None, true) => info!(
            "Skip (exists): {}",
            outcome.output_name.as_deref().unwrap_or("?")
        ),
        (None, false) => info!(
            "OK: {} -> {} ({}ms)",
            outcome.source_name,
            outcome.output_name.as_deref().unwrap_or("?"),
            outcome.duration.as_millis()
        ),
        (Some(err), _) => error!("FAIL: {}: {}", outcome.source_name, err),
    }
}
