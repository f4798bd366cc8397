//! CLI binary for dwfx2pdf.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConvertConfig` and picks a front-end: one-shot batch conversion,
//! directory watch, or the web upload UI.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dwfx2pdf::{convert_dir, watch, web, ConvertConfig, ConvertProgress, Dispatcher, Outcome};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the whole batch, failure lines
/// printed above it so they survive the bar redraws. Works correctly when
/// files complete out-of-order (concurrent workers).
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:40.green/238}] {pos:>3}/{len} files  ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ConvertProgress for CliProgress {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn on_file_done(&self, outcome: &Outcome) {
        match &outcome.error {
            None if outcome.skipped => self
                .bar
                .println(format!("{} {}", dim("skip"), outcome.source_name)),
            None => {}
            Some(err) => {
                self.bar.println(format!(
                    "{} {}: {}",
                    red("FAIL"),
                    bold(&outcome.source_name),
                    err
                ));
            }
        }
        self.bar.inc(1);
    }
}

// ── Args ─────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "dwfx2pdf",
    version,
    about = "Convert DWFX files to PDFs using libgxps",
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Args, Clone)]
struct CommonArgs {
    /// Input folder containing .dwfx files.
    #[arg(long, env = "DWFX2PDF_INPUT_DIR", default_value = "dwfx")]
    input_dir: PathBuf,

    /// Output folder for PDFs.
    #[arg(long, env = "DWFX2PDF_OUTPUT_DIR", default_value = "pdf")]
    output_dir: PathBuf,

    /// Overwrite existing PDFs instead of skipping them.
    #[arg(long, env = "DWFX2PDF_OVERWRITE")]
    overwrite: bool,

    /// Number of parallel conversion workers.
    #[arg(short, long, env = "DWFX2PDF_WORKERS", default_value_t = 4)]
    workers: usize,

    /// Explicit path to the xpstopdf binary.
    #[arg(long, env = "DWFX2PDF_CONVERTER")]
    converter: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DWFX2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DWFX2PDF_QUIET")]
    quiet: bool,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Convert all .dwfx files currently in the input folder.
    Convert {
        #[command(flatten)]
        common: CommonArgs,

        /// Disable the progress bar.
        #[arg(long, env = "DWFX2PDF_NO_PROGRESS")]
        no_progress: bool,
    },
    /// Watch the input folder and auto-convert new .dwfx files.
    Watch {
        #[command(flatten)]
        common: CommonArgs,

        /// Stability poll interval in milliseconds.
        #[arg(long, env = "DWFX2PDF_POLL_MS", default_value_t = 250)]
        poll_ms: u64,

        /// Consecutive unchanged-size polls required before converting.
        #[arg(long, env = "DWFX2PDF_STABILITY_CHECKS", default_value_t = 2)]
        stability_checks: u32,
    },
    /// Start a web interface for drag-and-drop conversion.
    Web {
        #[command(flatten)]
        common: CommonArgs,

        /// Host to bind.
        #[arg(long, env = "DWFX2PDF_HOST", default_value = "0.0.0.0")]
        host: String,

        /// Port to run the web server on.
        #[arg(short, long, env = "DWFX2PDF_PORT", default_value_t = 8080)]
        port: u16,
    },
}

impl CliCommand {
    fn common(&self) -> &CommonArgs {
        match self {
            CliCommand::Convert { common, .. }
            | CliCommand::Watch { common, .. }
            | CliCommand::Web { common, .. } => common,
        }
    }
}

// ── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let common = cli.command.common().clone();

    // Suppress INFO-level library logs while the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = matches!(
        cli.command,
        CliCommand::Convert {
            no_progress: false,
            ..
        }
    ) && !common.quiet;
    let filter = if common.verbose {
        "debug"
    } else if common.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        CliCommand::Convert { common, no_progress } => {
            run_convert(common, no_progress).await
        }
        CliCommand::Watch {
            common,
            poll_ms,
            stability_checks,
        } => {
            let config = build_config(&common)
                .poll_interval(Duration::from_millis(poll_ms))
                .stability_checks(stability_checks)
                .build()
                .context("Invalid configuration")?;
            let dispatcher = Dispatcher::new(config)?;
            watch::run(dispatcher, async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await?;
            Ok(())
        }
        CliCommand::Web { common, host, port } => {
            let config = build_config(&common)
                .build()
                .context("Invalid configuration")?;
            let dispatcher = Dispatcher::new(config)?;
            web::serve(dispatcher, &format!("{host}:{port}")).await?;
            Ok(())
        }
    }
}

async fn run_convert(common: CommonArgs, no_progress: bool) -> Result<()> {
    let quiet = common.quiet;
    let show_progress = !quiet && !no_progress;

    let progress = show_progress.then(CliProgress::new);
    let mut builder = build_config(&common);
    if let Some(ref cb) = progress {
        builder = builder.progress(Arc::clone(cb) as Arc<dyn ConvertProgress>);
    }
    let config = builder.build().context("Invalid configuration")?;
    let dispatcher = Dispatcher::new(config)?;

    let summary = convert_dir(&dispatcher).await?;

    if let Some(ref cb) = progress {
        cb.bar.finish_and_clear();
    }
    if !quiet {
        let line = format!(
            "{} converted, {} skipped, {} failed  {}",
            summary.converted,
            summary.skipped,
            summary.failed,
            dim(&format!("({}ms)", summary.duration.as_millis()))
        );
        if summary.has_failures() {
            eprintln!("{} {line}", red("✗"));
        } else {
            eprintln!("{} {line}", green("✓"));
        }
    }

    if summary.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}

/// Map shared CLI args to a config builder; subcommands add their own knobs.
fn build_config(common: &CommonArgs) -> dwfx2pdf::ConvertConfigBuilder {
    let mut builder = ConvertConfig::builder()
        .input_dir(&common.input_dir)
        .output_dir(&common.output_dir)
        .overwrite(common.overwrite)
        .max_workers(common.workers);
    if let Some(ref converter) = common.converter {
        builder = builder.converter(converter);
    }
    builder
}
