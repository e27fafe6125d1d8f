//! s1flow - reconstruct and classify LTE S1AP UE sessions
//!
//! Reads tshark exports (CSV field export or JSON), groups the S1AP messages
//! into per-UE sessions by `(ENB_UE_S1AP_ID, MME_UE_S1AP_ID)`, classifies
//! each session and writes a report.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Config: $XDG_CONFIG_HOME/s1flow/config.toml (~/.config/s1flow/config.toml)
//! - Logs: $XDG_STATE_HOME/s1flow/s1flow.YYYY-MM-DD.log (~/.local/state/s1flow/)

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use s1flow_core::config::AmbiguityPolicy;
use s1flow_core::format::file_stamp;
use s1flow_core::ingest::{IngestResult, InputFormat};
use s1flow_core::report::default_output_path;
use s1flow_core::{Classifier, Config, IngestCoordinator, Report};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "s1flow")]
#[command(about = "Reconstruct and classify LTE S1AP UE sessions from tshark exports")]
#[command(version)]
struct Args {
    /// Export files or directories to read
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Config file (default: $XDG_CONFIG_HOME/s1flow/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Input format: auto (by extension), csv or json
    #[arg(long, default_value = "auto")]
    input_format: String,

    /// Output format: json, text or csv (default from config)
    #[arg(short, long)]
    format: Option<String>,

    /// Output path (json default: session-flows-<stamp>.json next to the first input)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Ambiguous correlation policy: most-recent or reject
    #[arg(long)]
    on_ambiguous: Option<String>,

    /// Glob pattern used to expand directory inputs (default: *.csv and *.json)
    #[arg(long)]
    pattern: Option<String>,

    /// Verbose output (-v warnings and diagnostics, -vv per-file details)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Config::load().context("failed to load configuration")?,
    };

    // Initialize logging
    let _log_guard =
        s1flow_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!(inputs = args.inputs.len(), "s1flow starting");

    if let Some(policy) = &args.on_ambiguous {
        config.correlation.on_ambiguous = policy
            .parse::<AmbiguityPolicy>()
            .map_err(anyhow::Error::msg)?;
    }

    let format = args
        .format
        .clone()
        .unwrap_or_else(|| config.output.default_format.clone());
    if !matches!(format.as_str(), "json" | "text" | "csv") {
        bail!("unknown output format '{}' (expected json, text or csv)", format);
    }

    let input_format = match args.input_format.as_str() {
        "auto" => None,
        other => Some(other.parse::<InputFormat>().map_err(anyhow::Error::msg)?),
    };

    let mut coordinator = IngestCoordinator::new(config.fields.clone()).with_format(input_format);
    if let Some(pattern) = &args.pattern {
        coordinator = coordinator.with_pattern(pattern);
    }

    let files = coordinator
        .discover(&args.inputs)
        .context("failed to expand inputs")?;
    if files.is_empty() {
        bail!("no export files found in the given inputs");
    }

    let ingest = ingest_with_progress(&coordinator, &files, args.verbose)?;

    if args.verbose > 0 {
        for warning in &ingest.warnings {
            eprintln!("warning: {}", warning);
        }
    }

    let classifier = Classifier::from_config(&config.classifier);
    let report = Report::build(ingest, &config.correlation, &classifier);

    if args.verbose > 0 {
        for diagnostic in &report.diagnostics {
            eprintln!(
                "diagnostic: {}",
                serde_json::to_string(diagnostic).context("failed to render diagnostic")?
            );
        }
    }

    match format.as_str() {
        "json" => {
            let out = args
                .out
                .clone()
                .unwrap_or_else(|| default_output_path(&args.inputs[0], &file_stamp()));
            report
                .write_json(&out)
                .with_context(|| format!("failed to write report to {}", out.display()))?;
            println!("{}", report.to_json()?);
            eprintln!("Wrote {} session(s) to {}", report.summary.total_sessions, out.display());
            tracing::info!(path = %out.display(), "Report written");
        }
        "csv" => match &args.out {
            Some(out) => {
                let file = std::fs::File::create(out)
                    .with_context(|| format!("failed to create {}", out.display()))?;
                report.write_csv(file)?;
                eprintln!("Wrote {} session(s) to {}", report.summary.total_sessions, out.display());
            }
            None => report.write_csv(std::io::stdout().lock())?,
        },
        _ => {
            let text = report.render_text();
            match &args.out {
                Some(out) => std::fs::write(out, &text)
                    .with_context(|| format!("failed to write {}", out.display()))?,
                None => print!("{}", text),
            }
        }
    }

    Ok(())
}

fn ingest_with_progress(
    coordinator: &IngestCoordinator,
    files: &[PathBuf],
    verbose: u8,
) -> Result<IngestResult> {
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("invalid progress template")?
            .progress_chars("#>-"),
    );

    let mut result = IngestResult::default();
    for path in files {
        pb.set_message(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        let before = result.events.len();
        coordinator
            .ingest_file(path, &mut result)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if verbose > 1 {
            pb.println(format!(
                "  {}: {} event(s)",
                path.display(),
                result.events.len() - before
            ));
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(result)
}
