//! s1flow-filter - filter a session report by time window
//!
//! Reads a report written by `s1flow`, keeps the sessions inside (or
//! overlapping) `[--start, --end]`, renumbers them and writes a new report.
//!
//! Time bounds accept epoch seconds (`1695205007.123`) or ISO 8601
//! (`2025-09-20T11:37:04Z`); naive datetimes are treated as UTC.

use anyhow::{bail, Context, Result};
use clap::Parser;
use s1flow_core::format::parse_time;
use s1flow_core::report::filtered_output_path;
use s1flow_core::{Config, FilterMode, Report};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "s1flow-filter")]
#[command(about = "Filter an s1flow session report by time window")]
#[command(version)]
struct Args {
    /// Report JSON produced by s1flow
    #[arg(long)]
    report: PathBuf,

    /// Window start (epoch seconds or ISO 8601)
    #[arg(long)]
    start: String,

    /// Window end (epoch seconds or ISO 8601)
    #[arg(long)]
    end: String,

    /// contained: session inside the window; overlap: session intersects it
    #[arg(long, default_value = "contained")]
    mode: String,

    /// Output path (default: <report>-filtered.json next to the report)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Add ISO 8601 start_time / end_time to each session
    #[arg(long)]
    showtime: bool,

    /// Keep per-session frame numbers
    #[arg(long)]
    showframenum: bool,

    /// Output format: json (default) or text
    #[arg(short, long, default_value = "json")]
    format: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard =
        s1flow_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let start = parse_time(&args.start).context("invalid --start")?;
    let end = parse_time(&args.end).context("invalid --end")?;
    let mode: FilterMode = args.mode.parse().map_err(anyhow::Error::msg)?;
    if !matches!(args.format.as_str(), "json" | "text") {
        bail!("unknown output format '{}' (expected json or text)", args.format);
    }

    tracing::info!(report = %args.report.display(), start, end, %mode, "s1flow-filter starting");

    let report = Report::load(&args.report)
        .with_context(|| format!("failed to load report {}", args.report.display()))?;

    let mut filtered = report.filter_by_time(start, end, mode)?;
    if args.showtime {
        filtered = filtered.with_iso_times();
    }
    if !args.showframenum {
        filtered = filtered.without_frames();
    }

    let out = args
        .out
        .clone()
        .unwrap_or_else(|| filtered_output_path(&args.report));
    filtered
        .write_json(&out)
        .with_context(|| format!("failed to write {}", out.display()))?;

    if args.format == "text" {
        print!("{}", filtered.render_text());
    } else {
        println!("{}", filtered.to_json()?);
    }
    eprintln!(
        "Kept {} of {} session(s), wrote {}",
        filtered.summary.total_sessions,
        report.summary.total_sessions,
        out.display()
    );

    Ok(())
}
