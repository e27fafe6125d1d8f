//! Session report model and renderers.
//!
//! A [`Report`] is the output of one batch run: a header with input
//! provenance, one [`SessionRecord`] per reconstructed session, an aggregate
//! [`Summary`], and the diagnostics collected along the way. Reports are
//! written as JSON and can be read back for time filtering.

use crate::classify::Classifier;
use crate::config::CorrelationConfig;
use crate::error::{Error, Result};
use crate::format::iso_millis;
use crate::ingest::{IngestResult, SourceSummary};
use crate::session::{Session, SessionRegistry};
use crate::types::{
    AddressPair, ClassificationResult, CorrelationKeys, Diagnostic, EvidenceItem, SessionId,
    SessionStatus,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};

/// One classified session as it appears in a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// 1-based position in the report
    pub flow_no: usize,
    pub session_id: SessionId,
    pub correlation_keys: CorrelationKeys,
    pub start_ts: Option<f64>,
    pub end_ts: Option<f64>,
    /// ISO 8601 start time, filled by [`Report::with_iso_times`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    pub address_pair: Option<AddressPair>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<u64>,
    pub observed_procedures: Vec<String>,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub evidence: Vec<EvidenceItem>,
}

impl SessionRecord {
    pub fn from_session(session: &Session, result: ClassificationResult) -> Self {
        Self {
            flow_no: 0,
            session_id: session.id(),
            correlation_keys: session.keys(),
            start_ts: session.start_ts(),
            end_ts: session.end_ts(),
            start_time: None,
            end_time: None,
            address_pair: session.address_pair(),
            frames: session.frames(),
            observed_procedures: result.observed_procedures,
            status: result.status,
            failure_reason: result.failure_reason,
            evidence: result.evidence,
        }
    }

    fn sort_key_cmp(&self, other: &Self) -> Ordering {
        fn none_last<T: PartialOrd>(a: Option<T>, b: Option<T>) -> Ordering {
            match (a, b) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        }
        none_last(self.start_ts, other.start_ts)
            .then_with(|| none_last(self.frames.first(), other.frames.first()))
            .then_with(|| self.session_id.cmp(&other.session_id))
    }
}

/// Aggregate counts for a report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_sessions: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub incomplete_count: usize,
    #[serde(default)]
    pub records_read: usize,
    #[serde(default)]
    pub events_ingested: usize,
    #[serde(default)]
    pub malformed_dropped: usize,
    #[serde(default)]
    pub node_level_skipped: usize,
    #[serde(default)]
    pub ambiguous_resolved: usize,
    #[serde(default)]
    pub ambiguous_rejected: usize,
}

impl Summary {
    /// Recompute the status counts from `records`, keeping ingest counters.
    fn recount(&mut self, records: &[SessionRecord]) {
        self.total_sessions = records.len();
        self.success_count = count(records, SessionStatus::Success);
        self.failure_count = count(records, SessionStatus::Failure);
        self.incomplete_count = count(records, SessionStatus::Incomplete);
    }
}

fn count(records: &[SessionRecord], status: SessionStatus) -> usize {
    records.iter().filter(|r| r.status == status).count()
}

/// How a time window selects sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Session lies entirely inside the window
    #[default]
    Contained,
    /// Session and window intersect
    Overlap,
}

impl FilterMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterMode::Contained => "contained",
            FilterMode::Overlap => "overlap",
        }
    }

    fn keeps(&self, start: f64, end: f64, window_start: f64, window_end: f64) -> bool {
        match self {
            FilterMode::Contained => start >= window_start && end <= window_end,
            FilterMode::Overlap => start <= window_end && end >= window_start,
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "contained" => Ok(FilterMode::Contained),
            "overlap" => Ok(FilterMode::Overlap),
            _ => Err(format!("unknown filter mode: {}", s)),
        }
    }
}

/// Time window applied by [`Report::filter_by_time`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
    pub mode: FilterMode,
}

/// Output of a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: String,
    pub tool_version: String,
    #[serde(default)]
    pub sources: Vec<SourceSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<TimeWindow>,
    pub summary: Summary,
    pub sessions: Vec<SessionRecord>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    /// Group ingested events into sessions and classify them.
    ///
    /// The registry starts empty, so each call is an independent batch run.
    pub fn build(
        ingest: IngestResult,
        correlation: &CorrelationConfig,
        classifier: &Classifier,
    ) -> Self {
        let mut registry = SessionRegistry::from_config(correlation);
        for event in ingest.events {
            registry.ingest_resolving(event, correlation.on_ambiguous);
        }

        let stats = registry.stats();
        let (sessions, registry_diagnostics) = registry.into_parts();

        let mut diagnostics = ingest.diagnostics;
        diagnostics.extend(registry_diagnostics);

        let mut records: Vec<SessionRecord> = sessions
            .iter()
            .map(|session| {
                let result = classifier.finalize(session);
                if result.unknown_procedure {
                    diagnostics.push(Diagnostic::UnknownProcedure {
                        session: session.id(),
                    });
                }
                SessionRecord::from_session(session, result)
            })
            .collect();
        records.sort_by(SessionRecord::sort_key_cmp);
        renumber(&mut records);

        let mut summary = Summary {
            records_read: ingest.records_read,
            events_ingested: stats.events_ingested,
            malformed_dropped: ingest.malformed_dropped + stats.malformed_dropped,
            node_level_skipped: ingest.node_level_skipped + stats.node_level_skipped,
            ambiguous_resolved: stats.ambiguous_resolved,
            ambiguous_rejected: stats.ambiguous_rejected,
            ..Summary::default()
        };
        summary.recount(&records);

        tracing::info!(
            sessions = summary.total_sessions,
            success = summary.success_count,
            failure = summary.failure_count,
            incomplete = summary.incomplete_count,
            "Classified sessions"
        );

        Self {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            sources: ingest.sources,
            window: None,
            summary,
            sessions: records,
            diagnostics,
        }
    }

    /// Read a report written by [`Report::write_json`].
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| Error::Parse {
            source_name: path.display().to_string(),
            message: format!("not a session report: {}", e),
        })
    }

    /// Keep only sessions inside the window `[start, end]` (epoch seconds).
    ///
    /// Sessions without both a start and an end time are dropped. Flows are
    /// renumbered and status counts recomputed.
    pub fn filter_by_time(&self, start: f64, end: f64, mode: FilterMode) -> Result<Report> {
        if start > end {
            return Err(Error::Config(format!(
                "start time {} is after end time {}",
                start, end
            )));
        }

        let mut sessions: Vec<SessionRecord> = self
            .sessions
            .iter()
            .filter(|r| match (r.start_ts, r.end_ts) {
                (Some(s), Some(e)) => mode.keeps(s, e, start, end),
                _ => false,
            })
            .cloned()
            .collect();
        renumber(&mut sessions);

        let kept: BTreeSet<SessionId> = sessions.iter().map(|r| r.session_id).collect();
        let diagnostics = self
            .diagnostics
            .iter()
            .filter(|d| match d {
                Diagnostic::UnknownProcedure { session } => kept.contains(session),
                _ => true,
            })
            .cloned()
            .collect();

        let mut summary = self.summary.clone();
        summary.recount(&sessions);

        tracing::debug!(
            before = self.sessions.len(),
            after = sessions.len(),
            %mode,
            "Filtered report by time"
        );

        Ok(Report {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            tool_version: self.tool_version.clone(),
            sources: self.sources.clone(),
            window: Some(TimeWindow { start, end, mode }),
            summary,
            sessions,
            diagnostics,
        })
    }

    /// Fill `start_time` / `end_time` with ISO 8601 UTC millisecond strings.
    pub fn with_iso_times(mut self) -> Self {
        for record in &mut self.sessions {
            record.start_time = record.start_ts.and_then(iso_millis);
            record.end_time = record.end_ts.and_then(iso_millis);
        }
        self
    }

    /// Drop per-session frame lists.
    pub fn without_frames(mut self) -> Self {
        for record in &mut self.sessions {
            record.frames.clear();
        }
        self
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()? + "\n")?;
        Ok(())
    }

    /// One CSV row per session.
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);

        wtr.write_record([
            "flow_no",
            "session_id",
            "enb_ue_s1ap_id",
            "mme_ue_s1ap_id",
            "start_ts",
            "end_ts",
            "src",
            "dst",
            "frames",
            "procedures",
            "status",
            "failure_reason",
        ])?;

        for r in &self.sessions {
            let opt = |v: Option<String>| v.unwrap_or_default();
            wtr.write_record([
                r.flow_no.to_string(),
                r.session_id.to_string(),
                opt(r.correlation_keys.enb.map(|v| v.to_string())),
                opt(r.correlation_keys.mme.map(|v| v.to_string())),
                opt(r.start_ts.map(|t| format!("{:.6}", t))),
                opt(r.end_ts.map(|t| format!("{:.6}", t))),
                opt(r.address_pair.map(|a| a.src.to_string())),
                opt(r.address_pair.map(|a| a.dst.to_string())),
                r.frames
                    .iter()
                    .map(|f| f.to_string())
                    .collect::<Vec<_>>()
                    .join(" "),
                r.observed_procedures.join(";"),
                r.status.to_string(),
                opt(r.failure_reason.clone()),
            ])?;
        }

        wtr.flush()?;
        Ok(())
    }

    /// Human-readable rendering.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let s = &self.summary;

        for r in &self.sessions {
            let _ = writeln!(
                out,
                "#{} {} [{}] {}",
                r.flow_no,
                r.session_id,
                r.correlation_keys,
                r.status.as_str().to_uppercase()
            );
            let start = r.start_time.clone().or_else(|| r.start_ts.map(|t| format!("{:.3}", t)));
            let end = r.end_time.clone().or_else(|| r.end_ts.map(|t| format!("{:.3}", t)));
            if let (Some(start), Some(end)) = (start, end) {
                let _ = writeln!(out, "  time:       {} .. {}", start, end);
            }
            if let Some(addresses) = r.address_pair {
                let _ = writeln!(out, "  addresses:  {}", addresses);
            }
            if !r.observed_procedures.is_empty() {
                let _ = writeln!(out, "  procedures: {}", r.observed_procedures.join(", "));
            }
            if !r.frames.is_empty() {
                let frames: Vec<String> = r.frames.iter().map(|f| f.to_string()).collect();
                let _ = writeln!(out, "  frames:     {}", frames.join(" "));
            }
            if let Some(reason) = &r.failure_reason {
                let _ = writeln!(out, "  reason:     {}", reason);
            }
            for item in &r.evidence {
                let at = item
                    .timestamp
                    .map(|t| format!("{:.3}", t))
                    .unwrap_or_else(|| "-".to_string());
                let _ = writeln!(out, "    {:>17}  {}", at, item.message);
            }
            out.push('\n');
        }

        let _ = writeln!(out, "---");
        let _ = writeln!(
            out,
            "{} session(s): {} success, {} failure, {} incomplete",
            s.total_sessions, s.success_count, s.failure_count, s.incomplete_count
        );
        let _ = writeln!(
            out,
            "{} record(s) read, {} event(s) grouped, {} malformed, {} node-level, {} ambiguous ({} rejected)",
            s.records_read,
            s.events_ingested,
            s.malformed_dropped,
            s.node_level_skipped,
            s.ambiguous_resolved + s.ambiguous_rejected,
            s.ambiguous_rejected
        );
        out
    }
}

fn renumber(records: &mut [SessionRecord]) {
    for (i, record) in records.iter_mut().enumerate() {
        record.flow_no = i + 1;
    }
}

/// Default report path: `session-flows-<stamp>.json` next to `input`.
pub fn default_output_path(input: &Path, stamp: &str) -> PathBuf {
    sibling_dir(input).join(format!("session-flows-{}.json", stamp))
}

/// Default filtered-report path: `<report stem>-filtered.json` next to the report.
pub fn filtered_output_path(report: &Path) -> PathBuf {
    let stem = report
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "session-flows".to_string());
    sibling_dir(report).join(format!("{}-filtered.json", stem))
}

fn sibling_dir(path: &Path) -> PathBuf {
    if path.is_dir() {
        return path.to_path_buf();
    }
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Event;

    fn event(seq: u64, ts: f64, enb: u32, mme: Option<u32>, name: &str, nas: Option<&str>) -> Event {
        let mut e = Event::new(seq, CorrelationKeys::new(Some(enb), mme), name);
        e.timestamp = Some(ts);
        e.frame = Some(seq + 1);
        e.nas_message = nas.map(str::to_string);
        e
    }

    fn sample_ingest() -> IngestResult {
        IngestResult {
            events: vec![
                // UE 2 starts later but arrives first
                event(0, 200.0, 2, None, "InitialUEMessage", Some("ServiceRequest")),
                event(1, 100.0, 1, None, "InitialUEMessage", Some("AttachRequest")),
                event(2, 101.0, 1, Some(10), "InitialContextSetupResponse", None),
                event(3, 102.0, 1, Some(10), "UplinkNASTransport", Some("AttachComplete")),
                event(4, 201.0, 2, Some(20), "InitialContextSetupFailure", None),
            ],
            records_read: 6,
            node_level_skipped: 1,
            ..IngestResult::default()
        }
    }

    fn build() -> Report {
        Report::build(sample_ingest(), &CorrelationConfig::default(), &Classifier::new())
    }

    #[test]
    fn test_build_orders_and_counts() {
        let report = build();

        assert_eq!(report.sessions.len(), 2);
        assert_eq!(report.sessions[0].flow_no, 1);
        assert_eq!(report.sessions[0].start_ts, Some(100.0));
        assert_eq!(report.sessions[0].status, SessionStatus::Success);
        assert_eq!(report.sessions[1].status, SessionStatus::Failure);
        assert_eq!(report.sessions[1].frames, vec![1, 5]);

        let s = &report.summary;
        assert_eq!(s.total_sessions, 2);
        assert_eq!(s.success_count, 1);
        assert_eq!(s.failure_count, 1);
        assert_eq!(s.incomplete_count, 0);
        assert_eq!(s.records_read, 6);
        assert_eq!(s.events_ingested, 5);
        assert_eq!(s.node_level_skipped, 1);
    }

    #[test]
    fn test_filter_contained_and_overlap() {
        let report = build();

        let contained = report.filter_by_time(99.0, 150.0, FilterMode::Contained).unwrap();
        assert_eq!(contained.sessions.len(), 1);
        assert_eq!(contained.summary.success_count, 1);
        assert_eq!(contained.summary.failure_count, 0);

        let none = report.filter_by_time(101.5, 200.5, FilterMode::Contained).unwrap();
        assert!(none.sessions.is_empty());

        let overlap = report.filter_by_time(101.5, 200.5, FilterMode::Overlap).unwrap();
        assert_eq!(overlap.sessions.len(), 2);
        assert_eq!(overlap.window.unwrap().mode, FilterMode::Overlap);

        let later = report.filter_by_time(150.0, 300.0, FilterMode::Contained).unwrap();
        assert_eq!(later.sessions.len(), 1);
        assert_eq!(later.sessions[0].flow_no, 1);
        assert_eq!(later.sessions[0].status, SessionStatus::Failure);
    }

    #[test]
    fn test_filter_rejects_inverted_window() {
        let report = build();
        assert!(matches!(
            report.filter_by_time(10.0, 5.0, FilterMode::Contained),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_json_round_trip_and_options() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        let report = build();
        report.write_json(&path).unwrap();

        let loaded = Report::load(&path).unwrap();
        assert_eq!(loaded, report);

        let shown = loaded.with_iso_times().without_frames();
        assert_eq!(
            shown.sessions[0].start_time.as_deref(),
            Some("1970-01-01T00:01:40.000Z")
        );
        let json = shown.to_json().unwrap();
        assert!(!json.contains("\"frames\""));
    }

    #[test]
    fn test_csv_has_one_row_per_session() {
        let mut buf = Vec::new();
        build().write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("flow_no,session_id,enb_ue_s1ap_id"));
        assert!(lines[1].contains("attach"));
        assert!(lines[2].contains("failure"));
    }

    #[test]
    fn test_text_rendering_mentions_summary() {
        let text = build().render_text();
        assert!(text.contains("2 session(s): 1 success, 1 failure, 0 incomplete"));
        assert!(text.contains("InitialUEMessage (AttachRequest)"));
    }

    #[test]
    fn test_output_paths() {
        assert_eq!(
            default_output_path(Path::new("/data/trace.csv"), "20250920-113704"),
            PathBuf::from("/data/session-flows-20250920-113704.json")
        );
        assert_eq!(
            default_output_path(Path::new("trace.csv"), "x"),
            PathBuf::from("./session-flows-x.json")
        );
        assert_eq!(
            filtered_output_path(Path::new("/data/session-flows-x.json")),
            PathBuf::from("/data/session-flows-x-filtered.json")
        );
    }
}
