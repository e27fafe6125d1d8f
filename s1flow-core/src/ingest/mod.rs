//! Ingestion layer for tshark exports
//!
//! Turns export files into an ordered stream of [`Event`]s for the session
//! registry.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │  Export files   │ ──► │ IngestCoordinator│ ──► │  IngestResult   │
//! │ (*.csv, *.json) │     │                  │     │ (events, stats) │
//! └─────────────────┘     └──────────────────┘     └─────────────────┘
//!                            │            │
//!                            ▼            ▼
//!                 ┌────────────────┐  ┌──────────────┐
//!                 │ RecordReader   │  │ RecordMapper │
//!                 │ ├─ CsvReader   │  │ (FieldMap)   │
//!                 │ └─ JsonReader  │  └──────────────┘
//!                 └────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use s1flow_core::Config;
//! use s1flow_core::ingest::IngestCoordinator;
//!
//! let config = Config::load()?;
//! let coordinator = IngestCoordinator::new(config.fields.clone());
//! let result = coordinator.ingest_all(&[PathBuf::from("trace.csv")])?;
//! println!("{} events from {} records", result.events.len(), result.records_read);
//! ```

mod mapper;
mod reader;
pub mod readers;

pub use mapper::{MappedRecord, RecordMapper};
pub use reader::{InputFormat, RawRecord, ReadResult, RecordReader};

use crate::config::FieldMap;
use crate::error::{Error, Result};
use crate::types::{Diagnostic, Event};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Directory patterns used when none is configured.
pub const DEFAULT_PATTERNS: &[&str] = &["*.csv", "*.json"];

/// Provenance of one input file, recorded in the report header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub path: String,
    pub format: InputFormat,
    /// Hex SHA-256 of the file contents
    pub sha256: String,
    pub records: usize,
    pub events: usize,
}

/// Result of ingesting one or more files.
#[derive(Debug, Default)]
pub struct IngestResult {
    /// UE-associated events in arrival order
    pub events: Vec<Event>,
    pub sources: Vec<SourceSummary>,
    /// Number of records read across all files
    pub records_read: usize,
    /// Records dropped because no message name could be determined
    pub malformed_dropped: usize,
    /// Records without any UE identifier
    pub node_level_skipped: usize,
    /// Unclassifiable records
    pub diagnostics: Vec<Diagnostic>,
    /// Warnings from readers
    pub warnings: Vec<String>,
}

/// Coordinates reading and mapping across all registered readers.
///
/// The coordinator is responsible for:
/// - Expanding directory inputs into export files
/// - Picking a reader per file (by extension, or a forced format)
/// - Assigning a run-wide arrival sequence to every record
/// - Mapping records to events and collecting diagnostics
pub struct IngestCoordinator {
    readers: Vec<Box<dyn RecordReader>>,
    mapper: RecordMapper,
    format: Option<InputFormat>,
    patterns: Vec<String>,
}

impl IngestCoordinator {
    /// Create a new coordinator with the default readers.
    pub fn new(fields: FieldMap) -> Self {
        Self {
            readers: readers::create_all_readers(),
            mapper: RecordMapper::new(fields),
            format: None,
            patterns: DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Force every file to be read as `format` instead of guessing from the extension.
    pub fn with_format(mut self, format: Option<InputFormat>) -> Self {
        self.format = format;
        self
    }

    /// Replace the glob patterns used to expand directory inputs.
    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.patterns = vec![pattern.to_string()];
        self
    }

    /// Expand inputs into a list of files.
    ///
    /// Files are kept as given; directories are expanded with the configured
    /// patterns and sorted so repeated runs see the same order.
    pub fn discover(&self, inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for input in inputs {
            if !input.is_dir() {
                files.push(input.clone());
                continue;
            }

            let mut found = Vec::new();
            for pattern in &self.patterns {
                let full = input.join(pattern);
                let full = full.to_string_lossy();
                let paths = glob::glob(&full)
                    .map_err(|e| Error::Config(format!("invalid pattern '{}': {}", pattern, e)))?;
                for entry in paths {
                    match entry {
                        Ok(path) if path.is_file() => found.push(path),
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!(error = %e, "Skipping unreadable directory entry");
                        }
                    }
                }
            }
            found.sort();
            found.dedup();

            tracing::debug!(dir = %input.display(), files = found.len(), "Expanded input directory");
            files.extend(found);
        }

        Ok(files)
    }

    /// Discover and ingest every input.
    pub fn ingest_all(&self, inputs: &[PathBuf]) -> Result<IngestResult> {
        let mut result = IngestResult::default();
        for path in self.discover(inputs)? {
            self.ingest_file(&path, &mut result)?;
        }
        Ok(result)
    }

    /// Ingest a single file, appending to `result`.
    ///
    /// Sequence numbers continue from the records already in `result`, so
    /// several files share one arrival order.
    pub fn ingest_file(&self, path: &Path, result: &mut IngestResult) -> Result<()> {
        let reader = self.reader_for_path(path)?;
        let content = std::fs::read(path)?;
        let sha256 = hex::encode(Sha256::digest(&content));

        let read = reader.read(path)?;
        let source = path.display().to_string();
        let events_before = result.events.len();

        for warning in read.warnings {
            result.warnings.push(format!("{}: {}", source, warning));
        }

        for record in &read.records {
            let seq = result.records_read as u64;
            result.records_read += 1;

            match self.mapper.map(record, seq) {
                Ok(MappedRecord::Event(event)) => result.events.push(event),
                Ok(MappedRecord::NodeLevel {
                    frame,
                    message_name,
                }) => {
                    tracing::trace!(seq, ?frame, message = %message_name, "Skipping node-level message");
                    result.node_level_skipped += 1;
                }
                Err(Error::MalformedEvent { seq, reason }) => {
                    let frame = record
                        .get(&self.mapper.fields().frame)
                        .and_then(|f| f.split(',').next().and_then(crate::protocol::parse_int));
                    tracing::debug!(source = %source, seq, reason = %reason, "Dropping malformed record");
                    result.malformed_dropped += 1;
                    result.diagnostics.push(Diagnostic::Unclassifiable {
                        source: source.clone(),
                        seq,
                        frame,
                        reason,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        let events = result.events.len() - events_before;
        tracing::info!(
            path = %source,
            format = %reader.format(),
            records = read.records.len(),
            events,
            "Ingested export file"
        );

        result.sources.push(SourceSummary {
            path: source,
            format: reader.format(),
            sha256,
            records: read.records.len(),
            events,
        });

        Ok(())
    }

    fn reader_for_path(&self, path: &Path) -> Result<&dyn RecordReader> {
        let format = self
            .format
            .or_else(|| InputFormat::from_path(path))
            .ok_or_else(|| Error::Parse {
                source_name: path.display().to_string(),
                message: "cannot tell the export format from the extension; use --input-format"
                    .to_string(),
            })?;

        self.readers
            .iter()
            .find(|r| r.format() == format)
            .map(|r| r.as_ref())
            .ok_or_else(|| Error::Parse {
                source_name: path.display().to_string(),
                message: format!("no reader registered for {}", format),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const CSV: &str = "frame.number,frame.time_epoch,s1ap.ENB_UE_S1AP_ID,s1ap.MME_UE_S1AP_ID,s1ap.procedureCode,s1ap.S1AP_PDU,_ws.col.Info\n\
        1,100.0,,,17,0,S1SetupRequest\n\
        2,101.0,7,,12,0,\"InitialUEMessage, Attach request\"\n\
        3,101.5,7,10,,,\n\
        4,102.0,7,10,9,1,InitialContextSetupResponse\n";

    #[test]
    fn test_ingest_file_counts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trace.csv");
        fs::write(&path, CSV).unwrap();

        let coordinator = IngestCoordinator::new(FieldMap::default());
        let result = coordinator.ingest_all(&[path]).unwrap();

        assert_eq!(result.records_read, 4);
        assert_eq!(result.node_level_skipped, 1);
        assert_eq!(result.malformed_dropped, 1);
        assert_eq!(result.events.len(), 2);
        assert_eq!(result.events[0].seq, 1);
        assert_eq!(result.events[1].seq, 3);

        match &result.diagnostics[0] {
            Diagnostic::Unclassifiable { seq, frame, .. } => {
                assert_eq!(*seq, 2);
                assert_eq!(*frame, Some(3));
            }
            other => panic!("unexpected diagnostic {:?}", other),
        }

        let source = &result.sources[0];
        assert_eq!(source.format, InputFormat::Csv);
        assert_eq!(source.sha256.len(), 64);
        assert_eq!(source.events, 2);
    }

    #[test]
    fn test_directory_expansion_is_sorted_and_shares_sequence() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.csv"), CSV).unwrap();
        fs::write(dir.path().join("a.csv"), CSV).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let coordinator = IngestCoordinator::new(FieldMap::default());
        let files = coordinator.discover(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.csv"));

        let result = coordinator.ingest_all(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(result.records_read, 8);
        assert_eq!(result.events.last().unwrap().seq, 7);
        assert_eq!(result.sources.len(), 2);
    }

    #[test]
    fn test_unknown_extension_needs_explicit_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trace.txt");
        fs::write(&path, CSV).unwrap();

        let coordinator = IngestCoordinator::new(FieldMap::default());
        assert!(matches!(
            coordinator.ingest_all(&[path.clone()]),
            Err(Error::Parse { .. })
        ));

        let forced = IngestCoordinator::new(FieldMap::default()).with_format(Some(InputFormat::Csv));
        assert_eq!(forced.ingest_all(&[path]).unwrap().events.len(), 2);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let coordinator = IngestCoordinator::new(FieldMap::default());
        let result = coordinator.ingest_all(&[PathBuf::from("/nonexistent/trace.csv")]);
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
