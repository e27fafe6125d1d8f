//! Reader trait abstraction
//!
//! Every supported export format implements [`RecordReader`] to turn a file
//! into flat [`RawRecord`]s. Mapping records to events is format independent
//! and lives in [`super::RecordMapper`].
//!
//! ## Design Principles
//!
//! 1. **Lossless capture**: every column/key of the export is kept in the record
//! 2. **Resilience**: a bad row is a warning, never an error for the whole file
//! 3. **Extensible**: a new export format only needs this trait

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Export format of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// `tshark -T fields -E header=y -E separator=, ...`
    Csv,
    /// `tshark -T json`, or a flat array of objects
    Json,
}

impl InputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputFormat::Csv => "csv",
            InputFormat::Json => "json",
        }
    }

    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(InputFormat::Csv),
            "json" => Some(InputFormat::Json),
            _ => None,
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "csv" => Ok(InputFormat::Csv),
            "json" => Ok(InputFormat::Json),
            _ => Err(format!("unknown input format: {}", s)),
        }
    }
}

/// One exported packet as a flat map of field name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    /// Position within its source file (0-based, data rows only)
    pub index: usize,
    pub fields: BTreeMap<String, String>,
}

impl RawRecord {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            fields: BTreeMap::new(),
        }
    }

    /// Builder used by tests and readers.
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.fields.insert(key.to_string(), value.to_string());
        self
    }

    /// Trimmed, non-empty value of a field.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// First field (in the given order) that has a value.
    pub fn first_of<'a>(&'a self, keys: &[&str]) -> Option<&'a str> {
        keys.iter().find_map(|k| self.get(k))
    }
}

/// Result of reading one file.
#[derive(Debug, Default)]
pub struct ReadResult {
    pub records: Vec<RawRecord>,
    /// Rows that could not be read (non-fatal)
    pub warnings: Vec<String>,
}

/// Trait implemented by all export readers.
pub trait RecordReader: Send + Sync {
    /// Format handled by this reader
    fn format(&self) -> InputFormat;

    /// Read every record of a file.
    ///
    /// ## Error Handling
    ///
    /// - Individual row failures are added to `ReadResult::warnings`
    /// - Only fatal errors (file not found, unreadable document) return `Err`
    fn read(&self, path: &Path) -> Result<ReadResult>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            InputFormat::from_path(&PathBuf::from("trace.s1ap.csv")),
            Some(InputFormat::Csv)
        );
        assert_eq!(
            InputFormat::from_path(&PathBuf::from("TRACE.JSON")),
            Some(InputFormat::Json)
        );
        assert_eq!(InputFormat::from_path(&PathBuf::from("trace.pcapng")), None);
    }

    #[test]
    fn test_raw_record_get_skips_blank() {
        let record = RawRecord::new(0)
            .with("frame.number", " 7 ")
            .with("s1ap.MME_UE_S1AP_ID", "");
        assert_eq!(record.get("frame.number"), Some("7"));
        assert_eq!(record.get("s1ap.MME_UE_S1AP_ID"), None);
        assert_eq!(record.first_of(&["missing", "frame.number"]), Some("7"));
    }
}
