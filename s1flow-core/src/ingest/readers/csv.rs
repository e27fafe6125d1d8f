//! tshark CSV field-export reader
//!
//! Expects a header row of tshark field abbreviations, as produced by
//!
//! ```text
//! tshark -r s1ap-only.pcapng -Y s1ap -T fields \
//!   -E header=y -E separator=, -E quote=d -E occurrence=f \
//!   -e frame.number -e frame.time_epoch -e ip.src -e ip.dst ...
//! ```
//!
//! Rows with the wrong number of columns are still read (missing columns are
//! simply absent); rows the CSV parser rejects become warnings.

use crate::error::Result;
use crate::ingest::reader::{InputFormat, RawRecord, ReadResult, RecordReader};
use std::path::Path;

/// Reader for tshark CSV exports.
pub struct CsvReader;

impl CsvReader {
    pub fn new() -> Self {
        Self
    }

    /// Read from any byte source (used for files and tests).
    pub fn read_from<R: std::io::Read>(&self, source: R) -> Result<ReadResult> {
        let mut reader = ::csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(::csv::Trim::All)
            .from_reader(source);

        let headers = reader.headers()?.clone();
        let mut result = ReadResult::default();

        for (index, row) in reader.records().enumerate() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    tracing::warn!(row = index + 1, error = %e, "Skipping unreadable CSV row");
                    result
                        .warnings
                        .push(format!("row {}: unreadable CSV row: {}", index + 1, e));
                    continue;
                }
            };

            let mut record = RawRecord::new(index);
            for (name, value) in headers.iter().zip(row.iter()) {
                if !value.is_empty() {
                    record.fields.insert(name.to_string(), value.to_string());
                }
            }
            result.records.push(record);
        }

        Ok(result)
    }
}

impl Default for CsvReader {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordReader for CsvReader {
    fn format(&self) -> InputFormat {
        InputFormat::Csv
    }

    fn read(&self, path: &Path) -> Result<ReadResult> {
        let file = std::fs::File::open(path)?;
        self.read_from(std::io::BufReader::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_tshark_header_and_rows() {
        let data = "\"frame.number\",\"frame.time_epoch\",\"s1ap.ENB_UE_S1AP_ID\",\"s1ap.MME_UE_S1AP_ID\",\"_ws.col.Info\"\n\
                    \"1\",\"1695205007.100\",\"7\",\"\",\"InitialUEMessage, Attach request\"\n\
                    \"2\",\"1695205007.200\",\"7\",\"10\",\"InitialContextSetupRequest\"\n";
        let result = CsvReader::new().read_from(data.as_bytes()).unwrap();

        assert_eq!(result.records.len(), 2);
        assert!(result.warnings.is_empty());

        let first = &result.records[0];
        assert_eq!(first.index, 0);
        assert_eq!(first.get("s1ap.ENB_UE_S1AP_ID"), Some("7"));
        assert_eq!(first.get("s1ap.MME_UE_S1AP_ID"), None);
        assert_eq!(first.get("_ws.col.Info"), Some("InitialUEMessage, Attach request"));
    }

    #[test]
    fn test_short_rows_are_kept() {
        let data = "frame.number,frame.time_epoch,s1ap.ENB_UE_S1AP_ID\n3,1.5\n";
        let result = CsvReader::new().read_from(data.as_bytes()).unwrap();

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].get("frame.time_epoch"), Some("1.5"));
        assert_eq!(result.records[0].get("s1ap.ENB_UE_S1AP_ID"), None);
    }
}
