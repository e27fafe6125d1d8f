//! Export-format readers
//!
//! | Format | Module | Produced by |
//! |--------|--------|-------------|
//! | CSV | [`csv`] | `tshark -T fields -E header=y -E separator=, -E quote=d -E occurrence=f` |
//! | JSON | [`json`] | `tshark -T json`, or any array of flat objects |

mod csv;
mod json;

pub use self::csv::CsvReader;
pub use self::json::JsonReader;

use super::{InputFormat, RecordReader};

/// Create all available readers.
pub fn create_all_readers() -> Vec<Box<dyn RecordReader>> {
    vec![Box::new(CsvReader::new()), Box::new(JsonReader::new())]
}

/// Get the reader for a specific format.
pub fn reader_for(format: InputFormat) -> Box<dyn RecordReader> {
    match format {
        InputFormat::Csv => Box::new(CsvReader::new()),
        InputFormat::Json => Box::new(JsonReader::new()),
    }
}
