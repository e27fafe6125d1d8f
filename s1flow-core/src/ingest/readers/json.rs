//! JSON export reader
//!
//! Accepts a top-level array whose elements are either:
//!
//! - tshark `-T json` packets: `{"_source": {"layers": {"frame": {...}, "s1ap": {...}}}}`
//! - flat objects, e.g. the output of a `jq` reshaping filter:
//!   `{"frame.number": "1", "s1ap.ENB_UE_S1AP_ID": "7", ...}`
//!
//! Nested objects are flattened into one map. When a field name appears more
//! than once (protocol trees repeat IEs) the first value in document order
//! wins, matching tshark's `occurrence=f`. Arrays of scalars contribute their
//! first element.

use crate::error::{Error, Result};
use crate::ingest::reader::{InputFormat, RawRecord, ReadResult, RecordReader};
use serde_json::Value;
use std::path::Path;

/// Reader for JSON exports.
pub struct JsonReader;

impl JsonReader {
    pub fn new() -> Self {
        Self
    }

    /// Parse a JSON document already in memory.
    pub fn read_str(&self, source_name: &str, content: &str) -> Result<ReadResult> {
        let document: Value = serde_json::from_str(content)?;
        let packets = match document {
            Value::Array(items) => items,
            _ => {
                return Err(Error::Parse {
                    source_name: source_name.to_string(),
                    message: "JSON root must be an array".to_string(),
                })
            }
        };

        let mut result = ReadResult::default();
        for (index, packet) in packets.iter().enumerate() {
            let root = packet
                .get("_source")
                .and_then(|s| s.get("layers"))
                .unwrap_or(packet);

            if !root.is_object() {
                result
                    .warnings
                    .push(format!("element {}: expected an object, skipping", index));
                continue;
            }

            let mut record = RawRecord::new(index);
            flatten_into(root, &mut record);
            result.records.push(record);
        }

        Ok(result)
    }
}

impl Default for JsonReader {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordReader for JsonReader {
    fn format(&self) -> InputFormat {
        InputFormat::Json
    }

    fn read(&self, path: &Path) -> Result<ReadResult> {
        let content = std::fs::read_to_string(path)?;
        self.read_str(&path.display().to_string(), &content)
    }
}

fn flatten_into(value: &Value, record: &mut RawRecord) {
    let Value::Object(map) = value else {
        return;
    };
    for (key, child) in map {
        match child {
            Value::Object(_) => flatten_into(child, record),
            Value::Array(items) => {
                if let Some(first) = items.iter().find_map(scalar_text) {
                    insert_first(record, key, first);
                }
                for item in items.iter().filter(|v| v.is_object()) {
                    flatten_into(item, record);
                }
            }
            other => {
                if let Some(text) = scalar_text(other) {
                    insert_first(record, key, text);
                }
            }
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn insert_first(record: &mut RawRecord, key: &str, value: String) {
    if value.trim().is_empty() {
        return;
    }
    record.fields.entry(key.to_string()).or_insert(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_objects() {
        let content = r#"[
            {"frame.number": 1, "frame.time_epoch": "1695205007.1", "s1ap.ENB_UE_S1AP_ID": "7", "s1ap.MME_UE_S1AP_ID": null},
            {"frame.number": 2, "message": "InitialContextSetupRequest", "enb_ue_id": 7, "mme_ue_id": 10}
        ]"#;
        let result = JsonReader::new().read_str("flat.json", content).unwrap();

        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].get("frame.number"), Some("1"));
        assert_eq!(result.records[0].get("s1ap.MME_UE_S1AP_ID"), None);
        assert_eq!(result.records[1].get("mme_ue_id"), Some("10"));
    }

    #[test]
    fn test_tshark_nested_layers_first_occurrence_wins() {
        let content = r#"[
          {"_source": {"layers": {
            "frame": {"frame.number": "5", "frame.time_epoch": "1695205010.5"},
            "ip": {"ip.src": "10.0.0.1", "ip.dst": "10.0.0.2"},
            "s1ap": {
              "s1ap.procedureCode": "23",
              "s1ap.UE_S1AP_IDs_tree": {
                "s1ap.uE_S1AP_ID_pair_element": {
                  "s1ap.mME_UE_S1AP_ID": "10",
                  "s1ap.eNB_UE_S1AP_ID": "7"
                }
              },
              "s1ap.radioNetwork": ["21", "0"]
            }
          }}}
        ]"#;
        let result = JsonReader::new().read_str("tshark.json", content).unwrap();
        let record = &result.records[0];

        assert_eq!(record.get("frame.number"), Some("5"));
        assert_eq!(record.get("ip.dst"), Some("10.0.0.2"));
        assert_eq!(record.get("s1ap.eNB_UE_S1AP_ID"), Some("7"));
        assert_eq!(record.get("s1ap.radioNetwork"), Some("21"));
    }

    #[test]
    fn test_root_must_be_array() {
        let err = JsonReader::new().read_str("bad.json", r#"{"a": 1}"#).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_non_object_elements_are_warnings() {
        let result = JsonReader::new()
            .read_str("mixed.json", r#"[1, {"frame.number": "2"}]"#)
            .unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.warnings.len(), 1);
    }
}
