//! Time parsing and formatting helpers shared by the binaries.

use crate::error::{Error, Result};
use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};

/// Parse a time bound into epoch seconds.
///
/// Accepts numeric epoch seconds (`1695205007.123`) or ISO 8601 /
/// RFC 3339 (`2025-09-20T11:37:04Z`, `2025-09-20T11:37:04+02:00`).
/// Naive datetimes without an offset are treated as UTC.
pub fn parse_time(value: &str) -> Result<f64> {
    let s = value.trim();
    if let Ok(epoch) = s.parse::<f64>() {
        if epoch.is_finite() {
            return Ok(epoch);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(to_epoch(&dt.with_timezone(&Utc)));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(to_epoch(&Utc.from_utc_datetime(&naive)));
        }
    }

    Err(Error::Config(format!(
        "invalid time format: '{}'. Use epoch seconds or ISO 8601.",
        value
    )))
}

fn to_epoch(dt: &DateTime<Utc>) -> f64 {
    dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) / 1e9
}

/// Render epoch seconds as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn iso_millis(epoch: f64) -> Option<String> {
    if !epoch.is_finite() {
        return None;
    }
    let millis = (epoch * 1000.0).round() as i64;
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Local wall-clock stamp used in default output file names (`20250920-113704`).
pub fn file_stamp() -> String {
    Local::now().format("%Y%m%d-%H%M%S").to_string()
}
