//! LTE control-plane vocabulary
//!
//! Lookup tables for the parts of S1AP (3GPP TS 36.413) and EPS NAS
//! (TS 24.301) that tshark exports as bare numbers: procedure codes, PDU
//! types, EMM message types and radio-network cause values.

pub mod cause;
pub mod nas;
pub mod s1ap;

/// Normalise a message or cause label for comparison.
///
/// Lowercases and drops everything that is not alphanumeric, so that
/// `UE Context Release Request`, `UEContextReleaseRequest` and
/// `ue-context-release-request` all compare equal.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Parse an integer field the way tshark prints them: decimal or `0x` hex.
pub fn parse_int(raw: &str) -> Option<u64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(v) = s.parse::<u64>() {
        return Some(v);
    }
    let hex = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
    u64::from_str_radix(hex, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("UE Context Release Request"), "uecontextreleaserequest");
        assert_eq!(normalize_name("E-RABSetupRequest"), "erabsetuprequest");
        assert_eq!(
            normalize_name("radio-connection-with-ue-lost"),
            normalize_name("RadioConnectionWithUELost")
        );
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int(" 0x2a "), Some(42));
        assert_eq!(parse_int("0X41"), Some(65));
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("abc"), None);
    }
}
