//! S1AP cause values and the abnormal-release vocabulary.

use super::normalize_name;

/// `CauseRadioNetwork` enumeration from TS 36.413, in code order.
const RADIO_NETWORK: &[&str] = &[
    "unspecified",
    "tx2relocoverall-expiry",
    "successful-handover",
    "release-due-to-eutran-generated-reason",
    "handover-cancelled",
    "partial-handover",
    "ho-failure-in-target-EPC-eNB-or-target-system",
    "ho-target-not-allowed",
    "tS1relocoverall-expiry",
    "tS1relocprep-expiry",
    "cell-not-available",
    "unknown-targetID",
    "no-radio-resources-available-in-target-cell",
    "unknown-mme-ue-s1ap-id",
    "unknown-enb-ue-s1ap-id",
    "unknown-pair-ue-s1ap-id",
    "handover-desirable-for-radio-reason",
    "time-critical-handover",
    "resource-optimisation-handover",
    "reduce-load-in-serving-cell",
    "user-inactivity",
    "radio-connection-with-ue-lost",
    "load-balancing-tau-required",
    "cs-fallback-triggered",
    "ue-not-available-for-ps-service",
    "radio-resources-not-available",
    "failure-in-radio-interface-procedure",
    "invalid-qos-combination",
    "interrat-redirection",
    "interaction-with-other-procedure",
    "unknown-E-RAB-ID",
    "multiple-E-RAB-ID-instances",
    "encryption-and-or-integrity-protection-algorithms-not-supported",
    "s1-intra-system-handover-triggered",
    "s1-inter-system-handover-triggered",
    "x2-handover-triggered",
];

/// `CauseNas` enumeration.
const NAS: &[&str] = &[
    "normal-release",
    "authentication-failure",
    "detach",
    "unspecified",
    "csg-subscription-expiry",
];

/// `CauseTransport` enumeration.
const TRANSPORT: &[&str] = &["transport-resource-unavailable", "unspecified"];

/// Causes that mean the UE connection ended abnormally.
const ABNORMAL: &[&str] = &[
    "radio-connection-with-ue-lost",
    "failure-in-radio-interface-procedure",
    "radio-resources-not-available",
    "unknown-mme-ue-s1ap-id",
    "unknown-enb-ue-s1ap-id",
    "unknown-pair-ue-s1ap-id",
    "ho-failure-in-target-EPC-eNB-or-target-system",
    "tx2relocoverall-expiry",
    "tS1relocoverall-expiry",
    "tS1relocprep-expiry",
    "cell-not-available",
    "no-radio-resources-available-in-target-cell",
    "authentication-failure",
    "transport-resource-unavailable",
    "radio link failure",
    "rlf",
];

/// Name of a `CauseRadioNetwork` code (`s1ap.radioNetwork`).
pub fn radio_network(code: u64) -> Option<&'static str> {
    RADIO_NETWORK.get(usize::try_from(code).ok()?).copied()
}

/// Name of a `CauseNas` code (`s1ap.nas`).
pub fn nas(code: u64) -> Option<&'static str> {
    NAS.get(usize::try_from(code).ok()?).copied()
}

/// Name of a `CauseTransport` code (`s1ap.transport`).
pub fn transport(code: u64) -> Option<&'static str> {
    TRANSPORT.get(usize::try_from(code).ok()?).copied()
}

/// Matcher for abnormal release causes.
///
/// Built-in entries cover the S1AP radio-network and transport causes that
/// indicate a lost or broken UE connection; configuration can add more.
#[derive(Debug, Clone)]
pub struct AbnormalCauses {
    normalized: Vec<String>,
}

impl AbnormalCauses {
    pub fn new() -> Self {
        Self::with_extra(&[])
    }

    pub fn with_extra(extra: &[String]) -> Self {
        let mut normalized: Vec<String> = ABNORMAL
            .iter()
            .map(|c| normalize_name(c))
            .chain(extra.iter().map(|c| normalize_name(c)))
            .filter(|c| !c.is_empty())
            .collect();
        normalized.sort();
        normalized.dedup();
        Self { normalized }
    }

    /// True when the cause names an abnormal release.
    ///
    /// A cause matches if its normalised form equals an entry, or contains it
    /// (tshark sometimes prints `radioNetwork: radio-connection-with-ue-lost (21)`).
    /// Entries shorter than four characters only match exactly.
    pub fn is_abnormal(&self, cause: &str) -> bool {
        let cause = normalize_name(cause);
        if cause.is_empty() {
            return false;
        }
        self.normalized
            .iter()
            .any(|entry| *entry == cause || (entry.len() >= 4 && cause.contains(entry.as_str())))
    }
}

impl Default for AbnormalCauses {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radio_network_codes() {
        assert_eq!(radio_network(21), Some("radio-connection-with-ue-lost"));
        assert_eq!(radio_network(20), Some("user-inactivity"));
        assert_eq!(radio_network(0), Some("unspecified"));
        assert_eq!(radio_network(999), None);
    }

    #[test]
    fn test_abnormal_vocabulary() {
        let causes = AbnormalCauses::new();
        assert!(causes.is_abnormal("radio-connection-with-ue-lost"));
        assert!(causes.is_abnormal("radioNetwork: radio-connection-with-ue-lost (21)"));
        assert!(causes.is_abnormal("Radio Link Failure"));
        assert!(causes.is_abnormal("RLF"));
        assert!(!causes.is_abnormal("user-inactivity"));
        assert!(!causes.is_abnormal("normal-release"));
        assert!(!causes.is_abnormal(""));
    }

    #[test]
    fn test_short_entries_match_exactly() {
        let causes = AbnormalCauses::new();
        // "rlf" must not fire inside unrelated words
        assert!(!causes.is_abnormal("carlfield-timer"));
    }

    #[test]
    fn test_extra_causes() {
        let causes = AbnormalCauses::with_extra(&["user-inactivity".to_string()]);
        assert!(causes.is_abnormal("user-inactivity"));
    }
}
