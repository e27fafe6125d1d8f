//! Core domain types for s1flow
//!
//! These types represent the canonical data model shared by ingestion,
//! session reconstruction and classification.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Event** | One decoded S1AP message occurrence (one capture frame) |
//! | **Correlation keys** | The `(ENB_UE_S1AP_ID, MME_UE_S1AP_ID)` pair; either side may be unknown |
//! | **Session** | The reconstructed lifecycle of one UE-associated S1 connection |
//! | **Procedure** | A standard call flow (attach, handover, ...) recognised inside a session |
//! | **Outcome** | The S1AP PDU type: initiating, successful or unsuccessful |
//!
//! The eNB allocates `ENB_UE_S1AP_ID` with the first message of a connection,
//! the MME allocates `MME_UE_S1AP_ID` in its first response. Until that
//! response is seen a session is only known by its eNB side.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

// ============================================
// Session identity
// ============================================

/// Identifier of a reconstructed session, dense and assigned in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// The two UE-associated S1AP identifiers used to group messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationKeys {
    /// `ENB_UE_S1AP_ID`, allocated by the eNB
    pub enb: Option<u32>,
    /// `MME_UE_S1AP_ID`, allocated by the MME
    pub mme: Option<u32>,
}

impl CorrelationKeys {
    pub fn new(enb: Option<u32>, mme: Option<u32>) -> Self {
        Self { enb, mme }
    }

    /// Neither identifier is known (node-level message).
    pub fn is_empty(&self) -> bool {
        self.enb.is_none() && self.mme.is_none()
    }

    /// Both identifiers are known.
    pub fn is_complete(&self) -> bool {
        self.enb.is_some() && self.mme.is_some()
    }

    /// True when some axis carries two different known values.
    pub fn conflicts_with(&self, other: &CorrelationKeys) -> bool {
        fn differs(a: Option<u32>, b: Option<u32>) -> bool {
            matches!((a, b), (Some(x), Some(y)) if x != y)
        }
        differs(self.enb, other.enb) || differs(self.mme, other.mme)
    }

    /// Number of axes on which both sides carry the same known value.
    ///
    /// Returns `None` when the pairs contradict each other, since no amount of
    /// agreement on one axis can outweigh a conflict on the other.
    pub fn match_score(&self, other: &CorrelationKeys) -> Option<u8> {
        if self.conflicts_with(other) {
            return None;
        }
        let agree = |a: Option<u32>, b: Option<u32>| matches!((a, b), (Some(x), Some(y)) if x == y);
        let score = agree(self.enb, other.enb) as u8 + agree(self.mme, other.mme) as u8;
        Some(score)
    }

    /// Fill any unknown axis from `other`. Known values are never overwritten.
    pub fn fill_from(&mut self, other: &CorrelationKeys) {
        if self.enb.is_none() {
            self.enb = other.enb;
        }
        if self.mme.is_none() {
            self.mme = other.mme;
        }
    }
}

impl fmt::Display for CorrelationKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: Option<u32>| v.map(|v| v.to_string()).unwrap_or_else(|| "?".to_string());
        write!(f, "enb={} mme={}", show(self.enb), show(self.mme))
    }
}

// ============================================
// Message metadata
// ============================================

/// S1AP PDU type, i.e. which half of an elementary procedure a message is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Initiating,
    Successful,
    Unsuccessful,
}

impl Outcome {
    /// Map the `s1ap.S1AP_PDU` choice index exported by tshark.
    pub fn from_pdu_index(index: u64) -> Option<Self> {
        match index {
            0 => Some(Outcome::Initiating),
            1 => Some(Outcome::Successful),
            2 => Some(Outcome::Unsuccessful),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Initiating => "initiating",
            Outcome::Successful => "successful",
            Outcome::Unsuccessful => "unsuccessful",
        }
    }
}

impl std::str::FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "initiating" | "initiatingmessage" | "initiating-message" => Ok(Outcome::Initiating),
            "successful" | "success" | "successfuloutcome" | "successful-outcome" => {
                Ok(Outcome::Successful)
            }
            "unsuccessful" | "failure" | "unsuccessfuloutcome" | "unsuccessful-outcome" => {
                Ok(Outcome::Unsuccessful)
            }
            other => Err(format!("unknown outcome: {}", other)),
        }
    }
}

/// One side of an SCTP association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub ip: IpAddr,
    pub port: Option<u16>,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.ip, self.port) {
            (IpAddr::V6(ip), Some(port)) => write!(f, "[{}]:{}", ip, port),
            (ip, Some(port)) => write!(f, "{}:{}", ip, port),
            (ip, None) => write!(f, "{}", ip),
        }
    }
}

/// Source and destination of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressPair {
    pub src: Endpoint,
    pub dst: Endpoint,
}

impl fmt::Display for AddressPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.src, self.dst)
    }
}

// ============================================
// Event
// ============================================

/// One decoded protocol message.
///
/// Events are immutable once recorded. `seq` is the arrival index within a
/// batch run and is the tie-break whenever timestamps are missing or equal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Arrival order within the run
    pub seq: u64,
    /// Capture frame number (`frame.number`)
    pub frame: Option<u64>,
    /// Epoch seconds (`frame.time_epoch`)
    pub timestamp: Option<f64>,
    /// UE-associated identifiers carried by the message
    pub keys: CorrelationKeys,
    /// Canonical S1AP message label, e.g. `InitialContextSetupResponse`
    pub message_name: String,
    /// Raw S1AP procedure code when known
    pub procedure_code: Option<u8>,
    /// PDU type (direction hint)
    pub outcome: Option<Outcome>,
    /// Embedded NAS EMM message, e.g. `AttachRequest`
    pub nas_message: Option<String>,
    /// Release or failure cause
    pub cause: Option<String>,
    /// Network addresses
    pub addresses: Option<AddressPair>,
}

impl Event {
    /// Create an event with only the fields required for grouping.
    pub fn new(seq: u64, keys: CorrelationKeys, message_name: impl Into<String>) -> Self {
        Self {
            seq,
            keys,
            message_name: message_name.into(),
            ..Default::default()
        }
    }

    /// Human-readable label used in evidence, e.g. `InitialUEMessage (AttachRequest)`.
    pub fn label(&self) -> String {
        match &self.nas_message {
            Some(nas) => format!("{} ({})", self.message_name, nas),
            None => self.message_name.clone(),
        }
    }
}

// ============================================
// Classification output
// ============================================

/// Terminal status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Success,
    Failure,
    Incomplete,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Success => "success",
            SessionStatus::Failure => "failure",
            SessionStatus::Incomplete => "incomplete",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(timestamp, message)` entry supporting a verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub timestamp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<u64>,
    pub message: String,
}

impl EvidenceItem {
    pub fn from_event(event: &Event) -> Self {
        Self {
            timestamp: event.timestamp,
            frame: event.frame,
            message: event.label(),
        }
    }
}

/// Verdict for one session, produced by [`crate::classify::Classifier::finalize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub status: SessionStatus,
    /// Procedure names observed in the timeline, in first-seen order
    pub observed_procedures: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub evidence: Vec<EvidenceItem>,
    /// No known procedure matched; the whole timeline is kept as evidence
    #[serde(default)]
    pub unknown_procedure: bool,
}

// ============================================
// Diagnostics
// ============================================

/// Non-fatal problem recorded during a run.
///
/// None of these abort processing; they are collected into the report so a
/// user can see what was dropped, guessed, or left unexplained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A record could not be turned into an event and was dropped
    Unclassifiable {
        source: String,
        seq: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        frame: Option<u64>,
        reason: String,
    },
    /// An event matched several open sessions equally well
    AmbiguousCorrelation {
        seq: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        frame: Option<u64>,
        candidates: Vec<SessionId>,
        /// Session the event was attached to, `None` when it was rejected
        resolved_to: Option<SessionId>,
    },
    /// A session matched no known procedure
    UnknownProcedure { session: SessionId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_serialization() {
        let diag = Diagnostic::AmbiguousCorrelation {
            seq: 4,
            frame: None,
            candidates: vec![SessionId(0), SessionId(1)],
            resolved_to: Some(SessionId(1)),
        };
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["kind"], "ambiguous_correlation");
        assert_eq!(json["candidates"], serde_json::json!([0, 1]));
        assert!(json.get("frame").is_none());
    }

    #[test]
    fn test_match_score() {
        let full = CorrelationKeys::new(Some(1), Some(10));
        assert_eq!(full.match_score(&CorrelationKeys::new(Some(1), Some(10))), Some(2));
        assert_eq!(full.match_score(&CorrelationKeys::new(Some(1), None)), Some(1));
        assert_eq!(full.match_score(&CorrelationKeys::new(None, Some(10))), Some(1));
        assert_eq!(full.match_score(&CorrelationKeys::new(Some(1), Some(20))), None);
        assert_eq!(full.match_score(&CorrelationKeys::new(Some(2), None)), None);

        let enb_only = CorrelationKeys::new(Some(1), None);
        assert_eq!(enb_only.match_score(&CorrelationKeys::new(None, Some(99))), Some(0));
    }

    #[test]
    fn test_fill_from_keeps_known_values() {
        let mut keys = CorrelationKeys::new(Some(1), None);
        keys.fill_from(&CorrelationKeys::new(Some(9), Some(10)));
        assert_eq!(keys, CorrelationKeys::new(Some(1), Some(10)));
        assert!(keys.is_complete());
    }

    #[test]
    fn test_outcome_parsing() {
        assert_eq!("successfulOutcome".parse::<Outcome>(), Ok(Outcome::Successful));
        assert_eq!("failure".parse::<Outcome>(), Ok(Outcome::Unsuccessful));
        assert_eq!(Outcome::from_pdu_index(0), Some(Outcome::Initiating));
        assert!(Outcome::from_pdu_index(7).is_none());
    }

    #[test]
    fn test_event_label() {
        let mut event = Event::new(0, CorrelationKeys::new(Some(1), None), "InitialUEMessage");
        assert_eq!(event.label(), "InitialUEMessage");
        event.nas_message = Some("AttachRequest".to_string());
        assert_eq!(event.label(), "InitialUEMessage (AttachRequest)");
    }

    #[test]
    fn test_endpoint_display() {
        let v4 = Endpoint {
            ip: "10.0.0.1".parse().unwrap(),
            port: Some(36412),
        };
        let v6 = Endpoint {
            ip: "fe80::1".parse().unwrap(),
            port: Some(36412),
        };
        assert_eq!(v4.to_string(), "10.0.0.1:36412");
        assert_eq!(v6.to_string(), "[fe80::1]:36412");
    }
}
