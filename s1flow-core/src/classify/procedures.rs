//! The closed table of LTE procedures the classifier recognises.
//!
//! Each procedure is an ordered list of required steps, plus optional steps
//! that may be interleaved anywhere and procedure-specific failure steps.

use crate::protocol::{normalize_name, s1ap};
use crate::types::Event;
use std::fmt;

/// A standard control-plane call flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Procedure {
    Attach,
    ServiceRequest,
    TrackingAreaUpdate,
    HandoverS1,
    HandoverX2,
    GenericRelease,
}

/// One expected message of a procedure.
///
/// A step names an S1AP message, a NAS message, or both. Both parts must
/// match when both are given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub s1ap: Option<&'static str>,
    pub nas: Option<&'static str>,
}

impl Step {
    const fn s1ap(name: &'static str) -> Self {
        Self {
            s1ap: Some(name),
            nas: None,
        }
    }

    const fn nas(name: &'static str) -> Self {
        Self {
            s1ap: None,
            nas: Some(name),
        }
    }

    const fn both(s1ap: &'static str, nas: &'static str) -> Self {
        Self {
            s1ap: Some(s1ap),
            nas: Some(nas),
        }
    }

    pub fn matches(&self, event: &Event) -> bool {
        let s1ap_ok = self
            .s1ap
            .map_or(true, |want| s1ap_message(event) == normalize_name(want));
        let nas_ok = self.nas.map_or(true, |want| {
            let want = normalize_name(want);
            event.nas_message.as_deref().map(normalize_name) == Some(want.clone())
                || normalize_name(&event.message_name) == want
        });
        s1ap_ok && nas_ok
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.s1ap, self.nas) {
            (Some(s), Some(n)) => write!(f, "{} ({})", s, n),
            (Some(s), None) => f.write_str(s),
            (None, Some(n)) => f.write_str(n),
            (None, None) => f.write_str("?"),
        }
    }
}

/// Normalised S1AP message name of an event.
///
/// An event labelled with a procedure name (`InitialContextSetup`) plus an
/// outcome resolves to that outcome's message.
fn s1ap_message(event: &Event) -> String {
    let name = normalize_name(&event.message_name);
    if let Some(outcome) = event.outcome {
        if let Some(message) = s1ap::PROCEDURES
            .iter()
            .find(|p| normalize_name(p.name) == name)
            .and_then(|p| p.message(outcome))
        {
            return normalize_name(message);
        }
    }
    name
}

const ATTACH_REQUIRED: &[Step] = &[
    Step::both("InitialUEMessage", "AttachRequest"),
    Step::s1ap("InitialContextSetupResponse"),
    Step::nas("AttachComplete"),
];
const ATTACH_OPTIONAL: &[Step] = &[
    Step::nas("AuthenticationRequest"),
    Step::nas("AuthenticationResponse"),
    Step::nas("SecurityModeCommand"),
    Step::nas("SecurityModeComplete"),
    Step::nas("IdentityRequest"),
    Step::nas("IdentityResponse"),
    Step::s1ap("InitialContextSetupRequest"),
    Step::nas("AttachAccept"),
    Step::s1ap("UECapabilityInfoIndication"),
];
const ATTACH_FAILURES: &[Step] = &[
    Step::nas("AttachReject"),
    Step::nas("AuthenticationReject"),
    Step::s1ap("InitialContextSetupFailure"),
];

const SERVICE_REQUIRED: &[Step] = &[
    Step::both("InitialUEMessage", "ServiceRequest"),
    Step::s1ap("InitialContextSetupResponse"),
];
const SERVICE_OPTIONAL: &[Step] = &[
    Step::s1ap("InitialContextSetupRequest"),
    Step::s1ap("UECapabilityInfoIndication"),
];
const SERVICE_FAILURES: &[Step] = &[
    Step::nas("ServiceReject"),
    Step::s1ap("InitialContextSetupFailure"),
];

const TAU_REQUIRED: &[Step] = &[
    Step::nas("TrackingAreaUpdateRequest"),
    Step::nas("TrackingAreaUpdateAccept"),
];
const TAU_OPTIONAL: &[Step] = &[
    Step::nas("AuthenticationRequest"),
    Step::nas("AuthenticationResponse"),
    Step::nas("SecurityModeCommand"),
    Step::nas("SecurityModeComplete"),
    Step::nas("TrackingAreaUpdateComplete"),
];
const TAU_FAILURES: &[Step] = &[Step::nas("TrackingAreaUpdateReject")];

const HANDOVER_S1_REQUIRED: &[Step] = &[
    Step::s1ap("HandoverRequired"),
    Step::s1ap("HandoverCommand"),
    Step::s1ap("HandoverNotify"),
];
const HANDOVER_S1_OPTIONAL: &[Step] = &[
    Step::s1ap("HandoverRequest"),
    Step::s1ap("HandoverRequestAcknowledge"),
    Step::s1ap("ENBStatusTransfer"),
    Step::s1ap("MMEStatusTransfer"),
];
const HANDOVER_S1_FAILURES: &[Step] = &[
    Step::s1ap("HandoverPreparationFailure"),
    Step::s1ap("HandoverFailure"),
    Step::s1ap("HandoverCancel"),
];

const HANDOVER_X2_REQUIRED: &[Step] = &[
    Step::s1ap("PathSwitchRequest"),
    Step::s1ap("PathSwitchRequestAcknowledge"),
];
const HANDOVER_X2_FAILURES: &[Step] = &[Step::s1ap("PathSwitchRequestFailure")];

const RELEASE_REQUIRED: &[Step] = &[
    Step::s1ap("UEContextReleaseCommand"),
    Step::s1ap("UEContextReleaseComplete"),
];
const RELEASE_OPTIONAL: &[Step] = &[Step::s1ap("UEContextReleaseRequest")];

impl Procedure {
    /// Every procedure, in table order.
    pub const ALL: [Procedure; 6] = [
        Procedure::Attach,
        Procedure::ServiceRequest,
        Procedure::TrackingAreaUpdate,
        Procedure::HandoverS1,
        Procedure::HandoverX2,
        Procedure::GenericRelease,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Procedure::Attach => "attach",
            Procedure::ServiceRequest => "service-request",
            Procedure::TrackingAreaUpdate => "tracking-area-update",
            Procedure::HandoverS1 => "handover-s1",
            Procedure::HandoverX2 => "handover-x2",
            Procedure::GenericRelease => "generic-release",
        }
    }

    /// Parse a procedure name as used in configuration and reports.
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = normalize_name(name);
        Self::ALL
            .into_iter()
            .find(|p| normalize_name(p.name()) == wanted)
    }

    /// Steps that must appear, in this order, for the procedure to complete.
    pub fn required(&self) -> &'static [Step] {
        match self {
            Procedure::Attach => ATTACH_REQUIRED,
            Procedure::ServiceRequest => SERVICE_REQUIRED,
            Procedure::TrackingAreaUpdate => TAU_REQUIRED,
            Procedure::HandoverS1 => HANDOVER_S1_REQUIRED,
            Procedure::HandoverX2 => HANDOVER_X2_REQUIRED,
            Procedure::GenericRelease => RELEASE_REQUIRED,
        }
    }

    /// Steps that may be interleaved and are kept as evidence.
    pub fn optional(&self) -> &'static [Step] {
        match self {
            Procedure::Attach => ATTACH_OPTIONAL,
            Procedure::ServiceRequest => SERVICE_OPTIONAL,
            Procedure::TrackingAreaUpdate => TAU_OPTIONAL,
            Procedure::HandoverS1 => HANDOVER_S1_OPTIONAL,
            Procedure::HandoverX2 => &[],
            Procedure::GenericRelease => RELEASE_OPTIONAL,
        }
    }

    /// Messages that fail this procedure in addition to the general markers.
    pub fn failures(&self) -> &'static [Step] {
        match self {
            Procedure::Attach => ATTACH_FAILURES,
            Procedure::ServiceRequest => SERVICE_FAILURES,
            Procedure::TrackingAreaUpdate => TAU_FAILURES,
            Procedure::HandoverS1 => HANDOVER_S1_FAILURES,
            Procedure::HandoverX2 => HANDOVER_X2_FAILURES,
            Procedure::GenericRelease => &[],
        }
    }

    /// Whether `event` can start this procedure.
    pub fn starts_with(&self, event: &Event) -> bool {
        self.required()
            .first()
            .map_or(false, |step| step.matches(event))
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CorrelationKeys, Outcome};

    fn event(name: &str, nas: Option<&str>) -> Event {
        let mut e = Event::new(0, CorrelationKeys::new(Some(1), None), name);
        e.nas_message = nas.map(str::to_string);
        e
    }

    #[test]
    fn test_names_round_trip() {
        for p in Procedure::ALL {
            assert_eq!(Procedure::from_name(p.name()), Some(p));
        }
        assert_eq!(Procedure::from_name("Handover S1"), Some(Procedure::HandoverS1));
        assert_eq!(Procedure::from_name("teleport"), None);
    }

    #[test]
    fn test_step_needs_both_parts() {
        let step = Step::both("InitialUEMessage", "AttachRequest");
        assert!(step.matches(&event("InitialUEMessage", Some("AttachRequest"))));
        assert!(step.matches(&event("Initial UE Message", Some("Attach request"))));
        assert!(!step.matches(&event("InitialUEMessage", Some("ServiceRequest"))));
        assert!(!step.matches(&event("InitialUEMessage", None)));
    }

    #[test]
    fn test_nas_step_accepts_bare_message_name() {
        let step = Step::nas("AttachComplete");
        assert!(step.matches(&event("UplinkNASTransport", Some("AttachComplete"))));
        assert!(step.matches(&event("AttachComplete", None)));
    }

    #[test]
    fn test_procedure_name_plus_outcome() {
        let step = Step::s1ap("InitialContextSetupResponse");
        let mut e = event("InitialContextSetup", None);
        assert!(!step.matches(&e));
        e.outcome = Some(Outcome::Successful);
        assert!(step.matches(&e));
    }

    #[test]
    fn test_every_procedure_has_required_steps() {
        for p in Procedure::ALL {
            assert!(!p.required().is_empty(), "{} has no steps", p);
        }
        assert!(Procedure::Attach.starts_with(&event("InitialUEMessage", Some("AttachRequest"))));
        assert!(!Procedure::Attach.starts_with(&event("InitialUEMessage", Some("ServiceRequest"))));
    }
}
