//! S1AP elementary procedures and their message names.

use super::normalize_name;
use crate::types::Outcome;

/// Message names of one S1AP elementary procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct S1apProcedure {
    pub code: u8,
    pub name: &'static str,
    pub initiating: &'static str,
    pub successful: Option<&'static str>,
    pub unsuccessful: Option<&'static str>,
}

impl S1apProcedure {
    /// Message name for the given PDU type, if the procedure defines one.
    pub fn message(&self, outcome: Outcome) -> Option<&'static str> {
        match outcome {
            Outcome::Initiating => Some(self.initiating),
            Outcome::Successful => self.successful,
            Outcome::Unsuccessful => self.unsuccessful,
        }
    }

    fn messages(&self) -> impl Iterator<Item = (Outcome, &'static str)> {
        [
            Some((Outcome::Initiating, self.initiating)),
            self.successful.map(|m| (Outcome::Successful, m)),
            self.unsuccessful.map(|m| (Outcome::Unsuccessful, m)),
        ]
        .into_iter()
        .flatten()
    }
}

macro_rules! proc_entry {
    ($code:expr, $name:expr, $init:expr) => {
        S1apProcedure {
            code: $code,
            name: $name,
            initiating: $init,
            successful: None,
            unsuccessful: None,
        }
    };
    ($code:expr, $name:expr, $init:expr, $ok:expr) => {
        S1apProcedure {
            code: $code,
            name: $name,
            initiating: $init,
            successful: Some($ok),
            unsuccessful: None,
        }
    };
    ($code:expr, $name:expr, $init:expr, $ok:expr, $fail:expr) => {
        S1apProcedure {
            code: $code,
            name: $name,
            initiating: $init,
            successful: Some($ok),
            unsuccessful: Some($fail),
        }
    };
}

/// Procedure codes from TS 36.413 section 9.3 (`ProcedureCode` values).
pub const PROCEDURES: &[S1apProcedure] = &[
    proc_entry!(0, "HandoverPreparation", "HandoverRequired", "HandoverCommand", "HandoverPreparationFailure"),
    proc_entry!(1, "HandoverResourceAllocation", "HandoverRequest", "HandoverRequestAcknowledge", "HandoverFailure"),
    proc_entry!(2, "HandoverNotification", "HandoverNotify"),
    proc_entry!(3, "PathSwitchRequest", "PathSwitchRequest", "PathSwitchRequestAcknowledge", "PathSwitchRequestFailure"),
    proc_entry!(4, "HandoverCancel", "HandoverCancel", "HandoverCancelAcknowledge"),
    proc_entry!(5, "E-RABSetup", "E-RABSetupRequest", "E-RABSetupResponse"),
    proc_entry!(6, "E-RABModify", "E-RABModifyRequest", "E-RABModifyResponse"),
    proc_entry!(7, "E-RABRelease", "E-RABReleaseCommand", "E-RABReleaseResponse"),
    proc_entry!(8, "E-RABReleaseIndication", "E-RABReleaseIndication"),
    proc_entry!(9, "InitialContextSetup", "InitialContextSetupRequest", "InitialContextSetupResponse", "InitialContextSetupFailure"),
    proc_entry!(10, "Paging", "Paging"),
    proc_entry!(11, "DownlinkNASTransport", "DownlinkNASTransport"),
    proc_entry!(12, "InitialUEMessage", "InitialUEMessage"),
    proc_entry!(13, "UplinkNASTransport", "UplinkNASTransport"),
    proc_entry!(14, "Reset", "Reset", "ResetAcknowledge"),
    proc_entry!(15, "ErrorIndication", "ErrorIndication"),
    proc_entry!(16, "NASNonDeliveryIndication", "NASNonDeliveryIndication"),
    proc_entry!(17, "S1Setup", "S1SetupRequest", "S1SetupResponse", "S1SetupFailure"),
    proc_entry!(18, "UEContextReleaseRequest", "UEContextReleaseRequest"),
    proc_entry!(19, "DownlinkS1cdma2000tunnelling", "DownlinkS1cdma2000tunnelling"),
    proc_entry!(20, "UplinkS1cdma2000tunnelling", "UplinkS1cdma2000tunnelling"),
    proc_entry!(21, "UEContextModification", "UEContextModificationRequest", "UEContextModificationResponse", "UEContextModificationFailure"),
    proc_entry!(22, "UECapabilityInfoIndication", "UECapabilityInfoIndication"),
    proc_entry!(23, "UEContextRelease", "UEContextReleaseCommand", "UEContextReleaseComplete"),
    proc_entry!(24, "ENBStatusTransfer", "ENBStatusTransfer"),
    proc_entry!(25, "MMEStatusTransfer", "MMEStatusTransfer"),
    proc_entry!(26, "DeactivateTrace", "DeactivateTrace"),
    proc_entry!(27, "TraceStart", "TraceStart"),
    proc_entry!(28, "TraceFailureIndication", "TraceFailureIndication"),
    proc_entry!(29, "ENBConfigurationUpdate", "ENBConfigurationUpdate", "ENBConfigurationUpdateAcknowledge", "ENBConfigurationUpdateFailure"),
    proc_entry!(30, "MMEConfigurationUpdate", "MMEConfigurationUpdate", "MMEConfigurationUpdateAcknowledge", "MMEConfigurationUpdateFailure"),
    proc_entry!(31, "LocationReportingControl", "LocationReportingControl"),
    proc_entry!(32, "LocationReportingFailureIndication", "LocationReportingFailureIndication"),
    proc_entry!(33, "LocationReport", "LocationReport"),
    proc_entry!(34, "OverloadStart", "OverloadStart"),
    proc_entry!(35, "OverloadStop", "OverloadStop"),
    proc_entry!(36, "WriteReplaceWarning", "WriteReplaceWarningRequest", "WriteReplaceWarningResponse"),
    proc_entry!(37, "ENBDirectInformationTransfer", "ENBDirectInformationTransfer"),
    proc_entry!(38, "MMEDirectInformationTransfer", "MMEDirectInformationTransfer"),
    proc_entry!(39, "PrivateMessage", "PrivateMessage"),
    proc_entry!(40, "ENBConfigurationTransfer", "ENBConfigurationTransfer"),
    proc_entry!(41, "MMEConfigurationTransfer", "MMEConfigurationTransfer"),
    proc_entry!(42, "CellTrafficTrace", "CellTrafficTrace"),
    proc_entry!(43, "Kill", "KillRequest", "KillResponse"),
    proc_entry!(44, "DownlinkUEAssociatedLPPaTransport", "DownlinkUEAssociatedLPPaTransport"),
    proc_entry!(45, "UplinkUEAssociatedLPPaTransport", "UplinkUEAssociatedLPPaTransport"),
    proc_entry!(46, "DownlinkNonUEAssociatedLPPaTransport", "DownlinkNonUEAssociatedLPPaTransport"),
    proc_entry!(47, "UplinkNonUEAssociatedLPPaTransport", "UplinkNonUEAssociatedLPPaTransport"),
    proc_entry!(48, "UERadioCapabilityMatch", "UERadioCapabilityMatchRequest", "UERadioCapabilityMatchResponse"),
    proc_entry!(49, "PWSRestartIndication", "PWSRestartIndication"),
    proc_entry!(50, "E-RABModificationIndication", "E-RABModificationIndication", "E-RABModificationConfirm"),
];

/// Look up a procedure by its numeric code.
pub fn procedure(code: u8) -> Option<&'static S1apProcedure> {
    PROCEDURES.iter().find(|p| p.code == code)
}

/// Resolve a message name to its procedure and PDU type.
///
/// Accepts any spelling that normalises to a known message name.
pub fn lookup_message(name: &str) -> Option<(&'static S1apProcedure, Outcome)> {
    let wanted = normalize_name(name);
    if wanted.is_empty() {
        return None;
    }
    PROCEDURES.iter().find_map(|p| {
        p.messages()
            .find(|(_, m)| normalize_name(m) == wanted)
            .map(|(outcome, _)| (p, outcome))
    })
}

/// Canonical message name for a procedure code and PDU type.
///
/// Without a PDU type only single-message procedures resolve to a message;
/// request/response procedures fall back to the procedure name.
pub fn message_name(code: u8, outcome: Option<Outcome>) -> String {
    match procedure(code) {
        Some(p) => match outcome {
            Some(o) => p.message(o).unwrap_or(p.name).to_string(),
            None if p.successful.is_none() && p.unsuccessful.is_none() => p.initiating.to_string(),
            None => p.name.to_string(),
        },
        None => format!("S1APProcedure{}", code),
    }
}

/// Find the first known S1AP message name mentioned in a tshark Info column.
///
/// The Info column looks like `InitialContextSetupResponse` or
/// `id-initialUEMessage, InitialUEMessage, Attach request`; tokens are split on
/// commas, any `[...]` annotation is dropped, and the rest is checked against
/// the message table.
pub fn message_from_info(info: &str) -> Option<(&'static S1apProcedure, Outcome, &'static str)> {
    info.split(',')
        .map(|t| t.split('[').next().unwrap_or(t).trim())
        .filter(|t| !t.starts_with("id-"))
        .find_map(|token| {
            lookup_message(token).and_then(|(p, outcome)| p.message(outcome).map(|m| (p, outcome, m)))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique_and_ordered() {
        for (i, p) in PROCEDURES.iter().enumerate() {
            assert_eq!(p.code as usize, i, "procedure {} out of order", p.name);
        }
    }

    #[test]
    fn test_message_name_with_outcome() {
        assert_eq!(message_name(9, Some(Outcome::Successful)), "InitialContextSetupResponse");
        assert_eq!(message_name(9, Some(Outcome::Unsuccessful)), "InitialContextSetupFailure");
        assert_eq!(message_name(23, Some(Outcome::Initiating)), "UEContextReleaseCommand");
    }

    #[test]
    fn test_message_name_without_outcome() {
        assert_eq!(message_name(12, None), "InitialUEMessage");
        assert_eq!(message_name(9, None), "InitialContextSetup");
        assert_eq!(message_name(200, None), "S1APProcedure200");
    }

    #[test]
    fn test_lookup_message() {
        let (p, outcome) = lookup_message("UE Context Release Complete").unwrap();
        assert_eq!(p.code, 23);
        assert_eq!(outcome, Outcome::Successful);
        assert!(lookup_message("AttachRequest").is_none());
    }

    #[test]
    fn test_message_from_info() {
        let (p, outcome, name) =
            message_from_info("id-initialUEMessage, InitialUEMessage, Attach request").unwrap();
        assert_eq!(p.code, 12);
        assert_eq!(outcome, Outcome::Initiating);
        assert_eq!(name, "InitialUEMessage");
        assert!(message_from_info("SACK").is_none());

        let (_, _, name) =
            message_from_info("UEContextReleaseCommand [RadioNetwork-cause=user-inactivity]").unwrap();
        assert_eq!(name, "UEContextReleaseCommand");
    }
}
