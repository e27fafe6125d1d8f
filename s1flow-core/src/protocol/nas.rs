//! EPS mobility management (EMM) message types carried inside S1AP.

use super::normalize_name;

/// `nas_eps.security_header_type` value of a SERVICE REQUEST message.
pub const SERVICE_REQUEST_HEADER_TYPE: u64 = 12;

/// EMM message types from TS 24.301 table 9.8.1.
const EMM_TYPES: &[(u8, &str, &str)] = &[
    (0x41, "AttachRequest", "Attach request"),
    (0x42, "AttachAccept", "Attach accept"),
    (0x43, "AttachComplete", "Attach complete"),
    (0x44, "AttachReject", "Attach reject"),
    (0x45, "DetachRequest", "Detach request"),
    (0x46, "DetachAccept", "Detach accept"),
    (0x48, "TrackingAreaUpdateRequest", "Tracking area update request"),
    (0x49, "TrackingAreaUpdateAccept", "Tracking area update accept"),
    (0x4a, "TrackingAreaUpdateComplete", "Tracking area update complete"),
    (0x4b, "TrackingAreaUpdateReject", "Tracking area update reject"),
    (0x4c, "ExtendedServiceRequest", "Extended service request"),
    (0x4e, "ServiceReject", "Service reject"),
    (0x50, "GUTIReallocationCommand", "GUTI reallocation command"),
    (0x51, "GUTIReallocationComplete", "GUTI reallocation complete"),
    (0x52, "AuthenticationRequest", "Authentication request"),
    (0x53, "AuthenticationResponse", "Authentication response"),
    (0x54, "AuthenticationReject", "Authentication reject"),
    (0x5c, "AuthenticationFailure", "Authentication failure"),
    (0x55, "IdentityRequest", "Identity request"),
    (0x56, "IdentityResponse", "Identity response"),
    (0x5d, "SecurityModeCommand", "Security mode command"),
    (0x5e, "SecurityModeComplete", "Security mode complete"),
    (0x5f, "SecurityModeReject", "Security mode reject"),
    (0x60, "EMMStatus", "EMM status"),
    (0x61, "EMMInformation", "EMM information"),
    (0x62, "DownlinkNASTransport", "Downlink NAS transport"),
    (0x63, "UplinkNASTransport", "Uplink NAS transport"),
    (0x64, "CSServiceNotification", "CS Service notification"),
];

/// Canonical label for an EMM message type code.
pub fn emm_message(code: u64) -> Option<&'static str> {
    EMM_TYPES
        .iter()
        .find(|(c, _, _)| u64::from(*c) == code)
        .map(|(_, name, _)| *name)
}

/// Find the first EMM message named in a tshark Info column
/// (which uses the lowercase display form, e.g. `Attach request`).
///
/// The NAS transport EMM types share their display names with the S1AP
/// transport messages and are never taken from the Info column.
pub fn emm_message_from_info(info: &str) -> Option<&'static str> {
    let tokens: Vec<String> = info.split(',').map(normalize_name).collect();
    if tokens.iter().any(|t| t == "servicerequest") {
        return Some("ServiceRequest");
    }
    EMM_TYPES
        .iter()
        .filter(|(code, _, _)| !matches!(code, 0x62 | 0x63))
        .find(|(_, _, display)| {
            let wanted = normalize_name(display);
            tokens.iter().any(|t| *t == wanted)
        })
        .map(|(_, name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emm_message() {
        assert_eq!(emm_message(0x41), Some("AttachRequest"));
        assert_eq!(emm_message(0x43), Some("AttachComplete"));
        assert_eq!(emm_message(0x4b), Some("TrackingAreaUpdateReject"));
        assert_eq!(emm_message(0x00), None);
    }

    #[test]
    fn test_emm_message_from_info() {
        assert_eq!(
            emm_message_from_info("InitialUEMessage, Attach request, PDN connectivity request"),
            Some("AttachRequest")
        );
        assert_eq!(
            emm_message_from_info("InitialUEMessage, Service request"),
            Some("ServiceRequest")
        );
        assert_eq!(emm_message_from_info("UplinkNASTransport"), None);
    }
}
