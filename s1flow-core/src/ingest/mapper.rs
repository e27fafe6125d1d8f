//! Mapping of raw export records to [`Event`]s.
//!
//! Resolution order for each event field:
//!
//! | Field | Sources, first hit wins |
//! |-------|-------------------------|
//! | keys | configured ID columns, `enb_ue_id`/`mme_ue_id`, then any column ending in `ENB_UE_S1AP_ID` / `MME_UE_S1AP_ID` (nested `UE-S1AP-IDs` IE) |
//! | message | `message`, S1AP message named in the Info column, procedure code + PDU type |
//! | outcome | `outcome`, PDU type column, implied by the resolved message |
//! | nas | `nas`, EMM type code, service-request header type, Info column |
//! | cause | `cause`, radio-network / NAS / transport cause codes |
//! | addresses | `src`/`dst`, IPv4 then IPv6 columns, SCTP ports |

use crate::config::FieldMap;
use crate::error::{Error, Result};
use crate::format::parse_time;
use crate::ingest::reader::RawRecord;
use crate::protocol::{cause, nas, parse_int, s1ap};
use crate::types::{AddressPair, CorrelationKeys, Endpoint, Event, Outcome};
use std::net::{IpAddr, SocketAddr};

const ENB_SUFFIX: &str = "enb_ue_s1ap_id";
const MME_SUFFIX: &str = "mme_ue_s1ap_id";

/// What a record turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum MappedRecord {
    /// A UE-associated message
    Event(Event),
    /// A message without UE identifiers (S1Setup, Reset, ...)
    NodeLevel { frame: Option<u64>, message_name: String },
}

/// Converts [`RawRecord`]s into events using a [`FieldMap`].
#[derive(Debug, Clone, Default)]
pub struct RecordMapper {
    fields: FieldMap,
}

impl RecordMapper {
    pub fn new(fields: FieldMap) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Map one record. `seq` is the arrival index assigned by the caller.
    ///
    /// Fails with [`Error::MalformedEvent`] when no message name can be
    /// determined; the caller drops the record and keeps going.
    pub fn map(&self, record: &RawRecord, seq: u64) -> Result<MappedRecord> {
        let f = &self.fields;

        let frame = record
            .first_of(&[f.frame.as_str(), "frame"])
            .and_then(first_int);
        let timestamp = record
            .first_of(&[f.time.as_str(), "timestamp", "time"])
            .and_then(parse_timestamp);

        let keys = CorrelationKeys::new(
            self.id_field(record, &f.enb, "enb_ue_id", ENB_SUFFIX),
            self.id_field(record, &f.mme, "mme_ue_id", MME_SUFFIX),
        );

        let info = record.get(&f.info);
        let pdu_outcome = record
            .first_of(&["outcome"])
            .and_then(|o| o.parse::<Outcome>().ok())
            .or_else(|| {
                record
                    .get(&f.pdu)
                    .and_then(first_int)
                    .and_then(Outcome::from_pdu_index)
            });
        let code = record
            .get(&f.procedure_code)
            .and_then(first_int)
            .and_then(|c| u8::try_from(c).ok());

        let (message_name, procedure_code, outcome) = match self.resolve_message(
            record,
            info,
            code,
            pdu_outcome,
        ) {
            Some(resolved) => resolved,
            None => {
                return Err(Error::MalformedEvent {
                    seq,
                    reason: "no message name, Info text or procedure code".to_string(),
                })
            }
        };

        if keys.is_empty() {
            return Ok(MappedRecord::NodeLevel {
                frame,
                message_name,
            });
        }

        Ok(MappedRecord::Event(Event {
            seq,
            frame,
            timestamp,
            keys,
            message_name,
            procedure_code,
            outcome,
            nas_message: self.nas_message(record, info),
            cause: self.cause(record),
            addresses: self.addresses(record),
        }))
    }

    fn id_field(
        &self,
        record: &RawRecord,
        configured: &str,
        canonical: &str,
        suffix: &str,
    ) -> Option<u32> {
        let direct = record
            .first_of(&[configured, canonical])
            .and_then(first_int);
        let value = direct.or_else(|| {
            record
                .fields
                .iter()
                .filter(|(k, _)| k.to_ascii_lowercase().ends_with(suffix))
                .find_map(|(_, v)| first_int(v))
        })?;
        u32::try_from(value).ok()
    }

    fn resolve_message(
        &self,
        record: &RawRecord,
        info: Option<&str>,
        code: Option<u8>,
        outcome: Option<Outcome>,
    ) -> Option<(String, Option<u8>, Option<Outcome>)> {
        if let Some(name) = record.first_of(&["message", "message_name"]) {
            return Some(match s1ap::lookup_message(name) {
                Some((p, implied)) => (
                    name.to_string(),
                    code.or(Some(p.code)),
                    outcome.or(Some(implied)),
                ),
                None => (name.to_string(), code, outcome),
            });
        }

        if let Some((p, implied, name)) = info.and_then(s1ap::message_from_info) {
            return Some((name.to_string(), Some(p.code), outcome.or(Some(implied))));
        }

        let code = code?;
        let outcome = outcome.or_else(|| {
            s1ap::procedure(code)
                .filter(|p| p.successful.is_none() && p.unsuccessful.is_none())
                .map(|_| Outcome::Initiating)
        });
        Some((s1ap::message_name(code, outcome), Some(code), outcome))
    }

    fn nas_message(&self, record: &RawRecord, info: Option<&str>) -> Option<String> {
        let f = &self.fields;
        if let Some(name) = record.get("nas") {
            return Some(name.to_string());
        }
        if let Some(name) = record
            .get(&f.nas_emm_type)
            .and_then(first_int)
            .and_then(nas::emm_message)
        {
            return Some(name.to_string());
        }
        if record.get(&f.nas_security_header).and_then(first_int)
            == Some(nas::SERVICE_REQUEST_HEADER_TYPE)
        {
            return Some("ServiceRequest".to_string());
        }
        info.and_then(nas::emm_message_from_info).map(str::to_string)
    }

    fn cause(&self, record: &RawRecord) -> Option<String> {
        let f = &self.fields;
        if let Some(text) = record.get("cause") {
            return Some(text.to_string());
        }
        let coded: [(&str, fn(u64) -> Option<&'static str>); 3] = [
            (f.radio_network_cause.as_str(), cause::radio_network),
            (f.nas_cause.as_str(), cause::nas),
            (f.transport_cause.as_str(), cause::transport),
        ];
        coded.iter().find_map(|(column, lookup)| {
            let raw = record.get(column)?;
            match first_int(raw) {
                Some(code) => lookup(code)
                    .map(str::to_string)
                    .or_else(|| Some(raw.to_string())),
                None => Some(raw.to_string()),
            }
        })
    }

    fn addresses(&self, record: &RawRecord) -> Option<AddressPair> {
        let f = &self.fields;
        let src_port = record.get(&f.src_port).and_then(first_int);
        let dst_port = record.get(&f.dst_port).and_then(first_int);

        let src = record.first_of(&["src", f.ip_src.as_str(), f.ipv6_src.as_str()])?;
        let dst = record.first_of(&["dst", f.ip_dst.as_str(), f.ipv6_dst.as_str()])?;

        Some(AddressPair {
            src: parse_endpoint(src, src_port)?,
            dst: parse_endpoint(dst, dst_port)?,
        })
    }
}

/// First value of a possibly multi-valued tshark field, as an integer.
fn first_int(raw: &str) -> Option<u64> {
    raw.split(',').next().and_then(parse_int)
}

fn parse_timestamp(raw: &str) -> Option<f64> {
    parse_time(raw).ok()
}

fn parse_endpoint(raw: &str, port: Option<u64>) -> Option<Endpoint> {
    let first = raw.split(',').next()?.trim();
    if let Ok(addr) = first.parse::<SocketAddr>() {
        return Some(Endpoint {
            ip: addr.ip(),
            port: Some(addr.port()),
        });
    }
    let ip = first.parse::<IpAddr>().ok()?;
    Some(Endpoint {
        ip,
        port: port.and_then(|p| u16::try_from(p).ok()),
    })
}
