//! JSON wire codec.
//!
//! Wire format: one UTF-8 JSON object per datagram.
//! ```text
//!  {"OPERATION":"GET","TYPE":"STATUS"}
//!  {"OPERATION":"GET","TYPE":"STATIONS"}
//!  {"OPERATION":"SET","TYPE":"OPERATE","ZONE":"ZONE1","DURATION":"10"}
//!  {"OPERATION":"SET","TYPE":"CANCEL"}
//!  {"OPERATION":"SET","TYPE":"CANCEL_ALL"}
//! ```
//!
//! Datagrams are trimmed and upper-cased before decoding, so tags and
//! zone ids are case-insensitive on the wire.  Decoding happens once,
//! into the closed [`Request`] type; everything downstream matches on it.

use std::collections::BTreeMap;

use log::warn;
use serde::Serialize;
use serde_json::Value;

use crate::app::commands::{Command, Query, Request};
use crate::app::status::StatusSnapshot;
use crate::error::ProtocolError;

/// Trim and upper-case a raw datagram.
pub fn normalize(datagram: &[u8]) -> String {
    String::from_utf8_lossy(datagram).trim().to_uppercase()
}

/// Decode a normalized payload into a typed request.
pub fn decode(payload: &str) -> Result<Request, ProtocolError> {
    let value: Value =
        serde_json::from_str(payload).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    let Value::Object(fields) = value else {
        return Err(ProtocolError::Malformed("not a JSON object".into()));
    };

    let operation = fields
        .get("OPERATION")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingOperation)?;
    let kind = fields
        .get("TYPE")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingField("TYPE"))?;

    match (operation, kind) {
        ("GET", "STATUS") => Ok(Request::Get(Query::Status)),
        ("GET", "STATIONS") => Ok(Request::Get(Query::Stations)),
        ("SET", "OPERATE") => {
            let zone = fields
                .get("ZONE")
                .and_then(Value::as_str)
                .ok_or(ProtocolError::MissingField("ZONE"))?;
            let duration = fields
                .get("DURATION")
                .ok_or(ProtocolError::MissingField("DURATION"))?;
            Ok(Request::Set(Command::Operate {
                zone: zone.to_string(),
                duration_secs: parse_duration(duration)?,
            }))
        }
        ("SET", "CANCEL") => Ok(Request::Set(Command::Cancel)),
        ("SET", "CANCEL_ALL") => Ok(Request::Set(Command::CancelAll)),
        _ => Err(ProtocolError::Unrecognized {
            operation: operation.to_string(),
            kind: kind.to_string(),
        }),
    }
}

/// `DURATION` may arrive as `"10"` or `10`; either way it must be a
/// positive whole number that fits in `u32`.
fn parse_duration(value: &Value) -> Result<u32, ProtocolError> {
    let parsed = match value {
        Value::String(s) => s.trim().parse::<u32>().ok(),
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        _ => None,
    };
    parsed
        .filter(|&secs| secs > 0)
        .ok_or_else(|| ProtocolError::InvalidDuration(value.to_string()))
}

/// What goes back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Status(StatusSnapshot),
    Stations(BTreeMap<String, String>),
    /// The request payload, returned unchanged.
    Echo(String),
}

#[derive(Serialize)]
struct StatusWire<'a> {
    #[serde(rename = "ZONE")]
    zone: &'a str,
    #[serde(rename = "DURATION")]
    duration: u32,
    #[serde(rename = "START_TIME")]
    start_time: Value,
    #[serde(rename = "JOB_Q_SIZE")]
    job_q_size: usize,
}

impl Response {
    pub fn encode(&self) -> String {
        let encoded = match self {
            Self::Status(status) => serde_json::to_string(&StatusWire {
                zone: status.zone(),
                duration: status.duration_secs(),
                start_time: if status.is_idle() {
                    Value::from(0)
                } else {
                    Value::from(status.start_time_unix())
                },
                job_q_size: status.queue_depth,
            }),
            Self::Stations(stations) => serde_json::to_string(stations),
            Self::Echo(payload) => return payload.clone(),
        };
        encoded.unwrap_or_else(|e| {
            warn!("response encoding failed: {}", e);
            String::from("{}")
        })
    }
}
