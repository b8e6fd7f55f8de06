//! Steganographic carriers: embed a base64url payload inside an
//! innocuous-looking JSON telemetry blob, HTTP header line, or URL query
//! string. Purely cosmetic framing — provides no confidentiality of its
//! own, and callers must already have encrypted the payload.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_PAYLOAD_SIZE: usize = 4096;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StegoError {
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("decode failed")]
    Decode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Carrier {
    /// JSON telemetry blob: `{"trace_id": <b64>, "span_id": "0"}`.
    Json,
    /// HTTP header line: `X-Trace-ID: <b64>`.
    Header,
    /// URL query string: `?ff=<b64[:8]>&v=<b64>`.
    Query,
}

impl Carrier {
    pub fn name(self) -> &'static str {
        match self {
            Carrier::Json => "json",
            Carrier::Header => "header",
            Carrier::Query => "query",
        }
    }
}

#[derive(Serialize, Deserialize)]
struct CarrierAPayload {
    trace_id: String,
    span_id: String,
}

#[derive(Serialize, Deserialize)]
struct CarrierCQuery {
    ff: String,
    v: String,
}

pub fn encode(carrier: Carrier, payload: &[u8]) -> Result<String, StegoError> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(StegoError::PayloadTooLarge);
    }
    let b64 = URL_SAFE_NO_PAD.encode(payload);
    Ok(match carrier {
        Carrier::Json => {
            let obj = CarrierAPayload {
                trace_id: b64,
                span_id: "0".to_string(),
            };
            serde_json::to_string(&obj).expect("carrier A payload always serializes")
        }
        Carrier::Header => format!("X-Trace-ID: {b64}"),
        Carrier::Query => {
            let ff: String = b64.chars().take(8).collect();
            format!("?ff={ff}&v={b64}")
        }
    })
}

pub fn decode(carrier: Carrier, encoded: &str) -> Result<Vec<u8>, StegoError> {
    let b64 = match carrier {
        Carrier::Json => {
            let obj: CarrierAPayload = serde_json::from_str(encoded).map_err(|_| StegoError::Decode)?;
            obj.trace_id
        }
        Carrier::Header => {
            let rest = encoded.strip_prefix("X-Trace-ID:").ok_or(StegoError::Decode)?;
            rest.trim().to_string()
        }
        Carrier::Query => {
            let query = encoded.strip_prefix('?').unwrap_or(encoded);
            if query.is_empty() {
                return Err(StegoError::Decode);
            }
            parse_query_value(query, "v").ok_or(StegoError::Decode)?
        }
    };
    URL_SAFE_NO_PAD.decode(b64).map_err(|_| StegoError::Decode)
}

fn parse_query_value(query: &str, key: &str) -> Option<String> {
    for pair in query.split('&') {
        let mut parts = pair.splitn(2, '=');
        let k = parts.next()?;
        let v = parts.next().unwrap_or("");
        if k == key {
            return Some(v.to_string());
        }
    }
    None
}
