//! The JSON result shape produced by the lab server's `/scenario/*`
//! endpoints and by the CLI's scenario subcommands — a single schema so
//! tooling built against one can read the other.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioResult {
    pub ok: bool,
    pub mode: String,
    pub version: u8,
    pub carrier: String,
    pub reason_code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub handshake_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypt_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decrypt_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ciphertext_len: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replay_rejected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id_trunc: Option<String>,
}

impl ScenarioResult {
    pub fn errored(mode: &str, carrier: &str) -> Self {
        Self {
            ok: false,
            mode: mode.to_string(),
            version: dee_crypto::wire::VERSION,
            carrier: carrier.to_string(),
            reason_code: "error".to_string(),
            handshake_ms: None,
            encrypt_ms: None,
            decrypt_ms: None,
            ciphertext_len: None,
            replay_rejected: None,
            session_id_trunc: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_fields_are_absent_from_the_serialized_form() {
        let result = ScenarioResult::errored("SAFE", "none");
        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("handshake_ms"));
        assert!(json.contains("\"reason_code\":\"error\""));
    }

    #[test]
    fn populated_fields_round_trip() {
        let mut result = ScenarioResult::errored("SAFE", "json");
        result.ok = true;
        result.reason_code = "ok".to_string();
        result.handshake_ms = Some(3);
        result.session_id_trunc = Some("deadbeefcafebabe".to_string());

        let json = serde_json::to_string(&result).unwrap();
        let back: ScenarioResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }
}
