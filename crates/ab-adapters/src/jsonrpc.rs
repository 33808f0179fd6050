//! JSON-RPC 2.0 framing shared by the subprocess-based adapters
//! (Claude Agent SDK, ACP, Gemini). Every request carries a monotonically
//! increasing integer id; every line on the wire is newline-terminated.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use ab_domain::error::{Error, Result};

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Generates monotonically increasing request ids for one adapter session.
#[derive(Debug, Default)]
pub struct IdGenerator(AtomicU64);

impl IdGenerator {
    pub fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

pub fn encode_request(id: u64, method: impl Into<String>, params: Option<Value>) -> String {
    let req = JsonRpcRequest {
        jsonrpc: "2.0",
        id,
        method: method.into(),
        params,
    };
    format!("{}\n", serde_json::to_string(&req).unwrap_or_default())
}

pub fn encode_notification(method: impl Into<String>, params: Option<Value>) -> String {
    let note = JsonRpcNotification {
        jsonrpc: "2.0",
        method: method.into(),
        params,
    };
    format!("{}\n", serde_json::to_string(&note).unwrap_or_default())
}

/// Parse one line of JSON-RPC traffic. Rejects anything that isn't
/// `jsonrpc == "2.0"` rather than guessing at a looser dialect.
pub fn decode_response(line: &str) -> Result<JsonRpcResponse> {
    let resp: JsonRpcResponse =
        serde_json::from_str(line).map_err(|e| Error::Protocol(format!("malformed frame: {e}")))?;
    if resp.jsonrpc != "2.0" {
        return Err(Error::Protocol(format!(
            "unsupported jsonrpc version: {}",
            resp.jsonrpc
        )));
    }
    Ok(resp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_generator_is_monotonic() {
        let gen = IdGenerator::new();
        let a = gen.next();
        let b = gen.next();
        let c = gen.next();
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn encode_request_is_newline_terminated() {
        let line = encode_request(1, "initialize", None);
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn decode_response_rejects_wrong_version() {
        let err = decode_response(r#"{"jsonrpc":"1.0","id":1,"result":null}"#).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn decode_response_rejects_malformed_json() {
        let err = decode_response("not json at all").unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn decode_response_accepts_valid_frame() {
        let resp = decode_response(r#"{"jsonrpc":"2.0","id":1,"result":{"ok":true}}"#).unwrap();
        assert_eq!(resp.id, Some(1));
        assert_eq!(resp.result.unwrap()["ok"], true);
    }

    #[test]
    fn decode_response_carries_error() {
        let resp =
            decode_response(r#"{"jsonrpc":"2.0","id":2,"error":{"code":-32600,"message":"bad"}}"#)
                .unwrap();
        assert_eq!(resp.error.unwrap().code, -32600);
    }
}
