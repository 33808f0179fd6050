//! Generic Agent Client Protocol adapter: any subprocess that speaks
//! ACP's JSON-RPC-over-stdio dialect (`session/prompt`, `session/update`,
//! `session/request_permission`, `session/cancel`). Gemini's CLI speaks an
//! ACP variant and layers its own error classifier on top — see
//! [`crate::adapters::gemini`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use ab_domain::capability::{AdapterCapabilities, AdapterKind};
use ab_domain::error::{Error, Result};
use ab_domain::message::{ContentBlock, MessageKind, MessageRole, PermissionDecision, UnifiedMessage};

use crate::adapter::BackendAdapter;
use crate::jsonrpc::{encode_notification, encode_request, IdGenerator};
use crate::transport::BackendTransport;

pub struct AcpAdapter {
    transport: Arc<dyn BackendTransport>,
    ids: IdGenerator,
}

impl AcpAdapter {
    pub fn new(transport: Arc<dyn BackendTransport>) -> Self {
        Self {
            transport,
            ids: IdGenerator::new(),
        }
    }
}

#[async_trait]
impl BackendAdapter for AcpAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Acp
    }

    fn capabilities(&self) -> AdapterCapabilities {
        AdapterCapabilities {
            interruptible: true,
            configurable: false,
            permission_handler: true,
            reconnectable: false,
        }
    }

    async fn send(&self, msg: &UnifiedMessage) -> Result<()> {
        let id = self.ids.next();
        let params = json!({ "prompt": msg.text_content() });
        let line = encode_request(id, "session/prompt", Some(params));
        self.transport.send_line(&line).await
    }

    async fn recv(&self) -> Result<Option<UnifiedMessage>> {
        loop {
            let Some(line) = self.transport.recv_line().await? else {
                return Ok(None);
            };
            if let Some(msg) = translate_acp_line(&line)? {
                return Ok(Some(msg));
            }
        }
    }

    async fn interrupt(&self) -> Result<()> {
        let line = encode_notification("session/cancel", None);
        self.transport.send_line(&line).await
    }

    async fn handle_permission_decision(
        &self,
        request_id: &str,
        decision: PermissionDecision,
    ) -> Result<()> {
        let id = self.ids.next();
        let params = json!({ "request_id": request_id, "outcome": decision });
        let line = encode_request(id, "session/respond_permission", Some(params));
        self.transport.send_line(&line).await
    }

    async fn shutdown(&self) {
        self.transport.shutdown().await;
    }
}

/// Parse one ACP stdio line into a [`UnifiedMessage`], shared by the
/// generic ACP adapter and Gemini's ACP-variant adapter.
pub(crate) fn translate_acp_line(line: &str) -> Result<Option<UnifiedMessage>> {
    let frame: serde_json::Value =
        serde_json::from_str(line).map_err(|e| Error::Protocol(format!("malformed frame: {e}")))?;
    let Some(method) = frame.get("method").and_then(|m| m.as_str()) else {
        return Ok(None);
    };
    let params = frame.get("params").cloned().unwrap_or(json!({}));
    Ok(build_message(method, &params))
}

fn build_message(method: &str, params: &serde_json::Value) -> Option<UnifiedMessage> {
    match method {
        "session/update" => {
            let kind = params.get("update_kind").and_then(|k| k.as_str()).unwrap_or("text");
            match kind {
                "tool_call" => {
                    let id = params.get("id")?.as_str()?.to_string();
                    let name = params.get("tool_name")?.as_str()?.to_string();
                    let input = params.get("input").cloned().unwrap_or(json!({}));
                    Some(UnifiedMessage::new(
                        MessageKind::ToolUse,
                        MessageRole::Assistant,
                        vec![ContentBlock::ToolUse { id, name, input }],
                    ))
                }
                _ => {
                    let text = params.get("text")?.as_str()?.to_string();
                    Some(UnifiedMessage::text(MessageRole::Assistant, text))
                }
            }
        }
        "session/request_permission" => {
            let mut msg = UnifiedMessage::new(MessageKind::PermissionRequest, MessageRole::Backend, vec![]);
            msg.metadata.insert("request_id".into(), params.get("request_id").cloned()?);
            msg.metadata.insert("tool_name".into(), params.get("tool_name").cloned()?);
            msg.metadata
                .insert("input".into(), params.get("input").cloned().unwrap_or(json!({})));
            Some(msg)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_text_update() {
        let line = r#"{"jsonrpc":"2.0","method":"session/update","params":{"update_kind":"text","text":"hello"}}"#;
        let msg = translate_acp_line(line).unwrap().unwrap();
        assert_eq!(msg.text_content(), "hello");
    }

    #[test]
    fn translates_tool_call_update() {
        let line = r#"{"jsonrpc":"2.0","method":"session/update","params":{"update_kind":"tool_call","id":"c1","tool_name":"bash","input":{}}}"#;
        let msg = translate_acp_line(line).unwrap().unwrap();
        assert_eq!(msg.kind, MessageKind::ToolUse);
    }

    #[test]
    fn translates_permission_request() {
        let line = r#"{"jsonrpc":"2.0","method":"session/request_permission","params":{"request_id":"r1","tool_name":"bash","input":{}}}"#;
        let msg = translate_acp_line(line).unwrap().unwrap();
        assert_eq!(msg.kind, MessageKind::PermissionRequest);
    }

    #[test]
    fn non_notification_lines_yield_nothing() {
        let line = r#"{"jsonrpc":"2.0","id":1,"result":{}}"#;
        assert!(translate_acp_line(line).unwrap().is_none());
    }

    #[test]
    fn malformed_line_is_protocol_error() {
        assert!(translate_acp_line("not json").is_err());
    }
}
