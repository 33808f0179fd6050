//! Adapter for the Claude Agent SDK, spoken as JSON-RPC 2.0 over a
//! subprocess's stdio. The SDK is injected a `queryFn` by its host process
//! in-language; here the host process *is* the subprocess we spawn, and we
//! talk to it the same way `sa-mcp-client`'s stdio transport talks to an
//! MCP server.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use ab_domain::capability::{AdapterCapabilities, AdapterKind};
use ab_domain::error::{Error, Result};
use ab_domain::message::{ContentBlock, MessageKind, MessageRole, PermissionDecision, UnifiedMessage};

use crate::adapter::BackendAdapter;
use crate::jsonrpc::{encode_notification, encode_request, IdGenerator};
use crate::transport::BackendTransport;

pub struct ClaudeAgentSdkAdapter {
    transport: Arc<dyn BackendTransport>,
    ids: IdGenerator,
}

impl ClaudeAgentSdkAdapter {
    pub fn new(transport: Arc<dyn BackendTransport>) -> Self {
        Self {
            transport,
            ids: IdGenerator::new(),
        }
    }
}

#[async_trait]
impl BackendAdapter for ClaudeAgentSdkAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::ClaudeAgentSdk
    }

    fn capabilities(&self) -> AdapterCapabilities {
        AdapterCapabilities {
            interruptible: true,
            configurable: true,
            permission_handler: true,
            reconnectable: false,
        }
    }

    async fn send(&self, msg: &UnifiedMessage) -> Result<()> {
        let params = json!({
            "role": msg.role,
            "text": msg.text_content(),
        });
        let line = encode_notification("turn/user_message", Some(params));
        self.transport.send_line(&line).await
    }

    async fn recv(&self) -> Result<Option<UnifiedMessage>> {
        loop {
            let Some(line) = self.transport.recv_line().await? else {
                return Ok(None);
            };
            let frame: serde_json::Value = serde_json::from_str(&line)
                .map_err(|e| Error::Protocol(format!("malformed frame: {e}")))?;
            let Some(method) = frame.get("method").and_then(|m| m.as_str()) else {
                // A response to a request we issued (interrupt/reconfigure ack); not
                // a backend-initiated message, keep reading.
                continue;
            };
            if let Some(msg) = translate_inbound(method, frame.get("params").unwrap_or(&json!({})))
            {
                return Ok(Some(msg));
            }
        }
    }

    async fn interrupt(&self) -> Result<()> {
        let id = self.ids.next();
        let line = encode_request(id, "turn/interrupt", None);
        self.transport.send_line(&line).await
    }

    async fn reconfigure(&self, options: serde_json::Value) -> Result<()> {
        let id = self.ids.next();
        let line = encode_request(id, "session/configure", Some(options));
        self.transport.send_line(&line).await
    }

    async fn handle_permission_decision(
        &self,
        request_id: &str,
        decision: PermissionDecision,
    ) -> Result<()> {
        let id = self.ids.next();
        let params = json!({ "request_id": request_id, "decision": decision });
        let line = encode_request(id, "permission/respond", Some(params));
        self.transport.send_line(&line).await
    }

    async fn shutdown(&self) {
        self.transport.shutdown().await;
    }
}

fn translate_inbound(method: &str, params: &serde_json::Value) -> Option<UnifiedMessage> {
    match method {
        "turn/assistant_delta" | "turn/assistant_message" => {
            let text = params.get("text")?.as_str()?.to_string();
            Some(UnifiedMessage::text(MessageRole::Assistant, text))
        }
        "turn/thinking" => {
            let text = params.get("text")?.as_str().unwrap_or_default().to_string();
            Some(UnifiedMessage::new(
                MessageKind::Thinking,
                MessageRole::Assistant,
                vec![ContentBlock::Thinking { text }],
            ))
        }
        "tool/use" => {
            let id = params.get("id")?.as_str()?.to_string();
            let name = params.get("name")?.as_str()?.to_string();
            let input = params.get("input").cloned().unwrap_or(json!({}));
            Some(UnifiedMessage::new(
                MessageKind::ToolUse,
                MessageRole::Assistant,
                vec![ContentBlock::ToolUse { id, name, input }],
            ))
        }
        "tool/result" => {
            let tool_use_id = params.get("tool_use_id")?.as_str()?.to_string();
            let content = params
                .get("content")
                .and_then(|c| c.as_str())
                .unwrap_or_default()
                .to_string();
            let is_error = params.get("is_error").and_then(|v| v.as_bool()).unwrap_or(false);
            Some(UnifiedMessage::new(
                MessageKind::ToolResult,
                MessageRole::Backend,
                vec![ContentBlock::ToolResult {
                    tool_use_id,
                    is_error,
                    content,
                }],
            ))
        }
        "permission/request" => {
            let mut msg = UnifiedMessage::new(MessageKind::PermissionRequest, MessageRole::Backend, vec![]);
            msg.metadata.insert("request_id".into(), params.get("request_id").cloned()?);
            msg.metadata.insert("tool_name".into(), params.get("tool_name").cloned()?);
            msg.metadata
                .insert("input".into(), params.get("input").cloned().unwrap_or(json!({})));
            Some(msg)
        }
        "turn/status" => {
            let status = params.get("status")?.as_str()?.to_string();
            let mut msg = UnifiedMessage::new(MessageKind::Status, MessageRole::Backend, vec![]);
            msg.metadata.insert("status".into(), json!(status));
            Some(msg)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_assistant_delta() {
        let msg = translate_inbound("turn/assistant_delta", &json!({"text": "hi"})).unwrap();
        assert_eq!(msg.text_content(), "hi");
        assert_eq!(msg.role, MessageRole::Assistant);
    }

    #[test]
    fn translates_tool_use() {
        let msg = translate_inbound(
            "tool/use",
            &json!({"id": "t1", "name": "bash", "input": {"cmd": "ls"}}),
        )
        .unwrap();
        assert_eq!(msg.kind, MessageKind::ToolUse);
    }

    #[test]
    fn translates_permission_request() {
        let msg = translate_inbound(
            "permission/request",
            &json!({"request_id": "r1", "tool_name": "bash", "input": {}}),
        )
        .unwrap();
        assert_eq!(msg.kind, MessageKind::PermissionRequest);
        assert_eq!(msg.metadata["request_id"], "r1");
    }

    #[test]
    fn unknown_method_yields_no_message() {
        assert!(translate_inbound("unknown/thing", &json!({})).is_none());
    }
}
