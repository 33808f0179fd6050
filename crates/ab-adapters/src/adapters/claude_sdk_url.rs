//! Adapter for backends that speak the Claude Code "stream-json" wire
//! format over a socket the CLI itself dials back into the daemon on (the
//! inverted-socket handoff — see `ab-gateway`'s `SocketRegistry`). By the
//! time this adapter exists, the gateway has already accepted the socket
//! and handed it over as a [`ChannelTransport`]; this adapter only knows
//! how to speak the wire dialect, not how the socket got here.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use ab_domain::capability::{AdapterCapabilities, AdapterKind};
use ab_domain::error::{Error, Result};
use ab_domain::message::{ContentBlock, MessageKind, MessageRole, PermissionDecision, UnifiedMessage};

use crate::adapter::BackendAdapter;
use crate::transport::BackendTransport;

pub struct ClaudeSdkUrlAdapter {
    transport: Arc<dyn BackendTransport>,
}

impl ClaudeSdkUrlAdapter {
    pub fn new(transport: Arc<dyn BackendTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl BackendAdapter for ClaudeSdkUrlAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::ClaudeSdkUrl
    }

    fn capabilities(&self) -> AdapterCapabilities {
        AdapterCapabilities {
            interruptible: true,
            configurable: false,
            permission_handler: true,
            reconnectable: true,
        }
    }

    async fn send(&self, msg: &UnifiedMessage) -> Result<()> {
        let frame = json!({
            "type": "user",
            "message": { "role": "user", "content": msg.text_content() },
        });
        let line = serde_json::to_string(&frame).map_err(Error::Json)?;
        self.transport.send_line(&line).await
    }

    async fn recv(&self) -> Result<Option<UnifiedMessage>> {
        loop {
            let Some(line) = self.transport.recv_line().await? else {
                return Ok(None);
            };
            let frame: serde_json::Value = serde_json::from_str(&line)
                .map_err(|e| Error::Protocol(format!("malformed frame: {e}")))?;
            if let Some(msg) = translate_inbound(&frame) {
                return Ok(Some(msg));
            }
        }
    }

    async fn interrupt(&self) -> Result<()> {
        let line = serde_json::to_string(&json!({"type": "control_request", "subtype": "interrupt"}))
            .map_err(Error::Json)?;
        self.transport.send_line(&line).await
    }

    async fn handle_permission_decision(
        &self,
        request_id: &str,
        decision: PermissionDecision,
    ) -> Result<()> {
        let frame = json!({
            "type": "control_response",
            "request_id": request_id,
            "decision": decision,
        });
        let line = serde_json::to_string(&frame).map_err(Error::Json)?;
        self.transport.send_line(&line).await
    }

    async fn reconnect(&self) -> Result<()> {
        // The socket itself is replaced by the gateway delivering a fresh
        // ChannelTransport; this adapter has nothing further to do once
        // that handoff happens, so a reconnect call here is a no-op success.
        Ok(())
    }

    async fn shutdown(&self) {
        self.transport.shutdown().await;
    }
}

fn translate_inbound(frame: &serde_json::Value) -> Option<UnifiedMessage> {
    let kind = frame.get("type")?.as_str()?;
    match kind {
        "assistant" => {
            let text = frame.pointer("/message/content")?.as_str()?.to_string();
            Some(UnifiedMessage::text(MessageRole::Assistant, text))
        }
        "tool_use" => {
            let id = frame.get("id")?.as_str()?.to_string();
            let name = frame.get("name")?.as_str()?.to_string();
            let input = frame.get("input").cloned().unwrap_or(json!({}));
            Some(UnifiedMessage::new(
                MessageKind::ToolUse,
                MessageRole::Assistant,
                vec![ContentBlock::ToolUse { id, name, input }],
            ))
        }
        "tool_result" => {
            let tool_use_id = frame.get("tool_use_id")?.as_str()?.to_string();
            let content = frame
                .get("content")
                .and_then(|c| c.as_str())
                .unwrap_or_default()
                .to_string();
            let is_error = frame.get("is_error").and_then(|v| v.as_bool()).unwrap_or(false);
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
        "control_request" if frame.get("subtype").and_then(|s| s.as_str()) == Some("permission") => {
            let mut msg = UnifiedMessage::new(MessageKind::PermissionRequest, MessageRole::Backend, vec![]);
            msg.metadata.insert("request_id".into(), frame.get("request_id").cloned()?);
            msg.metadata.insert("tool_name".into(), frame.get("tool_name").cloned()?);
            msg.metadata
                .insert("input".into(), frame.get("input").cloned().unwrap_or(json!({})));
            Some(msg)
        }
        "result" => {
            let mut msg = UnifiedMessage::new(MessageKind::Status, MessageRole::Backend, vec![]);
            msg.metadata.insert("status".into(), json!("turn_complete"));
            Some(msg)
        }
        _ => None,
    }
}
