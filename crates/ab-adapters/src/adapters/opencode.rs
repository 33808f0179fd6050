//! Adapter for Opencode's HTTP+SSE backend. Unlike the stdio adapters,
//! there is no long-lived process to read lines from: a background task
//! holds the `reqwest::Response` body open against the `/event` stream,
//! buffers chunks, splits on blank lines the way SSE requires, and pushes
//! translated messages onto a channel that `recv` drains.
//!
//! The buffering/draining shape is the same one used for provider
//! streaming elsewhere in this tree: buffer chunks, split on `\n\n`,
//! extract `data:` lines, feed each to a parser.

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{mpsc, Mutex};

use ab_domain::capability::{AdapterCapabilities, AdapterKind};
use ab_domain::error::{Error, Result};
use ab_domain::message::{ContentBlock, MessageKind, MessageRole, PermissionDecision, UnifiedMessage};

use crate::adapter::BackendAdapter;

pub struct OpencodeAdapter {
    http: reqwest::Client,
    base_url: String,
    session_id: String,
    buffer_cap_bytes: usize,
    inbound: Mutex<mpsc::Receiver<Result<UnifiedMessage>>>,
}

impl OpencodeAdapter {
    /// Start the adapter: opens the SSE event stream in a background task
    /// and returns once the first connection attempt has been made. The
    /// caller supplies a pre-built client so proxy/TLS settings stay
    /// centralized in the gateway's HTTP config.
    pub async fn connect(
        http: reqwest::Client,
        base_url: String,
        session_id: String,
        buffer_cap_bytes: usize,
    ) -> Result<Self> {
        let (tx, rx) = mpsc::channel(256);
        let events_url = format!("{base_url}/event");
        let response = http
            .get(&events_url)
            .send()
            .await
            .map_err(|e| Error::Adapter {
                adapter: "opencode".into(),
                message: format!("failed to open event stream: {e}"),
            })?;
        tokio::spawn(ingest_loop(response, tx, buffer_cap_bytes));

        Ok(Self {
            http,
            base_url,
            session_id,
            buffer_cap_bytes,
            inbound: Mutex::new(rx),
        })
    }
}

#[async_trait]
impl BackendAdapter for OpencodeAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Opencode
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
        let url = format!("{}/session/{}/message", self.base_url, self.session_id);
        let body = json!({ "parts": [{ "type": "text", "text": msg.text_content() }] });
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Adapter {
                adapter: "opencode".into(),
                message: format!("send failed: {e}"),
            })?;
        if !resp.status().is_success() {
            return Err(Error::ApiError {
                adapter: "opencode".into(),
                status: resp.status().as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }

    async fn recv(&self) -> Result<Option<UnifiedMessage>> {
        let mut rx = self.inbound.lock().await;
        match rx.recv().await {
            Some(Ok(msg)) => Ok(Some(msg)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    async fn interrupt(&self) -> Result<()> {
        let url = format!("{}/session/{}/abort", self.base_url, self.session_id);
        self.http.post(&url).send().await.map_err(|e| Error::Adapter {
            adapter: "opencode".into(),
            message: format!("interrupt failed: {e}"),
        })?;
        Ok(())
    }

    async fn handle_permission_decision(
        &self,
        request_id: &str,
        decision: PermissionDecision,
    ) -> Result<()> {
        let url = format!("{}/session/{}/permission/{}", self.base_url, self.session_id, request_id);
        let body = json!({ "decision": decision });
        self.http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Adapter {
                adapter: "opencode".into(),
                message: format!("permission response failed: {e}"),
            })?;
        Ok(())
    }

    async fn reconnect(&self) -> Result<()> {
        let events_url = format!("{}/event", self.base_url);
        let response = self.http.get(&events_url).send().await.map_err(|e| Error::Adapter {
            adapter: "opencode".into(),
            message: format!("reconnect failed: {e}"),
        })?;
        let (tx, mut rx) = mpsc::channel(256);
        std::mem::swap(&mut *self.inbound.lock().await, &mut rx);
        tokio::spawn(ingest_loop(response, tx, self.buffer_cap_bytes));
        Ok(())
    }

    async fn shutdown(&self) {
        self.inbound.lock().await.close();
    }
}

/// Extract complete `data:` payloads from an SSE buffer, draining consumed
/// bytes and leaving any trailing partial event for the next call.
fn drain_data_lines(buffer: &mut String) -> Vec<String> {
    let mut data_lines = Vec::new();
    while let Some(pos) = buffer.find("\n\n") {
        let block: String = buffer.drain(..pos).collect();
        buffer.drain(..2);
        for line in block.lines() {
            let line = line.trim();
            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim();
                if !data.is_empty() {
                    data_lines.push(data.to_string());
                }
            }
        }
    }
    data_lines
}

async fn ingest_loop(
    mut response: reqwest::Response,
    tx: mpsc::Sender<Result<UnifiedMessage>>,
    buffer_cap_bytes: usize,
) {
    let mut buffer = String::new();
    loop {
        match response.chunk().await {
            Ok(Some(bytes)) => {
                buffer.push_str(&String::from_utf8_lossy(&bytes));
                if buffer.len() > buffer_cap_bytes {
                    let _ = tx
                        .send(Err(Error::Adapter {
                            adapter: "opencode".into(),
                            message: "SSE buffer exceeded configured cap without a complete event".into(),
                        }))
                        .await;
                    return;
                }
                for data in drain_data_lines(&mut buffer) {
                    if let Some(msg) = translate_event(&data) {
                        if tx.send(Ok(msg)).await.is_err() {
                            return;
                        }
                    }
                }
            }
            Ok(None) => return,
            Err(e) => {
                let _ = tx
                    .send(Err(Error::Adapter {
                        adapter: "opencode".into(),
                        message: format!("event stream error: {e}"),
                    }))
                    .await;
                return;
            }
        }
    }
}

fn translate_event(data: &str) -> Option<UnifiedMessage> {
    let frame: serde_json::Value = serde_json::from_str(data).ok()?;
    let event_type = frame.get("type")?.as_str()?;
    let props = frame.get("properties").cloned().unwrap_or(json!({}));
    match event_type {
        "message.part.updated" => {
            let part = props.get("part")?;
            match part.get("type").and_then(|t| t.as_str())? {
                "text" => {
                    let text = part.get("text")?.as_str()?.to_string();
                    Some(UnifiedMessage::text(MessageRole::Assistant, text))
                }
                "tool" => {
                    let id = part.get("id")?.as_str()?.to_string();
                    let name = part.get("tool")?.as_str()?.to_string();
                    let input = part.get("input").cloned().unwrap_or(json!({}));
                    Some(UnifiedMessage::new(
                        MessageKind::ToolUse,
                        MessageRole::Assistant,
                        vec![ContentBlock::ToolUse { id, name, input }],
                    ))
                }
                _ => None,
            }
        }
        "permission.updated" => {
            let mut msg = UnifiedMessage::new(MessageKind::PermissionRequest, MessageRole::Backend, vec![]);
            msg.metadata.insert("request_id".into(), props.get("id").cloned()?);
            msg.metadata
                .insert("tool_name".into(), props.get("tool").cloned().unwrap_or(json!("unknown")));
            msg.metadata
                .insert("input".into(), props.get("input").cloned().unwrap_or(json!({})));
            Some(msg)
        }
        "session.idle" => {
            let mut msg = UnifiedMessage::new(MessageKind::Status, MessageRole::Backend, vec![]);
            msg.metadata.insert("status".into(), json!("turn_complete"));
            Some(msg)
        }
        _ => None,
    }
}
