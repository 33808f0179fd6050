//! Gemini CLI speaks the same ACP dialect as [`crate::adapters::acp`] but
//! reports failures as plain-text `session/update` error strings instead
//! of JSON-RPC error objects. This adapter reuses ACP's line translator
//! and layers a classifier on top that turns recognizable failure text
//! into the right [`ab_domain::error::Error`] variant so the runtime's
//! reconnect policy can tell an auth failure from a rate limit.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use ab_domain::capability::{AdapterCapabilities, AdapterKind};
use ab_domain::error::{Error, Result};
use ab_domain::message::{PermissionDecision, UnifiedMessage};

use crate::adapter::BackendAdapter;
use crate::adapters::acp::translate_acp_line;
use crate::jsonrpc::{encode_notification, encode_request, IdGenerator};
use crate::transport::BackendTransport;

pub struct GeminiAdapter {
    transport: Arc<dyn BackendTransport>,
    ids: IdGenerator,
}

impl GeminiAdapter {
    pub fn new(transport: Arc<dyn BackendTransport>) -> Self {
        Self {
            transport,
            ids: IdGenerator::new(),
        }
    }
}

#[async_trait]
impl BackendAdapter for GeminiAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Gemini
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
            if let Some(classified) = classify_error_line(&line) {
                return Err(classified);
            }
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

    async fn reconnect(&self) -> Result<()> {
        Ok(())
    }

    async fn shutdown(&self) {
        self.transport.shutdown().await;
    }
}

/// Inspect a raw `session/update` error-text line for known Gemini failure
/// signatures. Returns `None` for anything that isn't a classifiable
/// failure, leaving it to the normal ACP translator.
fn classify_error_line(line: &str) -> Option<Error> {
    let frame: serde_json::Value = serde_json::from_str(line).ok()?;
    if frame.get("method").and_then(|m| m.as_str()) != Some("session/update") {
        return None;
    }
    let params = frame.get("params")?;
    if params.get("update_kind").and_then(|k| k.as_str()) != Some("error") {
        return None;
    }
    let text = params.get("text").and_then(|t| t.as_str()).unwrap_or_default();
    let lower = text.to_ascii_lowercase();

    if lower.contains("invalid api key") || lower.contains("unauthorized") || lower.contains("401") {
        return Some(Error::ProviderAuth {
            adapter: "gemini".into(),
            message: text.to_string(),
        });
    }
    if lower.contains("rate limit") || lower.contains("429") || lower.contains("quota exceeded") {
        return Some(Error::RateLimit {
            adapter: "gemini".into(),
            retry_after_ms: None,
        });
    }
    if lower.contains("context length") || lower.contains("context window") || lower.contains("too many tokens")
    {
        return Some(Error::ContextOverflow {
            adapter: "gemini".into(),
        });
    }
    Some(Error::Adapter {
        adapter: "gemini".into(),
        message: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_update(text: &str) -> String {
        format!(
            r#"{{"jsonrpc":"2.0","method":"session/update","params":{{"update_kind":"error","text":"{text}"}}}}"#
        )
    }

    #[test]
    fn classifies_auth_failure() {
        let err = classify_error_line(&error_update("Invalid API key supplied")).unwrap();
        assert!(matches!(err, Error::ProviderAuth { .. }));
    }

    #[test]
    fn classifies_rate_limit() {
        let err = classify_error_line(&error_update("429 rate limit exceeded")).unwrap();
        assert!(matches!(err, Error::RateLimit { .. }));
    }

    #[test]
    fn classifies_context_overflow() {
        let err = classify_error_line(&error_update("context window exceeded for model")).unwrap();
        assert!(matches!(err, Error::ContextOverflow { .. }));
    }

    #[test]
    fn unclassified_error_falls_back_to_adapter_error() {
        let err = classify_error_line(&error_update("something broke")).unwrap();
        assert!(matches!(err, Error::Adapter { .. }));
    }

    #[test]
    fn non_error_update_is_not_classified() {
        let line = r#"{"jsonrpc":"2.0","method":"session/update","params":{"update_kind":"text","text":"hi"}}"#;
        assert!(classify_error_line(line).is_none());
    }
}
