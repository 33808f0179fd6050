//! Constructs concrete [`BackendAdapter`]s from an [`AdapterKind`] plus
//! whatever that kind needs to get started. Stdio-backed kinds take a
//! command line; the socket-backed kind takes a transport the gateway
//! already built; Opencode takes an HTTP client and session handle. The
//! runtime only ever asks the registry for a kind, never constructs an
//! adapter struct directly.

use std::sync::Arc;

use ab_domain::capability::AdapterKind;
use ab_domain::error::{Error, Result};

use crate::adapter::BackendAdapter;
use crate::adapters::{AcpAdapter, ClaudeAgentSdkAdapter, ClaudeSdkUrlAdapter, GeminiAdapter, OpencodeAdapter};
use crate::transport::{BackendTransport, ChannelTransport, StdioTransport};

/// Start a stdio-backed adapter by spawning `command[0]` with the rest of
/// `command` as arguments. `kind` must be one of the stdio-speaking kinds
/// (`ClaudeAgentSdk`, `Acp`, `Gemini`); any other kind is a programming
/// error in the caller.
pub fn spawn_stdio(kind: AdapterKind, command: &[String], max_skip_lines: u32) -> Result<Arc<dyn BackendAdapter>> {
    if !matches!(kind, AdapterKind::ClaudeAgentSdk | AdapterKind::Acp | AdapterKind::Gemini) {
        return Err(Error::Config(format!("{kind:?} is not a stdio-backed adapter kind")));
    }
    let (program, args) = command
        .split_first()
        .ok_or_else(|| Error::Config("empty command template".into()))?;
    let transport: Arc<dyn BackendTransport> = Arc::new(StdioTransport::spawn(program, args, max_skip_lines)?);

    match kind {
        AdapterKind::ClaudeAgentSdk => Ok(Arc::new(ClaudeAgentSdkAdapter::new(transport))),
        AdapterKind::Acp => Ok(Arc::new(AcpAdapter::new(transport))),
        AdapterKind::Gemini => Ok(Arc::new(GeminiAdapter::new(transport))),
        _ => unreachable!("validated above"),
    }
}

/// Build the Claude SDK-URL adapter over a transport the gateway already
/// assembled from an accepted inverted-socket connection.
pub fn from_channel(outbound: tokio::sync::mpsc::Sender<String>, inbound: tokio::sync::mpsc::Receiver<String>) -> Arc<dyn BackendAdapter> {
    let transport = ChannelTransport::wrap(outbound, inbound);
    Arc::new(ClaudeSdkUrlAdapter::new(transport))
}

/// Build the Opencode adapter, opening its SSE event stream immediately.
pub async fn connect_opencode(
    http: reqwest::Client,
    base_url: String,
    session_id: String,
    buffer_cap_bytes: usize,
) -> Result<Arc<dyn BackendAdapter>> {
    let adapter = OpencodeAdapter::connect(http, base_url, session_id, buffer_cap_bytes).await?;
    Ok(Arc::new(adapter))
}
