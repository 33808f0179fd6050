//! The slash-command dispatch chain: an inbound `slash_command` passes
//! through ordered handlers until the first one claims it. Each handler
//! produces a `slash_command_result` carrying the original `request_id`.

use ab_domain::message::{ContentBlock, MessageKind, MessageRole, UnifiedMessage};

/// Where a slash-command result came from, surfaced to the consumer so UIs
/// can distinguish a locally-emulated reply from a backend-native one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSource {
    Emulated,
    AdapterNative,
    Passthrough,
    Unsupported,
}

impl ResultSource {
    fn as_str(self) -> &'static str {
        match self {
            ResultSource::Emulated => "emulated",
            ResultSource::AdapterNative => "adapter_native",
            ResultSource::Passthrough => "passthrough",
            ResultSource::Unsupported => "unsupported",
        }
    }
}

/// Local, always-available built-ins. Handled without ever reaching the
/// backend, and callable programmatically (bypassing the consumer socket).
pub fn local_handler(command: &str) -> Option<String> {
    match command {
        "/help" => Some("Available commands: /help, /compact".to_string()),
        "/compact" => Some("Conversation history compacted.".to_string()),
        _ => None,
    }
}

/// Build the `slash_command_result` unified message the chain emits,
/// regardless of which handler claimed the command.
pub fn build_result(request_id: &str, content: String, source: ResultSource) -> UnifiedMessage {
    let mut msg = UnifiedMessage::new(
        MessageKind::Control,
        MessageRole::System,
        vec![ContentBlock::Text { text: content }],
    );
    msg.metadata.insert("request_id".into(), serde_json::json!(request_id));
    msg.metadata.insert("source".into(), serde_json::json!(source.as_str()));
    msg
}

/// Dispatch a slash command through the chain: Local, then (if the adapter
/// advertises `slashCommands`) AdapterNative, then Passthrough, else
/// Unsupported. The caller supplies whether the adapter can natively
/// handle slash commands and a closure for forwarding to it; this function
/// only decides ownership and builds the terminal `slash_command_result`
/// for the handlers it can resolve locally (Local/Unsupported). Passthrough
/// and AdapterNative require the runtime to actually talk to the adapter,
/// so they're represented here as a claimed-but-pending marker.
pub enum DispatchOutcome {
    Resolved(UnifiedMessage),
    Passthrough { request_id: String, command: String },
    ForwardToAdapter { request_id: String, command: String },
}

pub fn dispatch(request_id: &str, command: &str, adapter_supports_slash_commands: bool) -> DispatchOutcome {
    if let Some(content) = local_handler(command) {
        return DispatchOutcome::Resolved(build_result(request_id, content, ResultSource::Emulated));
    }
    if adapter_supports_slash_commands {
        return DispatchOutcome::ForwardToAdapter {
            request_id: request_id.to_string(),
            command: command.to_string(),
        };
    }
    DispatchOutcome::Passthrough {
        request_id: request_id.to_string(),
        command: command.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_is_handled_locally() {
        let outcome = dispatch("req-1", "/help", false);
        match outcome {
            DispatchOutcome::Resolved(msg) => {
                assert_eq!(msg.metadata["source"], "emulated");
                assert!(msg.text_content().contains("/help"));
                assert!(msg.text_content().contains("/compact"));
            }
            _ => panic!("expected local resolution"),
        }
    }

    #[test]
    fn unknown_command_forwards_to_adapter_when_supported() {
        let outcome = dispatch("req-2", "/weird", true);
        assert!(matches!(outcome, DispatchOutcome::ForwardToAdapter { .. }));
    }

    #[test]
    fn unknown_command_falls_back_to_passthrough_when_unsupported() {
        let outcome = dispatch("req-3", "/weird", false);
        assert!(matches!(outcome, DispatchOutcome::Passthrough { .. }));
    }

    #[test]
    fn build_result_carries_request_id_for_correlation() {
        let msg = build_result("req-4", "done".into(), ResultSource::Unsupported);
        assert_eq!(msg.metadata["request_id"], "req-4");
        assert_eq!(msg.metadata["source"], "unsupported");
    }
}
