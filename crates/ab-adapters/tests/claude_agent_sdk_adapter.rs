use std::sync::Arc;

use ab_adapters::adapter::BackendAdapter;
use ab_adapters::adapters::ClaudeAgentSdkAdapter;
use ab_adapters::transport::ChannelTransport;
use ab_domain::message::{MessageKind, MessageRole, UnifiedMessage};
use tokio::sync::mpsc;

fn wired_adapter() -> (ClaudeAgentSdkAdapter, mpsc::Receiver<String>, mpsc::Sender<String>) {
    let (to_backend_tx, to_backend_rx) = mpsc::channel(8);
    let (from_backend_tx, from_backend_rx) = mpsc::channel(8);
    let transport = Arc::new(ChannelTransport::new(to_backend_tx, from_backend_rx));
    (ClaudeAgentSdkAdapter::new(transport), to_backend_rx, from_backend_tx)
}

#[tokio::test]
async fn send_emits_a_user_message_notification() {
    let (adapter, mut to_backend_rx, _from_backend_tx) = wired_adapter();
    let msg = UnifiedMessage::text(MessageRole::User, "what is 2+2?");
    adapter.send(&msg).await.unwrap();

    let line = to_backend_rx.recv().await.unwrap();
    assert!(line.contains("turn/user_message"));
    assert!(line.contains("what is 2+2?"));
}

#[tokio::test]
async fn recv_translates_assistant_delta_and_skips_plain_responses() {
    let (adapter, _to_backend_rx, from_backend_tx) = wired_adapter();

    from_backend_tx
        .send(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#.to_string())
        .await
        .unwrap();
    from_backend_tx
        .send(r#"{"jsonrpc":"2.0","method":"turn/assistant_delta","params":{"text":"4"}}"#.to_string())
        .await
        .unwrap();

    let msg = adapter.recv().await.unwrap().unwrap();
    assert_eq!(msg.kind, MessageKind::Text);
    assert_eq!(msg.text_content(), "4");
}

#[tokio::test]
async fn recv_returns_none_once_backend_channel_closes() {
    let (adapter, _to_backend_rx, from_backend_tx) = wired_adapter();
    drop(from_backend_tx);
    assert!(adapter.recv().await.unwrap().is_none());
}
