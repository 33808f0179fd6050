use std::sync::Arc;

use ab_domain::capability::AdapterKind;
use ab_domain::message::{MessageRole, SessionState, UnifiedMessage};
use ab_sessions::{FileStorage, Session, SessionRepository};

#[test]
fn history_ring_retains_last_capacity_messages_across_persist_and_restore() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path()).unwrap());
    let repo = SessionRepository::new(storage.clone());

    let mut session = Session::new("s1".into(), "/repo".into(), AdapterKind::ClaudeAgentSdk, 3);
    session.state = SessionState::Active;
    for i in 0..10 {
        session.history.push(UnifiedMessage::text(MessageRole::Assistant, format!("turn {i}")));
    }
    session.pid = Some(1234);
    repo.insert(session);

    let repo2 = SessionRepository::new(storage);
    let restored = repo2.restore(3).unwrap();
    assert_eq!(restored, 1);

    let info = repo2.get_info("s1").unwrap();
    assert_eq!(info.message_history.len(), 3);
    assert_eq!(info.message_history[0].text_content(), "turn 7");
    assert_eq!(info.message_history[2].text_content(), "turn 9");
    assert_eq!(info.state, SessionState::Active);
}

#[test]
fn session_without_pid_is_restored_as_degraded_for_reconnect_watchdog() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path()).unwrap());
    let repo = SessionRepository::new(storage.clone());

    let mut session = Session::new("s2".into(), "/repo".into(), AdapterKind::Acp, 10);
    session.state = SessionState::Active;
    session.pid = None;
    repo.insert(session);

    let repo2 = SessionRepository::new(storage);
    repo2.restore(10).unwrap();
    assert_eq!(repo2.get_info("s2").unwrap().state, SessionState::Degraded);
}

#[test]
fn removed_session_is_gone_from_both_memory_and_disk() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path()).unwrap());
    let repo = SessionRepository::new(storage.clone());
    repo.insert(Session::new("s3".into(), "/repo".into(), AdapterKind::Opencode, 10));

    assert!(repo.remove("s3").is_some());

    let repo2 = SessionRepository::new(storage);
    assert_eq!(repo2.restore(10).unwrap(), 0);
}
