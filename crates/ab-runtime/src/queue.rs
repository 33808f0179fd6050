//! The per-session outbound queue: user messages enqueued while a session
//! is busy, auto-dequeued and sent once a `result` message arrives from the
//! backend (implying idle).

use ab_domain::message::UnifiedMessage;
use ab_sessions::Session;

/// Append a queued message, tagging it with the author so only that author
/// may later update or cancel it.
pub fn enqueue(session: &mut Session, mut msg: UnifiedMessage, author_id: &str) {
    msg.metadata.insert("queued_by".into(), serde_json::json!(author_id));
    session.pending_outbound.push_back(msg);
}

/// Update a still-queued message's content, if `author_id` matches the
/// original author and the message is still present.
pub fn update(session: &mut Session, message_id: &str, author_id: &str, new_text: String) -> bool {
    if let Some(entry) = session
        .pending_outbound
        .iter_mut()
        .find(|m| m.id == message_id)
    {
        if entry.metadata.get("queued_by").and_then(|v| v.as_str()) != Some(author_id) {
            return false;
        }
        entry.content = vec![ab_domain::message::ContentBlock::Text { text: new_text }];
        return true;
    }
    false
}

/// Cancel (remove) a still-queued message, if `author_id` matches.
pub fn cancel(session: &mut Session, message_id: &str, author_id: &str) -> bool {
    let Some(pos) = session.pending_outbound.iter().position(|m| m.id == message_id) else {
        return false;
    };
    if session.pending_outbound[pos].metadata.get("queued_by").and_then(|v| v.as_str()) != Some(author_id) {
        return false;
    }
    session.pending_outbound.remove(pos);
    true
}

/// Pop the head of the queue, called when a backend `result` message implies
/// the session is idle and ready to accept the next queued send.
pub fn dequeue_on_result(session: &mut Session) -> Option<UnifiedMessage> {
    session.pending_outbound.pop_front()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ab_domain::capability::AdapterKind;
    use ab_domain::message::MessageRole;

    fn session() -> Session {
        Session::new("s1".into(), "/tmp".into(), AdapterKind::Acp, 10)
    }

    #[test]
    fn dequeue_returns_messages_in_fifo_order() {
        let mut session = session();
        enqueue(&mut session, UnifiedMessage::text(MessageRole::User, "first"), "alice");
        enqueue(&mut session, UnifiedMessage::text(MessageRole::User, "second"), "alice");

        assert_eq!(dequeue_on_result(&mut session).unwrap().text_content(), "first");
        assert_eq!(dequeue_on_result(&mut session).unwrap().text_content(), "second");
        assert!(dequeue_on_result(&mut session).is_none());
    }

    #[test]
    fn update_by_non_author_is_rejected() {
        let mut session = session();
        enqueue(&mut session, UnifiedMessage::text(MessageRole::User, "mine"), "alice");
        let id = session.pending_outbound[0].id.clone();
        assert!(!update(&mut session, &id, "bob", "hijacked".into()));
        assert_eq!(session.pending_outbound[0].text_content(), "mine");
    }

    #[test]
    fn update_by_author_succeeds() {
        let mut session = session();
        enqueue(&mut session, UnifiedMessage::text(MessageRole::User, "mine"), "alice");
        let id = session.pending_outbound[0].id.clone();
        assert!(update(&mut session, &id, "alice", "edited".into()));
        assert_eq!(session.pending_outbound[0].text_content(), "edited");
    }

    #[test]
    fn cancel_by_author_removes_entry() {
        let mut session = session();
        enqueue(&mut session, UnifiedMessage::text(MessageRole::User, "mine"), "alice");
        let id = session.pending_outbound[0].id.clone();
        assert!(cancel(&mut session, &id, "alice"));
        assert!(session.pending_outbound.is_empty());
    }

    #[test]
    fn cancel_unknown_id_returns_false() {
        let mut session = session();
        assert!(!cancel(&mut session, "nonexistent", "alice"));
    }
}
