//! Per-session process log ring: a bounded, redacted audit trail of every
//! line the runtime ingests from a backend, kept independent of the chat
//! `history` ring so operators can inspect raw backend traffic (including
//! noise that never became a consumer-visible message) without it counting
//! against the conversation's own capacity. Same keyed-map-over-a-session-id
//! shape as [`crate::cancel::CancelMap`].

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use ab_domain::redact::redact;

/// Tracks a capped line buffer per session id. Every line is redacted
/// before it's stored, so a snapshot is always safe to hand to an operator
/// or log sink.
pub struct ProcessLogRing {
    capacity: usize,
    logs: Mutex<HashMap<String, VecDeque<String>>>,
}

impl ProcessLogRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            logs: Mutex::new(HashMap::new()),
        }
    }

    /// Redact and append `line` to `session_id`'s ring, evicting the oldest
    /// entry once the ring is at capacity.
    pub fn record(&self, session_id: &str, line: &str) {
        let redacted = redact(line);
        let mut logs = self.logs.lock();
        let ring = logs.entry(session_id.to_string()).or_default();
        if ring.len() >= self.capacity {
            ring.pop_front();
        }
        ring.push_back(redacted);
    }

    /// A copy of the current ring contents, oldest first. Empty for an
    /// unknown session id rather than `None` — "no log yet" and "never
    /// logged anything" look the same to a caller.
    pub fn snapshot(&self, session_id: &str) -> Vec<String> {
        self.logs
            .lock()
            .get(session_id)
            .map(|ring| ring.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn remove(&self, session_id: &str) {
        self.logs.lock().remove(session_id);
    }
}
