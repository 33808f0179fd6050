//! The Session Runtime: the single owner of session state transitions,
//! inbound command handling, backend message ingestion, and consumer
//! attach/detach. Every mutation to a `Session` funnels through here so the
//! invariants in `ab_domain::message` (append-only history, non-decreasing
//! message order, exactly one terminal transition to `closed`) hold without
//! needing a lock held across the whole conversation.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use ab_adapters::BackendAdapter;
use ab_domain::error::{Error, Result};
use ab_domain::events::DomainEvent;
use ab_domain::message::{
    is_allowed_transition, ContentBlock, MessageKind, MessageRole, PermissionDecision, SessionState, UnifiedMessage,
};
use ab_sessions::{Session, SessionRepository};

use crate::broadcaster::ConsumerBroadcaster;
use crate::cancel::CancelMap;
use crate::event_bus::DomainEventBus;
use crate::permission;
use crate::policies::PolicyCommand;
use crate::process_log::ProcessLogRing;
use crate::queue;

/// A command arriving from a consumer socket, already decoded off the wire.
pub enum InboundCommand {
    Send { author_id: String, message: UnifiedMessage },
    UpdateQueued { author_id: String, message_id: String, text: String },
    CancelQueued { author_id: String, message_id: String },
    Interrupt,
    ResolvePermission { request_id: String, decision: PermissionDecision },
    Close,
}

pub struct SessionRuntime {
    repo: Arc<SessionRepository>,
    adapters: Mutex<HashMap<String, Arc<dyn BackendAdapter>>>,
    broadcasters: Mutex<HashMap<String, ConsumerBroadcaster>>,
    cancel_map: CancelMap,
    event_bus: Arc<DomainEventBus>,
    process_log: ProcessLogRing,
}

impl SessionRuntime {
    pub fn new(repo: Arc<SessionRepository>, event_bus: Arc<DomainEventBus>) -> Self {
        Self::with_process_log_capacity(repo, event_bus, 500)
    }

    pub fn with_process_log_capacity(repo: Arc<SessionRepository>, event_bus: Arc<DomainEventBus>, process_log_capacity: usize) -> Self {
        Self {
            repo,
            adapters: Mutex::new(HashMap::new()),
            broadcasters: Mutex::new(HashMap::new()),
            cancel_map: CancelMap::new(),
            event_bus,
            process_log: ProcessLogRing::new(process_log_capacity),
        }
    }

    /// A snapshot of the redacted process log ring for `session_id`, oldest
    /// line first. Empty for a session with no recorded backend traffic.
    pub fn process_log_snapshot(&self, session_id: &str) -> Vec<String> {
        self.process_log.snapshot(session_id)
    }

    /// Register the adapter instance a launched/connected backend is
    /// speaking through. Called once the backend socket (or subprocess) is
    /// established, transitioning the session out of `starting`.
    pub async fn attach_adapter(&self, session_id: &str, adapter: Arc<dyn BackendAdapter>) -> Result<()> {
        self.adapters.lock().await.insert(session_id.to_string(), adapter.clone());
        self.cancel_map.register(session_id);
        self.transition(session_id, SessionState::AwaitingBackend)?;
        self.event_bus.publish(DomainEvent::BackendConnected {
            session_id: session_id.to_string(),
            adapter: format!("{:?}", adapter.kind()),
        });
        Ok(())
    }

    /// Attach a consumer socket: replay `session_init` plus the bounded
    /// history tail, then register the channel for live delivery.
    pub async fn attach_consumer(&self, session_id: &str, consumer_id: String, sender: mpsc::Sender<UnifiedMessage>) -> Result<()> {
        let info = self
            .repo
            .get_info(session_id)
            .ok_or_else(|| Error::Session(format!("unknown session {session_id}")))?;

        let init = session_init_message(session_id, &info.state);
        let _ = sender.send(init).await;
        for msg in &info.message_history {
            let _ = sender.send(msg.clone()).await;
        }

        self.repo.with_session(session_id, |s| {
            s.consumers.insert(consumer_id.clone());
        });
        self.broadcasters
            .lock()
            .await
            .entry(session_id.to_string())
            .or_default()
            .attach(consumer_id.clone(), sender);

        self.event_bus.publish(DomainEvent::ConsumerAttached {
            session_id: session_id.to_string(),
            consumer_id,
        });
        Ok(())
    }

    pub async fn detach_consumer(&self, session_id: &str, consumer_id: &str) {
        self.repo.with_session(session_id, |s| {
            s.consumers.remove(consumer_id);
        });
        if let Some(b) = self.broadcasters.lock().await.get_mut(session_id) {
            b.detach(consumer_id);
        }
        self.event_bus.publish(DomainEvent::ConsumerDisconnected {
            session_id: session_id.to_string(),
            consumer_id: consumer_id.to_string(),
        });
    }

    /// Handle a decoded inbound command. Everything a consumer can ask for
    /// passes through here so ordering against concurrent backend messages
    /// is serialized by the single repository write lock each branch takes.
    pub async fn ingest_inbound(&self, session_id: &str, cmd: InboundCommand) -> Result<()> {
        match cmd {
            InboundCommand::Send { author_id, message } => self.handle_send(session_id, author_id, message).await,
            InboundCommand::UpdateQueued { author_id, message_id, text } => {
                let updated = self
                    .repo
                    .with_session(session_id, |s| queue::update(s, &message_id, &author_id, text))
                    .ok_or_else(|| Error::Session(format!("unknown session {session_id}")))?;
                if !updated {
                    return Err(Error::Other("message not queued or not owned by author".into()));
                }
                Ok(())
            }
            InboundCommand::CancelQueued { author_id, message_id } => {
                let cancelled = self
                    .repo
                    .with_session(session_id, |s| queue::cancel(s, &message_id, &author_id))
                    .ok_or_else(|| Error::Session(format!("unknown session {session_id}")))?;
                if !cancelled {
                    return Err(Error::Other("message not queued or not owned by author".into()));
                }
                Ok(())
            }
            InboundCommand::Interrupt => {
                self.cancel_map.cancel(session_id);
                if let Some(adapter) = self.adapters.lock().await.get(session_id).cloned() {
                    adapter.interrupt().await?;
                }
                Ok(())
            }
            InboundCommand::ResolvePermission { request_id, decision } => {
                self.resolve_permission(session_id, &request_id, decision).await
            }
            InboundCommand::Close => self.close(session_id).await,
        }
    }

    async fn handle_send(&self, session_id: &str, author_id: String, message: UnifiedMessage) -> Result<()> {
        let state = self
            .repo
            .get_info(session_id)
            .map(|i| i.state)
            .ok_or_else(|| Error::Session(format!("unknown session {session_id}")))?;

        match state {
            SessionState::Closing | SessionState::Closed => {
                Err(Error::Other(format!("session {session_id} is {} and no longer accepts sends", state.as_str())))
            }
            SessionState::Active => {
                if let Some(adapter) = self.adapters.lock().await.get(session_id).cloned() {
                    adapter.send(&message).await?;
                }
                self.repo.with_session(session_id, |s| {
                    s.history.push(message);
                    s.touch();
                });
                self.repo.persist_by_id(session_id);
                Ok(())
            }
            _ => {
                self.repo
                    .with_session(session_id, |s| queue::enqueue(s, message, &author_id))
                    .ok_or_else(|| Error::Session(format!("unknown session {session_id}")))?;
                self.repo.persist_by_id(session_id);
                Ok(())
            }
        }
    }

    /// Ingest a message the backend produced, fanning it to attached
    /// consumers and appending it to history. A `result`-kind status
    /// message implies the backend is idle again, so the next queued
    /// outbound message (if any) is released.
    pub async fn receive_from_backend(&self, session_id: &str, msg: UnifiedMessage) -> Result<()> {
        let blocked = self
            .repo
            .get_info(session_id)
            .map(|i| matches!(i.state, SessionState::Closing | SessionState::Closed))
            .unwrap_or(true);
        if blocked {
            return Err(Error::Other(format!("session {session_id} is not accepting backend messages")));
        }

        if msg.kind == MessageKind::PermissionRequest {
            let (tool_name, input) = permission_fields(&msg);
            let request_id = msg.metadata.get("request_id").and_then(|v| v.as_str()).map(str::to_owned);
            let entry = self
                .repo
                .with_session(session_id, |s| permission::register(s, request_id, tool_name, input))
                .ok_or_else(|| Error::Session(format!("unknown session {session_id}")))?;
            self.event_bus.publish(DomainEvent::PermissionRequested {
                session_id: session_id.to_string(),
                request_id: entry.id,
            });
        }

        if let Ok(line) = serde_json::to_string(&msg) {
            self.process_log.record(session_id, &line);
        }

        self.repo.with_session(session_id, |s| {
            s.history.push(msg.clone());
            s.touch();
        });

        if let Some(b) = self.broadcasters.lock().await.get_mut(session_id) {
            b.broadcast(&msg).await;
        }

        let is_result = msg.kind == MessageKind::Status && msg.metadata.get("status").and_then(|v| v.as_str()) == Some("result");
        if is_result {
            if matches!(
                self.repo.get_info(session_id).map(|i| i.state),
                Some(SessionState::AwaitingBackend)
            ) {
                self.transition(session_id, SessionState::Active)?;
            }
            let queued = self.repo.with_session(session_id, queue::dequeue_on_result).flatten();
            if let Some(next) = queued {
                if let Some(adapter) = self.adapters.lock().await.get(session_id).cloned() {
                    adapter.send(&next).await?;
                }
            }
        }

        self.repo.persist_by_id(session_id);
        Ok(())
    }

    async fn resolve_permission(&self, session_id: &str, request_id: &str, decision: PermissionDecision) -> Result<()> {
        let resolved = self
            .repo
            .with_session(session_id, |s| permission::resolve(s, request_id))
            .ok_or_else(|| Error::Session(format!("unknown session {session_id}")))?;
        let Some(_entry) = resolved else {
            tracing::debug!(session_id, request_id, "permission decision for unknown request id dropped");
            return Ok(());
        };
        if let Some(adapter) = self.adapters.lock().await.get(session_id).cloned() {
            adapter.handle_permission_decision(request_id, decision).await?;
        }
        self.event_bus.publish(DomainEvent::PermissionResolved {
            session_id: session_id.to_string(),
            request_id: request_id.to_string(),
            decision: format!("{decision:?}"),
        });
        self.repo.persist_by_id(session_id);
        Ok(())
    }

    /// Apply an effect a policy decided on. A `Reconnect` is discarded if
    /// the session already left `starting` — a later-arriving socket always
    /// supersedes an already-queued relaunch.
    pub async fn apply_policy_command(&self, cmd: PolicyCommand) -> Result<()> {
        match cmd {
            PolicyCommand::Reconnect { session_id } => {
                let still_starting = matches!(
                    self.repo.get_info(&session_id).map(|i| i.state),
                    Some(SessionState::Starting)
                );
                if !still_starting {
                    return Ok(());
                }
                self.event_bus.publish(DomainEvent::WatchdogTick);
                Ok(())
            }
            PolicyCommand::IdleReap { session_id } => self.close(&session_id).await,
        }
    }

    /// Idempotent close: flushes pending outbound, purges permissions, tears
    /// down the backend adapter, and transitions to `closed` exactly once.
    pub async fn close(&self, session_id: &str) -> Result<()> {
        let already_closed = matches!(
            self.repo.get_info(session_id).map(|i| i.state),
            Some(SessionState::Closed) | None
        );
        if already_closed {
            return Ok(());
        }

        let current = self.repo.get_info(session_id).map(|i| i.state);
        if current != Some(SessionState::Closing) {
            self.transition(session_id, SessionState::Closing)?;
        }

        self.cancel_map.cancel(session_id);
        if let Some(adapter) = self.adapters.lock().await.remove(session_id) {
            adapter.shutdown().await;
        }
        self.repo.with_session(session_id, permission::purge_all);
        self.broadcasters.lock().await.remove(session_id);
        self.cancel_map.remove(session_id);
        self.process_log.remove(session_id);

        self.transition(session_id, SessionState::Closed)?;
        self.repo.persist_by_id(session_id);
        Ok(())
    }

    fn transition(&self, session_id: &str, to: SessionState) -> Result<()> {
        let from = self
            .repo
            .with_session(session_id, |s| {
                if !is_allowed_transition(s.state, to) {
                    return Err(Error::InvalidLifecycleTransition {
                        from: s.state.as_str().into(),
                        to: to.as_str().into(),
                    });
                }
                let from = s.state;
                s.state = to;
                s.touch();
                Ok(from)
            })
            .ok_or_else(|| Error::Session(format!("unknown session {session_id}")))??;
        self.event_bus.publish(DomainEvent::SessionStateChanged {
            session_id: session_id.to_string(),
            from: from.as_str().into(),
            to: to.as_str().into(),
        });
        Ok(())
    }
}

fn session_init_message(session_id: &str, state: &SessionState) -> UnifiedMessage {
    let mut msg = UnifiedMessage::new(MessageKind::Status, MessageRole::System, vec![ContentBlock::Text {
        text: format!("session {session_id} state={}", state.as_str()),
    }]);
    msg.metadata.insert("status".into(), serde_json::json!("session_init"));
    msg.metadata.insert("session_id".into(), serde_json::json!(session_id));
    msg.metadata.insert("state".into(), serde_json::json!(state.as_str()));
    msg
}

fn permission_fields(msg: &UnifiedMessage) -> (String, serde_json::Value) {
    let tool_name = msg
        .metadata
        .get("tool_name")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();
    let input = msg.metadata.get("input").cloned().unwrap_or(serde_json::Value::Null);
    (tool_name, input)
}
