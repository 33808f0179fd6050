//! Process supervisor for the inverted-socket backend. Spawns the child
//! with its session id in the environment, registers the session in
//! `starting`, and waits for the CLI to dial back into the gateway's
//! inverted-socket endpoint before attaching its adapter. Bounds the
//! number of concurrently running children via a semaphore, per
//! `launcher.max_sessions`.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::process::Command;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use ab_domain::capability::AdapterKind;
use ab_domain::error::{Error, Result};
use ab_runtime::SessionRuntime;
use ab_sessions::{Session, SessionRepository};

use crate::socket_registry::SocketRegistry;

pub struct Launcher {
    repo: Arc<SessionRepository>,
    runtime: Arc<SessionRuntime>,
    sockets: Arc<SocketRegistry>,
    command: Vec<String>,
    daemon_port: u16,
    slots: Arc<Semaphore>,
    running: Mutex<HashMap<String, OwnedSemaphorePermit>>,
}

impl Launcher {
    pub fn new(
        repo: Arc<SessionRepository>,
        runtime: Arc<SessionRuntime>,
        sockets: Arc<SocketRegistry>,
        command: Vec<String>,
        daemon_port: u16,
        max_sessions: usize,
    ) -> Self {
        Self {
            repo,
            runtime,
            sockets,
            command,
            daemon_port,
            slots: Arc::new(Semaphore::new(max_sessions)),
            running: Mutex::new(HashMap::new()),
        }
    }

    /// Spawn a new CLI-embedded session, block until its dial-back arrives,
    /// and attach the resulting adapter. The session is left in `starting`
    /// on entry and transitions to `awaiting_backend` once the adapter is
    /// attached.
    pub async fn launch(&self, session_id: &str, cwd: &str, history_capacity: usize) -> Result<()> {
        let permit = self
            .slots
            .clone()
            .try_acquire_owned()
            .map_err(|_| Error::Process("launcher is at max_sessions capacity".into()))?;

        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| Error::Config("launcher.command_templates has no entry for claude_sdk_url".into()))?;

        self.repo.insert(Session::new(
            session_id.to_string(),
            cwd.to_string(),
            AdapterKind::ClaudeSdkUrl,
            history_capacity,
        ));

        let waiter = self.sockets.register(session_id)?;

        let child = Command::new(program)
            .args(args)
            .env("AGENTBROKER_SESSION_ID", session_id)
            .env("AGENTBROKER_DAEMON_PORT", self.daemon_port.to_string())
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        let mut child = match child {
            Ok(child) => child,
            Err(e) => {
                self.sockets.cancel(session_id);
                return Err(Error::Process(format!("failed to spawn {program}: {e}")));
            }
        };

        let pid = child.id();
        self.repo.with_session(session_id, |s| s.pid = pid);
        self.repo.persist_by_id(session_id);

        let session_id_owned = session_id.to_string();
        tokio::spawn(async move {
            let _ = child.wait().await;
        });

        let socket = match waiter.wait().await {
            Ok(socket) => socket,
            Err(e) => {
                self.sockets.cancel(session_id);
                return Err(e);
            }
        };

        let adapter = ab_adapters::registry::from_channel(socket.outbound, socket.inbound);
        self.runtime.attach_adapter(session_id, adapter).await?;
        self.running.lock().insert(session_id_owned, permit);
        Ok(())
    }

    /// Release a held slot once the session is torn down. A no-op if the
    /// session never occupied one (e.g. it failed before launch completed).
    pub fn release(&self, session_id: &str) {
        self.running.lock().remove(session_id);
    }

    pub fn occupied_slots(&self) -> usize {
        self.running.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ab_runtime::DomainEventBus;
    use ab_sessions::storage::MemoryStorage;

    fn launcher(max_sessions: usize) -> Launcher {
        let repo = Arc::new(SessionRepository::new(Arc::new(MemoryStorage::default())));
        let bus = Arc::new(DomainEventBus::default());
        let runtime = Arc::new(SessionRuntime::new(repo.clone(), bus));
        let sockets = Arc::new(SocketRegistry::new(std::time::Duration::from_millis(50)));
        Launcher::new(repo, runtime, sockets, vec!["claude".into(), "--acp".into()], 3210, max_sessions)
    }

    #[tokio::test]
    async fn launch_at_zero_capacity_fails_before_spawning_anything() {
        let l = launcher(0);
        let err = l.launch("s1", "/tmp", 10).await.unwrap_err();
        assert!(err.to_string().contains("max_sessions"));
    }

    #[test]
    fn release_of_unknown_session_is_a_no_op() {
        let l = launcher(1);
        l.release("ghost");
        assert_eq!(l.occupied_slots(), 0);
    }
}
