//! Session id → one-shot inverted-socket delivery.
//!
//! The CLI-embedded backend dials back into the daemon rather than the
//! other way around, so the launcher can't just hold a connection object
//! once it spawns the child — it registers interest in the session id here
//! and awaits delivery. The CLI-facing WebSocket handler is the only
//! publisher: once it accepts a connection whose declared session id
//! matches a pending registration, it hands the line channels over and the
//! waiter resolves.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::oneshot;

use ab_domain::error::{Error, Result};

/// Line-oriented channel pair handed over once a CLI dials back in. Kept
/// free of axum's WebSocket types so this module stays trivially testable.
pub struct DeliveredSocket {
    pub outbound: mpsc::Sender<String>,
    pub inbound: mpsc::Receiver<String>,
}

pub struct SocketRegistry {
    waiters: Mutex<HashMap<String, oneshot::Sender<DeliveredSocket>>>,
    timeout: Duration,
}

impl SocketRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            waiters: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    pub fn default_timeout() -> Duration {
        Duration::from_secs(30)
    }

    /// Register interest in `session_id`'s inverted socket. Fails if a
    /// registration for the same id is already pending (testable property
    /// 10: register twice without an intervening deliver/cancel is
    /// rejected).
    pub fn register(&self, session_id: &str) -> Result<SocketWaiter> {
        let (tx, rx) = oneshot::channel();
        let mut waiters = self.waiters.lock();
        if waiters.contains_key(session_id) {
            return Err(Error::Session(format!(
                "socket already registered for session {session_id}"
            )));
        }
        waiters.insert(session_id.to_string(), tx);
        Ok(SocketWaiter {
            rx,
            timeout: self.timeout,
        })
    }

    /// Hand off a just-accepted socket to whoever registered for
    /// `session_id`. Returns `false` for an unknown or already-delivered
    /// session id.
    pub fn deliver_socket(&self, session_id: &str, socket: DeliveredSocket) -> bool {
        let Some(tx) = self.waiters.lock().remove(session_id) else {
            return false;
        };
        tx.send(socket).is_ok()
    }

    /// Abandon a pending registration, e.g. because the launcher gave up on
    /// the child before it dialed back. A no-op if nothing is registered.
    pub fn cancel(&self, session_id: &str) {
        self.waiters.lock().remove(session_id);
    }
}

pub struct SocketWaiter {
    rx: oneshot::Receiver<DeliveredSocket>,
    timeout: Duration,
}

impl SocketWaiter {
    pub async fn wait(self) -> Result<DeliveredSocket> {
        match tokio::time::timeout(self.timeout, self.rx).await {
            Ok(Ok(socket)) => Ok(socket),
            Ok(Err(_)) => Err(Error::Session("socket registration cancelled".into())),
            Err(_) => Err(Error::Timeout(format!(
                "socket delivery timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn socket() -> DeliveredSocket {
        let (tx, _rx) = mpsc::channel(1);
        let (_tx2, rx2) = mpsc::channel(1);
        DeliveredSocket {
            outbound: tx,
            inbound: rx2,
        }
    }

    #[test]
    fn registering_twice_without_delivery_fails() {
        let registry = SocketRegistry::new(Duration::from_secs(30));
        let _waiter = registry.register("s1").unwrap();
        assert!(registry.register("s1").is_err());
    }

    #[test]
    fn deliver_to_unknown_session_returns_false() {
        let registry = SocketRegistry::new(Duration::from_secs(30));
        assert!(!registry.deliver_socket("ghost", socket()));
    }

    #[tokio::test]
    async fn delivered_socket_resolves_the_waiter() {
        let registry = SocketRegistry::new(Duration::from_secs(30));
        let waiter = registry.register("s1").unwrap();
        assert!(registry.deliver_socket("s1", socket()));
        assert!(waiter.wait().await.is_ok());
    }

    #[tokio::test]
    async fn register_again_after_delivery_succeeds() {
        let registry = SocketRegistry::new(Duration::from_secs(30));
        let waiter = registry.register("s1").unwrap();
        registry.deliver_socket("s1", socket());
        waiter.wait().await.unwrap();
        assert!(registry.register("s1").is_ok());
    }

    #[tokio::test]
    async fn register_again_after_cancel_succeeds() {
        let registry = SocketRegistry::new(Duration::from_secs(30));
        let _waiter = registry.register("s1").unwrap();
        registry.cancel("s1");
        assert!(registry.register("s1").is_ok());
    }

    /// S5: a registration that never receives a dial-back rejects once the
    /// timeout elapses, with a message matching `/timed out/`.
    #[tokio::test]
    async fn wait_times_out_when_never_delivered() {
        let registry = SocketRegistry::new(Duration::from_millis(100));
        let waiter = registry.register("s1").unwrap();
        let err = waiter.wait().await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
