use async_trait::async_trait;

use ab_domain::capability::{AdapterCapabilities, AdapterKind};
use ab_domain::error::{Error, Result};
use ab_domain::message::UnifiedMessage;

/// The contract every backend adapter implements. The runtime only ever
/// talks to backends through this trait, never through a backend's native
/// protocol directly — that's the whole point of the unified message
/// schema.
///
/// `interrupt`/`reconfigure`/`handle_permission_decision`/`reconnect` carry
/// default "unsupported" implementations; [`BackendAdapter::capabilities`]
/// tells the runtime which ones are real before it calls them, so the
/// slash-command chain and permission plane can fall back cleanly instead
/// of calling into a no-op.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    fn kind(&self) -> AdapterKind;

    fn capabilities(&self) -> AdapterCapabilities;

    /// Translate and send a unified message to the backend.
    async fn send(&self, msg: &UnifiedMessage) -> Result<()>;

    /// Block until the backend produces a message, translating it to the
    /// unified schema. Returns `Ok(None)` when the backend has closed its
    /// side cleanly.
    async fn recv(&self) -> Result<Option<UnifiedMessage>>;

    /// Ask the backend to stop its current turn. Only meaningful when
    /// `capabilities().interruptible`.
    async fn interrupt(&self) -> Result<()> {
        Err(Error::Other(format!(
            "{:?} adapter is not interruptible",
            self.kind()
        )))
    }

    /// Push a runtime-level configuration change (e.g. model override).
    /// Only meaningful when `capabilities().configurable`.
    async fn reconfigure(&self, _options: serde_json::Value) -> Result<()> {
        Err(Error::Other(format!(
            "{:?} adapter is not configurable",
            self.kind()
        )))
    }

    /// Deliver a human's decision on a pending permission request. Only
    /// meaningful when `capabilities().permission_handler`.
    async fn handle_permission_decision(
        &self,
        _request_id: &str,
        _decision: ab_domain::message::PermissionDecision,
    ) -> Result<()> {
        Err(Error::Other(format!(
            "{:?} adapter does not handle permissions",
            self.kind()
        )))
    }

    /// Attempt to re-establish a dropped connection in place. Only
    /// meaningful when `capabilities().reconnectable`.
    async fn reconnect(&self) -> Result<()> {
        Err(Error::Other(format!(
            "{:?} adapter is not reconnectable",
            self.kind()
        )))
    }

    async fn shutdown(&self);
}
