//! The Session Runtime: orchestrates lifecycle transitions, backend
//! adapters, consumer fan-out, the outbound queue, the permission plane,
//! the slash-command chain, and the reconnect/idle policies on top of the
//! session data model in `ab_sessions`.

pub mod broadcaster;
pub mod cancel;
pub mod event_bus;
pub mod permission;
pub mod policies;
pub mod process_log;
pub mod queue;
pub mod runtime;
pub mod slash;

pub use broadcaster::ConsumerBroadcaster;
pub use cancel::{CancelMap, CancelToken};
pub use event_bus::DomainEventBus;
pub use policies::{IdlePolicy, IdleSnapshot, PolicyCommand, ReconnectPolicy, ReconnectSnapshot};
pub use process_log::ProcessLogRing;
pub use runtime::{InboundCommand, SessionRuntime};
