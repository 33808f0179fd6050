//! Session data model, bounded history, and durable storage for agentbroker.
//!
//! Owns the `Session`/`SessionInfo` types, the repository that the Session
//! Runtime drives, and migration of persisted snapshots. The lifecycle
//! state machine itself lives in `ab_domain::message` — this crate only
//! stores and persists the state it's told to hold.

pub mod migrate;
pub mod model;
pub mod repository;
pub mod ring;
pub mod storage;

pub use migrate::migrate_session;
pub use model::{Session, SessionInfo};
pub use repository::SessionRepository;
pub use ring::RingBuffer;
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
