pub mod adapter;
pub mod adapters;
pub mod jsonrpc;
pub mod registry;
pub mod transport;

pub use adapter::BackendAdapter;
pub use transport::{BackendTransport, ChannelTransport, StdioTransport};
