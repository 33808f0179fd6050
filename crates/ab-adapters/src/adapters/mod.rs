pub mod acp;
pub mod claude_agent_sdk;
pub mod claude_sdk_url;
pub mod gemini;
pub mod opencode;

pub use acp::AcpAdapter;
pub use claude_agent_sdk::ClaudeAgentSdkAdapter;
pub use claude_sdk_url::ClaudeSdkUrlAdapter;
pub use gemini::GeminiAdapter;
pub use opencode::OpencodeAdapter;
