/// Shared error type used across all agentbroker crates.
///
/// One variant per propagation-relevant kind in the error taxonomy; an
/// `Other` escape hatch absorbs anything that doesn't need its own variant
/// yet. Adapter-facing variants (`ProviderAuth`, `RateLimit`,
/// `ContextOverflow`, `ApiError`) let the runtime classify a backend
/// failure without string-matching its message.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("adapter {adapter}: {message}")]
    Adapter { adapter: String, message: String },

    #[error("adapter {adapter}: authentication failed: {message}")]
    ProviderAuth { adapter: String, message: String },

    #[error("adapter {adapter}: rate limited{}", retry_after_ms.map(|ms| format!(", retry after {ms}ms")).unwrap_or_default())]
    RateLimit {
        adapter: String,
        retry_after_ms: Option<u64>,
    },

    #[error("adapter {adapter}: context window exceeded")]
    ContextOverflow { adapter: String },

    #[error("adapter {adapter}: api error (status {status}): {message}")]
    ApiError {
        adapter: String,
        status: u16,
        message: String,
    },

    #[error("session: {0}")]
    Session(String),

    #[error("storage: {0}")]
    Storage(String),

    #[error("process: {0}")]
    Process(String),

    #[error("protocol: {0}")]
    Protocol(String),

    #[error("invalid lifecycle transition: {from} -> {to}")]
    InvalidLifecycleTransition { from: String, to: String },

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether retrying the same operation without backing off further is
    /// reasonable. Mirrors the adapter reconnect policy's retriable check.
    pub fn is_retriable(&self) -> bool {
        match self {
            Error::Timeout(_) | Error::Http(_) | Error::RateLimit { .. } => true,
            Error::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_retriable() {
        assert!(Error::Timeout("slow".into()).is_retriable());
    }

    #[test]
    fn rate_limit_is_retriable() {
        assert!(Error::RateLimit {
            adapter: "claude".into(),
            retry_after_ms: Some(1000)
        }
        .is_retriable());
    }

    #[test]
    fn server_error_status_is_retriable() {
        assert!(Error::ApiError {
            adapter: "gemini".into(),
            status: 503,
            message: "unavailable".into(),
        }
        .is_retriable());
    }

    #[test]
    fn client_error_status_is_not_retriable() {
        assert!(!Error::ApiError {
            adapter: "gemini".into(),
            status: 400,
            message: "bad request".into(),
        }
        .is_retriable());
    }

    #[test]
    fn auth_error_is_not_retriable() {
        assert!(!Error::ProviderAuth {
            adapter: "claude".into(),
            message: "invalid key".into(),
        }
        .is_retriable());
    }

    #[test]
    fn context_overflow_is_not_retriable() {
        assert!(!Error::ContextOverflow {
            adapter: "opencode".into()
        }
        .is_retriable());
    }
}
