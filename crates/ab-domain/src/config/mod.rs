mod adapters;
mod launcher;
mod observability;
mod server;
mod sessions;
mod storage;

pub use adapters::*;
pub use launcher::*;
pub use observability::*;
pub use server::*;
pub use sessions::*;
pub use storage::*;

use std::fmt;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub adapters: AdaptersConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub launcher: LauncherConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues. An empty
    /// vec means everything looks good; callers should still check
    /// severity before deciding whether to abort startup.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be greater than 0".into(),
            });
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.host".into(),
                message: "host must not be empty".into(),
            });
        }
        if self.server.cors.allowed_origins.len() == 1 && self.server.cors.allowed_origins[0] == "*"
        {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "server.cors.allowed_origins".into(),
                message: "wildcard \"*\" allows all origins (not recommended for production)"
                    .into(),
            });
        }
        if let Some(rl) = &self.server.rate_limit {
            if rl.requests_per_second == 0 {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: "server.rate_limit.requests_per_second".into(),
                    message: "requests_per_second must be greater than 0".into(),
                });
            }
            if rl.burst_size == 0 {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: "server.rate_limit.burst_size".into(),
                    message: "burst_size must be greater than 0".into(),
                });
            }
        }

        if self.sessions.history_capacity == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "sessions.history_capacity".into(),
                message: "history_capacity must be greater than 0".into(),
            });
        }

        if self.launcher.max_sessions == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "launcher.max_sessions".into(),
                message: "max_sessions must be greater than 0".into(),
            });
        }

        if self.storage.backend == StorageBackend::File && self.storage.state_dir.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "storage.state_dir".into(),
                message: "state_dir must not be empty when backend = \"file\"".into(),
            });
        }

        if let Err(e) = tracing_subscriber::EnvFilter::try_new(&self.observability.filter) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "observability.filter".into(),
                message: format!("invalid filter: {e}"),
            });
        }

        errors
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn find_issue<'a>(issues: &'a [ConfigError], field_prefix: &str) -> Option<&'a ConfigError> {
        issues.iter().find(|e| e.field.starts_with(field_prefix))
    }

    #[test]
    fn default_config_passes() {
        let issues = Config::default().validate();
        let errors: Vec<_> = issues
            .iter()
            .filter(|e| e.severity == ConfigSeverity::Error)
            .collect();
        assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    }

    #[test]
    fn port_zero_is_error() {
        let mut cfg = Config::default();
        cfg.server.port = 0;
        let issues = cfg.validate();
        assert_eq!(
            find_issue(&issues, "server.port").unwrap().severity,
            ConfigSeverity::Error
        );
    }

    #[test]
    fn cors_wildcard_is_warning() {
        let mut cfg = Config::default();
        cfg.server.cors.allowed_origins = vec!["*".into()];
        let issues = cfg.validate();
        assert_eq!(
            find_issue(&issues, "server.cors").unwrap().severity,
            ConfigSeverity::Warning
        );
    }

    #[test]
    fn zero_history_capacity_is_error() {
        let mut cfg = Config::default();
        cfg.sessions.history_capacity = 0;
        let issues = cfg.validate();
        assert!(find_issue(&issues, "sessions.history_capacity").is_some());
    }

    #[test]
    fn zero_max_sessions_is_error() {
        let mut cfg = Config::default();
        cfg.launcher.max_sessions = 0;
        let issues = cfg.validate();
        assert!(find_issue(&issues, "launcher.max_sessions").is_some());
    }

    #[test]
    fn file_backend_without_state_dir_is_error() {
        let mut cfg = Config::default();
        cfg.storage.backend = StorageBackend::File;
        cfg.storage.state_dir = String::new();
        let issues = cfg.validate();
        assert!(find_issue(&issues, "storage.state_dir").is_some());
    }

    #[test]
    fn invalid_filter_is_error() {
        let mut cfg = Config::default();
        cfg.observability.filter = "[[[not a filter".into();
        let issues = cfg.validate();
        assert!(find_issue(&issues, "observability.filter").is_some());
    }

    #[test]
    fn config_error_display_format() {
        let err = ConfigError {
            severity: ConfigSeverity::Error,
            field: "server.port".into(),
            message: "port must be greater than 0".into(),
        };
        assert_eq!(
            format!("{err}"),
            "[ERROR] server.port: port must be greater than 0"
        );
    }

    #[test]
    fn toml_roundtrip_from_empty_document() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.server.port, 3210);
        assert_eq!(cfg.sessions.history_capacity, 500);
    }
}
