use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Observability
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Logging configuration. `RUST_LOG` always wins when set; `filter` is the
/// fallback passed to `EnvFilter::try_new` at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "d_filter")]
    pub filter: String,
    #[serde(default = "d_true")]
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            filter: d_filter(),
            json: d_true(),
        }
    }
}

fn d_filter() -> String {
    "info,ab_runtime=debug".into()
}
fn d_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_enables_runtime_debug() {
        let cfg = ObservabilityConfig::default();
        assert_eq!(cfg.filter, "info,ab_runtime=debug");
    }

    #[test]
    fn default_json_is_true() {
        assert!(ObservabilityConfig::default().json);
    }

    #[test]
    fn deserialize_empty_uses_defaults() {
        let cfg: ObservabilityConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.filter, "info,ab_runtime=debug");
        assert!(cfg.json);
    }
}
