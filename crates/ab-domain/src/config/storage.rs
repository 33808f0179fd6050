use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Storage
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Directory holding persisted session state when `backend = "file"`.
    #[serde(default = "d_state_dir")]
    pub state_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            state_dir: d_state_dir(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    File,
}

fn d_state_dir() -> String {
    "./state".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backend_is_memory() {
        assert_eq!(StorageConfig::default().backend, StorageBackend::Memory);
    }

    #[test]
    fn deserialize_file_backend() {
        let cfg: StorageConfig = toml::from_str("backend = \"file\"\nstate_dir = \"/var/lib/agentbroker\"").unwrap();
        assert_eq!(cfg.backend, StorageBackend::File);
        assert_eq!(cfg.state_dir, "/var/lib/agentbroker");
    }
}
