//! Pluggable durability for [`SessionInfo`] snapshots. Durability is
//! expressed as a small repository contract rather than a mandated engine;
//! storage failures are logged and the session continues in memory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use ab_domain::error::{Error, Result};

use crate::migrate::migrate_session;
use crate::model::SessionInfo;

pub trait SessionStorage: Send + Sync {
    fn load_all(&self) -> Result<Vec<SessionInfo>>;
    fn save(&self, info: &SessionInfo) -> Result<()>;
    fn remove(&self, id: &str) -> Result<()>;
}

/// Keeps snapshots only for the process lifetime. Used by default and in
/// tests; nothing survives a restart.
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, SessionInfo>>,
}

impl SessionStorage for MemoryStorage {
    fn load_all(&self) -> Result<Vec<SessionInfo>> {
        Ok(self.entries.read().values().cloned().collect())
    }

    fn save(&self, info: &SessionInfo) -> Result<()> {
        self.entries.write().insert(info.id.clone(), info.clone());
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<()> {
        self.entries.write().remove(id);
        Ok(())
    }
}

/// One JSON file per session under `state_dir`, written atomically (temp
/// file + rename) so a crash mid-write never leaves a torn snapshot.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(state_dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = state_dir.into().join("sessions");
        std::fs::create_dir_all(&dir).map_err(Error::Io)?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

impl SessionStorage for FileStorage {
    fn load_all(&self) -> Result<Vec<SessionInfo>> {
        let mut out = Vec::new();
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(Error::Io(e)),
        };
        for entry in entries {
            let entry = entry.map_err(Error::Io)?;
            if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let raw = std::fs::read_to_string(entry.path()).map_err(Error::Io)?;
            let Ok(value) = serde_json::from_str::<serde_json::Value>(&raw) else {
                tracing::warn!(path = %entry.path().display(), "dropping corrupt session snapshot");
                continue;
            };
            match migrate_session(value) {
                Some(info) => out.push(info),
                None => {
                    tracing::warn!(path = %entry.path().display(), "dropping unmigratable session snapshot");
                }
            }
        }
        Ok(out)
    }

    fn save(&self, info: &SessionInfo) -> Result<()> {
        let json = serde_json::to_string_pretty(info).map_err(Error::Json)?;
        let target = self.path_for(&info.id);
        let tmp = target.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(Error::Io)?;
        std::fs::rename(&tmp, &target).map_err(Error::Io)?;
        set_owner_only_permissions(&target)?;
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<()> {
        let path = self.path_for(id);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

#[cfg(unix)]
fn set_owner_only_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let perms = std::fs::Permissions::from_mode(0o600);
    std::fs::set_permissions(path, perms).map_err(Error::Io)
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ab_domain::capability::AdapterKind;
    use ab_domain::message::SessionState;

    fn sample(id: &str) -> SessionInfo {
        SessionInfo {
            id: id.to_string(),
            adapter: AdapterKind::Acp,
            backend_session_id: None,
            archived: false,
            cwd: "/tmp".into(),
            created_at: chrono::Utc::now(),
            state: SessionState::Active,
            pid: None,
            adapter_options: serde_json::Value::Null,
            message_history: Vec::new(),
            pending_messages: Vec::new(),
            pending_permissions: std::collections::HashMap::new(),
            schema_version: ab_domain::CURRENT_SCHEMA_VERSION,
        }
    }

    #[test]
    fn memory_storage_round_trips() {
        let storage = MemoryStorage::default();
        storage.save(&sample("s1")).unwrap();
        assert_eq!(storage.load_all().unwrap().len(), 1);
        storage.remove("s1").unwrap();
        assert!(storage.load_all().unwrap().is_empty());
    }

    #[test]
    fn file_storage_round_trips_and_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        storage.save(&sample("s1")).unwrap();

        let reloaded = FileStorage::new(dir.path()).unwrap();
        let all = reloaded.load_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "s1");
    }

    #[test]
    fn file_storage_drops_corrupt_snapshot_without_failing_load() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        storage.save(&sample("s1")).unwrap();
        std::fs::write(dir.path().join("sessions/broken.json"), "not json").unwrap();

        let all = storage.load_all().unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn file_storage_remove_on_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        assert!(storage.remove("nonexistent").is_ok());
    }
}
