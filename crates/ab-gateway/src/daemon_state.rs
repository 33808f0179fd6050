//! Atomic read/write of the daemon state file (`{pid, port, heartbeat,
//! version, control_api_token}`), written on `serve` startup and refreshed
//! by a heartbeat task, removed on graceful shutdown. Same temp-file +
//! rename + owner-only-permissions discipline as session snapshots.

use std::path::{Path, PathBuf};

use ab_domain::error::{Error, Result};
use ab_domain::DaemonState;

pub struct DaemonStateFile {
    path: PathBuf,
}

impl DaemonStateFile {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: state_dir.into().join("daemon.json"),
        }
    }

    pub fn write(&self, state: &DaemonState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(Error::Io)?;
        }
        let json = serde_json::to_string_pretty(state).map_err(Error::Json)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(Error::Io)?;
        std::fs::rename(&tmp, &self.path).map_err(Error::Io)?;
        set_owner_only_permissions(&self.path)?;
        Ok(())
    }

    pub fn read(&self) -> Result<Option<DaemonState>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw).map_err(Error::Json)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }

    pub fn remove(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

#[cfg(unix)]
fn set_owner_only_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(Error::Io)
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
