//! Operator trust store: the operator's `known_hosts`, mutated safely.
//!
//! `KnownHostsStore` serialises every read-modify-write behind one lock and
//! writes through a temp file and rename, so a crash never leaves a
//! half-written store. The first mutation of a run is preceded by a verbatim
//! backup that teardown restores.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};

use crate::application::ports::OperatorTrustStore;
use crate::domain::TrustRestore;
use crate::domain::trust::{HostEntry, replace_principal, strip_principals, validate_host_key};

/// Manages the operator's `known_hosts` file.
pub struct KnownHostsStore {
    path: PathBuf,
    backup: PathBuf,
    lock: Mutex<()>,
}

impl KnownHostsStore {
    /// Creates a store for `path`, backing up to `backup`.
    #[must_use]
    pub fn with_paths(path: PathBuf, backup: PathBuf) -> Self {
        Self {
            path,
            backup,
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, ()> {
        // A poisoned lock only means another writer panicked; the file on
        // disk is still whole because writes are atomic.
        self.lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn read(&self) -> Result<String> {
        if !self.path.exists() {
            return Ok(String::new());
        }
        std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))
    }
}

impl OperatorTrustStore for KnownHostsStore {
    fn backup(&self) -> Result<bool> {
        let _guard = self.guard();
        if self.backup.exists() || !self.path.exists() {
            return Ok(false);
        }
        let content = self.read()?;
        write_atomic(&self.backup, &content)?;
        Ok(true)
    }

    fn pin(&self, principal: &str, host_key: &str) -> Result<()> {
        validate_host_key(host_key)?;
        let _guard = self.guard();
        let content = self.read()?;
        write_atomic(&self.path, &replace_principal(&content, principal, host_key))
    }

    fn restore(&self, is_cluster: &dyn Fn(&HostEntry<'_>) -> bool) -> Result<TrustRestore> {
        let _guard = self.guard();
        if self.backup.exists() {
            let original = std::fs::read_to_string(&self.backup)
                .with_context(|| format!("reading {}", self.backup.display()))?;
            write_atomic(&self.path, &original)?;
            std::fs::remove_file(&self.backup)
                .with_context(|| format!("removing {}", self.backup.display()))?;
            return Ok(TrustRestore::Restored);
        }
        if !self.path.exists() {
            return Ok(TrustRestore::Untouched);
        }
        let content = self.read()?;
        let (stripped, removed) = strip_principals(&content, is_cluster);
        if removed > 0 {
            write_atomic(&self.path, &stripped)?;
        }
        Ok(TrustRestore::Stripped { removed })
    }
}

/// Write `content` to `path` via a sibling temp file and rename.
///
/// The file ends up mode 600; a parent directory created here gets 700.
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
        set_permissions(parent, 0o700)?;
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow::anyhow!("not a file path: {}", path.display()))?;
    let temp_path = path.with_file_name(format!(".{name}.tmp"));
    std::fs::write(&temp_path, content)
        .with_context(|| format!("writing temp file {}", temp_path.display()))?;
    set_permissions(&temp_path, 0o600)?;
    std::fs::rename(&temp_path, path)
        .with_context(|| format!("finalizing {}", path.display()))?;
    Ok(())
}

#[cfg(unix)]
pub(crate) fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .with_context(|| format!("set permissions on {}", path.display()))
}

#[cfg(not(unix))]
pub(crate) fn set_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
