//! Filesystem infrastructure: the `LocalFs` port and default file locations.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::FleetPaths;

/// Environment override for the fleet root directory.
pub const FLEET_HOME_ENV: &str = "FLEET_HOME";

/// Production filesystem implementation of `LocalFs`.
pub struct LocalFs;

impl crate::application::ports::LocalFs for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("creating directory {}", path.display()))
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        std::fs::remove_dir_all(path)
            .with_context(|| format!("removing directory {}", path.display()))
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        std::fs::remove_file(path).with_context(|| format!("removing file {}", path.display()))
    }

    fn write(&self, path: &Path, content: &str) -> Result<()> {
        std::fs::write(path, content).with_context(|| format!("writing file {}", path.display()))
    }
}

/// Resolve the fleet root: `$FLEET_HOME`, else `~/.fleet`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn fleet_root() -> Result<PathBuf> {
    if let Some(root) = std::env::var_os(FLEET_HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(root));
    }
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.join(".fleet"))
}

/// Default operator trust store: `~/.ssh/known_hosts`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn default_known_hosts() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.join(".ssh").join("known_hosts"))
}

/// Build the file layout, honouring a configured trust store location.
///
/// # Errors
///
/// Returns an error if the home directory is needed but cannot be determined.
pub fn resolve_paths(root: PathBuf, known_hosts: Option<&Path>) -> Result<FleetPaths> {
    let known_hosts = match known_hosts {
        Some(path) => path.to_path_buf(),
        None => default_known_hosts()?,
    };
    Ok(FleetPaths::new(root, known_hosts))
}
