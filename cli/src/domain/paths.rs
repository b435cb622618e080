//! Operator-side file locations.
//!
//! Every path is derived from a single root so tests can relocate the whole
//! layout into a temp directory.

use std::path::{Path, PathBuf};

/// File layout under the fleet root (`~/.fleet` in production).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetPaths {
    root: PathBuf,
    operator_known_hosts: PathBuf,
}

impl FleetPaths {
    #[must_use]
    pub fn new(root: PathBuf, operator_known_hosts: PathBuf) -> Self {
        Self {
            root,
            operator_known_hosts,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.yaml")
    }

    /// Shared fleet private key.
    #[must_use]
    pub fn private_key(&self) -> PathBuf {
        self.root.join("id_ed25519")
    }

    #[must_use]
    pub fn public_key(&self) -> PathBuf {
        self.root.join("id_ed25519.pub")
    }

    /// Build context for the node image; regenerated every run.
    #[must_use]
    pub fn build_dir(&self) -> PathBuf {
        self.root.join("build")
    }

    #[must_use]
    pub fn image_descriptor(&self) -> PathBuf {
        self.build_dir().join("Dockerfile")
    }

    /// Rendered per-node trust files before they are copied into nodes.
    #[must_use]
    pub fn harvest_dir(&self) -> PathBuf {
        self.root.join("harvest")
    }

    #[must_use]
    pub fn operator_known_hosts(&self) -> &Path {
        &self.operator_known_hosts
    }

    /// Verbatim copy of the operator trust store taken before the first
    /// mutation.
    #[must_use]
    pub fn known_hosts_backup(&self) -> PathBuf {
        self.root.join("known_hosts.backup")
    }
}
