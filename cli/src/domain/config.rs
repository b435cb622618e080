//! Domain types and validators for fleet configuration.
//!
//! Pure functions only — no I/O, no async, no filesystem access.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;
use crate::domain::topology::NetworkPlan;

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.fleet/config.yaml`.
///
/// Every field has a default, so a missing file or a partial file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct FleetConfig {
    pub network: NetworkConfig,
    pub image: ImageConfig,
    pub ssh: SshConfig,
    /// Maximum number of per-node operations in flight.
    pub concurrency: Concurrency,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Runtime network name.
    pub name: String,
    /// First two octets of the `/16` subnet.
    pub prefix: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: "fleet-net".to_string(),
            prefix: "172.28".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ImageConfig {
    /// Tag the node image is built under.
    pub tag: String,
    /// Base image the node image is built from.
    pub base: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            tag: "fleet-node:latest".to_string(),
            base: "ubuntu:24.04".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SshConfig {
    /// Comment embedded in the generated fleet keypair.
    pub key_comment: String,
    /// Operator trust store. Defaults to `~/.ssh/known_hosts`.
    pub known_hosts: Option<PathBuf>,
    /// How long to wait for every node's SSH service after creation.
    pub ready_timeout_secs: u64,
    /// Delay between readiness probes of one node.
    pub poll_interval_ms: u64,
    /// Timeout for each runtime command issued against a node.
    pub command_timeout_secs: u64,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            key_comment: "fleet".to_string(),
            known_hosts: None,
            ready_timeout_secs: 90,
            poll_interval_ms: 1000,
            command_timeout_secs: 30,
        }
    }
}

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

/// Newtype so serde can default the worker limit independently.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Concurrency(pub usize);

impl Default for Concurrency {
    fn default() -> Self {
        Self(8)
    }
}

impl FleetConfig {
    /// Validate every field and derive the network plan.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for an invalid prefix, an empty name, or a zero
    /// timeout/concurrency.
    pub fn validate(&self) -> Result<NetworkPlan, ConfigError> {
        non_empty("network.name", &self.network.name)?;
        non_empty("image.tag", &self.image.tag)?;
        non_empty("image.base", &self.image.base)?;
        non_zero("concurrency", u64::try_from(self.concurrency.0).unwrap_or(u64::MAX))?;
        non_zero("ssh.ready_timeout_secs", self.ssh.ready_timeout_secs)?;
        non_zero("ssh.poll_interval_ms", self.ssh.poll_interval_ms)?;
        non_zero("ssh.command_timeout_secs", self.ssh.command_timeout_secs)?;
        NetworkPlan::new(&self.network.name, &self.network.prefix)
    }

    #[must_use]
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ssh.ready_timeout_secs)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.ssh.poll_interval_ms)
    }

    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.ssh.command_timeout_secs)
    }
}

fn non_empty(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: format!("{value:?}"),
            hint: "Value must not be empty.".to_string(),
        });
    }
    Ok(())
}

fn non_zero(key: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: "0".to_string(),
            hint: "Value must be greater than zero.".to_string(),
        });
    }
    Ok(())
}

// ── Unit tests ───────────────────────────────────────────────────────────────
