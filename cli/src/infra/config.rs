//! Configuration loading: YAML file to `FleetConfig`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::FleetConfig;
use crate::domain::config::ConfigSource;

/// YAML-file backed configuration.
pub struct YamlConfigStore {
    path: PathBuf,
    explicit: bool,
}

impl YamlConfigStore {
    /// `explicit` marks a path the operator named; it must then exist.
    #[must_use]
    pub fn new(path: PathBuf, explicit: bool) -> Self {
        Self { path, explicit }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration, falling back to defaults for an absent
    /// default-location file.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file is missing or any file cannot be
    /// read or parsed.
    pub fn load(&self) -> Result<(FleetConfig, ConfigSource)> {
        if !self.path.exists() {
            anyhow::ensure!(
                !self.explicit,
                "config file {} does not exist",
                self.path.display()
            );
            return Ok((FleetConfig::default(), ConfigSource::Defaults));
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("cannot read {}", self.path.display()))?;
        let config: FleetConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("cannot parse {}", self.path.display()))?;
        Ok((config, ConfigSource::File(self.path.clone())))
    }
}
