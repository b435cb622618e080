//! Infrastructure implementation of the `CredentialStore` port.
//!
//! The fleet keypair is generated once with `ssh-keygen` and reused until
//! teardown deletes it. Private key material stays on disk; only paths and
//! the public key line are handed to services.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::application::ports::{CommandRunner, CredentialPair, CredentialStore};
use crate::domain::trust::validate_pubkey;
use crate::infra::known_hosts::set_permissions;

/// `ssh-keygen` backed credential store.
pub struct SshKeygen<R: CommandRunner> {
    runner: R,
    private_key: PathBuf,
    public_key: PathBuf,
    comment: String,
}

impl<R: CommandRunner> SshKeygen<R> {
    pub fn new(runner: R, private_key: PathBuf, public_key: PathBuf, comment: &str) -> Self {
        Self {
            runner,
            private_key,
            public_key,
            comment: comment.to_string(),
        }
    }

    fn load(&self) -> Result<CredentialPair> {
        let line = std::fs::read_to_string(&self.public_key)
            .with_context(|| format!("reading {}", self.public_key.display()))?;
        let line = line.trim().to_string();
        validate_pubkey(&line)
            .with_context(|| format!("validating {}", self.public_key.display()))?;
        Ok(CredentialPair {
            private_key: self.private_key.clone(),
            public_key_path: self.public_key.clone(),
            public_key: line,
        })
    }

    async fn generate(&self) -> Result<()> {
        if let Some(parent) = self.private_key.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
            set_permissions(parent, 0o700)?;
        }
        // A half-present pair is unusable; ssh-keygen also refuses to overwrite.
        for path in [&self.private_key, &self.public_key] {
            if path.exists() {
                std::fs::remove_file(path)
                    .with_context(|| format!("removing stale {}", path.display()))?;
            }
        }
        let private = self.private_key.to_string_lossy();
        let output = self
            .runner
            .run(
                "ssh-keygen",
                &["-t", "ed25519", "-N", "", "-C", &self.comment, "-f", &private, "-q"],
            )
            .await
            .context("ssh-keygen")?;
        anyhow::ensure!(
            output.status.success(),
            "ssh-keygen failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
        set_permissions(&self.private_key, 0o600)?;
        tracing::info!(path = %self.private_key.display(), "generated fleet keypair");
        Ok(())
    }
}

impl<R: CommandRunner> CredentialStore for SshKeygen<R> {
    async fn ensure_pair(&self) -> Result<CredentialPair> {
        if !(self.private_key.exists() && self.public_key.exists()) {
            self.generate().await?;
        }
        self.load()
    }

    async fn remove_pair(&self) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        for path in [&self.private_key, &self.public_key] {
            if path.exists() {
                std::fs::remove_file(path)
                    .with_context(|| format!("removing {}", path.display()))?;
                removed.push(path.clone());
            }
        }
        Ok(removed)
    }
}
