//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

// ── Fleet errors ──────────────────────────────────────────────────────────────

/// Errors raised while provisioning, bootstrapping, or tearing down a fleet.
///
/// Whole-run variants (`InvalidSpec`, `RuntimeUnavailable`, `ImageBuildFailed`,
/// `NetworkSetupFailed`, `CredentialSetupFailed`) short-circuit a run. Per-node
/// and per-step variants are collected into reports instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FleetError {
    #[error("Invalid fleet size '{input}': {reason}")]
    InvalidSpec { input: String, reason: String },

    #[error("Container runtime not available: {0}\n\nIs docker installed and running?")]
    RuntimeUnavailable(String),

    #[error("Failed to build node image: {0}")]
    ImageBuildFailed(String),

    #[error("Failed to set up fleet network: {0}")]
    NetworkSetupFailed(String),

    #[error("Failed to prepare fleet credentials: {0}")]
    CredentialSetupFailed(String),

    #[error("Failed to create node comp{index}: {reason}")]
    NodeCreateFailed { index: u32, reason: String },

    #[error("Node comp{index} did not become reachable over SSH within {timeout_secs}s")]
    NodeNotReady { index: u32, timeout_secs: u64 },

    #[error("Trust bootstrap failed for {node}: {reason}")]
    TrustBootstrapFailed { node: String, reason: String },

    #[error("Teardown of {resource} failed: {reason}")]
    TeardownStepFailed { resource: String, reason: String },

    #[error("Cancelled during {phase}; live nodes were left running")]
    Cancelled { phase: String },
}

impl FleetError {
    /// Stable machine-readable code used in JSON output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidSpec { .. } => "INVALID_SPEC",
            Self::RuntimeUnavailable(_) => "RUNTIME_UNAVAILABLE",
            Self::ImageBuildFailed(_) => "IMAGE_BUILD_FAILED",
            Self::NetworkSetupFailed(_) => "NETWORK_SETUP_FAILED",
            Self::CredentialSetupFailed(_) => "CREDENTIAL_SETUP_FAILED",
            Self::NodeCreateFailed { .. } => "NODE_CREATE_FAILED",
            Self::NodeNotReady { .. } => "NODE_NOT_READY",
            Self::TrustBootstrapFailed { .. } => "TRUST_BOOTSTRAP_FAILED",
            Self::TeardownStepFailed { .. } => "TEARDOWN_STEP_FAILED",
            Self::Cancelled { .. } => "CANCELLED",
        }
    }

    /// Returns `true` for failures that end the run before any node work.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidSpec { .. }
                | Self::RuntimeUnavailable(_)
                | Self::ImageBuildFailed(_)
                | Self::NetworkSetupFailed(_)
                | Self::CredentialSetupFailed(_)
        )
    }

    pub(crate) fn invalid_spec(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSpec {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn teardown(resource: impl Into<String>, reason: impl ToString) -> Self {
        Self::TeardownStepFailed {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid network prefix '{0}': expected two octets such as 172.28")]
    InvalidPrefix(String),

    #[error("Invalid value for {key}: {value}\n\n{hint}")]
    InvalidValue {
        key: String,
        value: String,
        hint: String,
    },
}
