//! Run outcomes: what the orchestrator, teardown engine, and verifier report.
//!
//! Reports are plain data. Presentation lives in `crate::output`.

use std::path::PathBuf;

use serde::Serialize;

use crate::domain::error::FleetError;
use crate::domain::topology::NodeIdentity;

/// Orchestrator state. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionPhase {
    Idle,
    ImagePrepared,
    NetworkReady,
    NodesLive,
    TrustBootstrapped,
    Reported,
}

impl ProvisionPhase {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ImagePrepared => "image preparation",
            Self::NetworkReady => "network setup",
            Self::NodesLive => "node creation",
            Self::TrustBootstrapped => "trust bootstrap",
            Self::Reported => "reporting",
        }
    }
}

/// A failure as it appears in reports and JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub code: &'static str,
    pub message: String,
}

impl From<&FleetError> for FailureRecord {
    fn from(err: &FleetError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl Serialize for FleetError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        FailureRecord::from(self).serialize(serializer)
    }
}

// ── Provisioning ──────────────────────────────────────────────────────────────

/// Final state of one node after a provisioning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Live, reachable, and pinned in the trust map.
    Trusted,
    /// Live and reachable but its host key could not be pinned.
    Untrusted,
    /// Created but never answered on SSH.
    NotReady,
    /// Creation failed; the node does not exist.
    CreateFailed,
    /// Never attempted because the run was cancelled.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeReport {
    #[serde(flatten)]
    pub identity: NodeIdentity,
    pub status: NodeStatus,
    pub host_key_fingerprint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    pub phase: ProvisionPhase,
    pub network: String,
    pub subnet: String,
    pub private_key: PathBuf,
    pub nodes: Vec<NodeReport>,
    pub failures: Vec<FleetError>,
}

impl ProvisionReport {
    /// `true` when every requested guarantee was met.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn live_nodes(&self) -> impl Iterator<Item = &NodeReport> {
        self.nodes
            .iter()
            .filter(|n| matches!(n.status, NodeStatus::Trusted | NodeStatus::Untrusted))
    }

    /// Example commands for reaching the fleet.
    #[must_use]
    pub fn connection_commands(&self) -> Vec<String> {
        let key = self.private_key.display();
        let live: Vec<&NodeReport> = self.live_nodes().collect();
        let mut cmds: Vec<String> = live
            .iter()
            .map(|n| format!("ssh -i {key} -p {} root@localhost", n.identity.port))
            .collect();
        if let [first, second, ..] = live.as_slice() {
            cmds.push(format!(
                "docker exec -it {} ssh {}",
                first.identity.name, second.identity.name
            ));
        }
        cmds
    }

    #[must_use]
    pub fn failure_records(&self) -> Vec<FailureRecord> {
        self.failures.iter().map(FailureRecord::from).collect()
    }
}

// ── Teardown ──────────────────────────────────────────────────────────────────

/// What happened to the operator's trust store during teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TrustRestore {
    /// The pre-run backup was restored verbatim.
    Restored,
    /// No backup existed; cluster entries were stripped in place.
    Stripped { removed: usize },
    /// Nothing to do: no trust store and no backup.
    Untouched,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    pub removed: Vec<String>,
    pub trust_store: Option<TrustRestore>,
    pub failures: Vec<FleetError>,
}

impl TeardownReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    #[must_use]
    pub fn failure_records(&self) -> Vec<FailureRecord> {
        self.failures.iter().map(FailureRecord::from).collect()
    }
}

// ── Verify ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectivityCheck {
    pub from: String,
    pub to: String,
    pub ok: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub checks: Vec<ConnectivityCheck>,
}

impl VerifyReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.checks.is_empty() && self.checks.iter().all(|c| c.ok)
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.checks.iter().filter(|c| !c.ok).count()
    }
}
