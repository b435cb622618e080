//! Trust bootstrap: shared credentials, peer resolution, and host-key pinning.
//!
//! Runs in two joined stages. Per-node configuration (credentials and
//! `/etc/hosts`) and host-key harvest run concurrently across nodes. Only
//! after every harvest has finished is the combined trust map rendered and
//! pushed, so all nodes receive the same map.

use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::{
    Cancellation, CredentialPair, LocalFs, NodeShell, OperatorTrustStore, ProgressReporter,
};
use crate::application::services::{detail, for_each_bounded};
use crate::domain::trust::{HOST_KEY_PATH, validate_pubkey};
use crate::domain::{FleetError, HostIdentity, NodeIdentity, ProvisionPhase, Topology, TrustMap};

pub const NODE_SSH_DIR: &str = "/root/.ssh";
pub const NODE_AUTHORIZED_KEYS: &str = "/root/.ssh/authorized_keys";
pub const NODE_PRIVATE_KEY: &str = "/root/.ssh/id_ed25519";
pub const NODE_PUBLIC_KEY: &str = "/root/.ssh/id_ed25519.pub";
pub const NODE_KNOWN_HOSTS: &str = "/root/.ssh/known_hosts";

/// Result of bootstrapping a set of live nodes.
#[derive(Debug, Default)]
pub struct BootstrapOutcome {
    pub trust_map: TrustMap,
    pub identities: Vec<HostIdentity>,
    /// Nodes whose configuration, harvest, or trust push failed.
    pub failures: Vec<FleetError>,
    /// Operator-side principals that were pinned.
    pub operator_pinned: usize,
}

impl BootstrapOutcome {
    /// `true` when `node` received its configuration and trust map and its
    /// own key is pinned.
    #[must_use]
    pub fn is_trusted(&self, node: &str) -> bool {
        self.trust_map.pinned_nodes().contains(node)
            && !self.failures.iter().any(|f| failed_node(f) == Some(node))
    }
}

fn failed_node(err: &FleetError) -> Option<&str> {
    match err {
        FleetError::TrustBootstrapFailed { node, .. } => Some(node),
        _ => None,
    }
}

fn bootstrap_failed(node: &NodeIdentity, err: &anyhow::Error) -> FleetError {
    FleetError::TrustBootstrapFailed {
        node: node.name.clone(),
        reason: format!("{err:#}"),
    }
}

/// Stage 1 for one node: credentials and peer resolution.
///
/// `authorized_keys` is overwritten so only the current fleet key is trusted.
///
/// # Errors
///
/// Returns an error naming the step that failed.
pub async fn configure_node(
    rt: &impl NodeShell,
    node: &NodeIdentity,
    topology: &Topology,
    creds: &CredentialPair,
) -> Result<()> {
    validate_pubkey(creds.public_key.trim())?;

    let prepare = format!("mkdir -p {NODE_SSH_DIR} && chmod 700 {NODE_SSH_DIR}");
    run_checked(rt, &node.name, &["sh", "-c", &prepare], "preparing ssh directory").await?;

    copy_checked(rt, &node.name, &creds.public_key_path, NODE_AUTHORIZED_KEYS).await?;
    copy_checked(rt, &node.name, &creds.private_key, NODE_PRIVATE_KEY).await?;
    copy_checked(rt, &node.name, &creds.public_key_path, NODE_PUBLIC_KEY).await?;

    let perms = format!(
        "chown root:root {NODE_AUTHORIZED_KEYS} {NODE_PRIVATE_KEY} {NODE_PUBLIC_KEY} && \
         chmod 600 {NODE_AUTHORIZED_KEYS} {NODE_PRIVATE_KEY} && \
         chmod 644 {NODE_PUBLIC_KEY}"
    );
    run_checked(rt, &node.name, &["sh", "-c", &perms], "setting key permissions").await?;

    if let Some(script) = peer_hosts_script(node, topology) {
        run_checked(rt, &node.name, &["sh", "-c", &script], "writing peer records").await?;
    }
    Ok(())
}

/// Shell script appending one `address name` record per peer to `/etc/hosts`.
///
/// Records already present are left alone, so re-running never duplicates
/// them. Returns `None` for a single-node fleet.
#[must_use]
pub fn peer_hosts_script(node: &NodeIdentity, topology: &Topology) -> Option<String> {
    let lines: Vec<String> = topology
        .peers_of(node)
        .map(|peer| {
            let record = format!("{} {}", peer.address, peer.name);
            format!("grep -qxF '{record}' /etc/hosts || printf '%s\\n' '{record}' >> /etc/hosts")
        })
        .collect();
    if lines.is_empty() {
        return None;
    }
    Some(format!("set -e\n{}\n", lines.join("\n")))
}

/// Read `node`'s host public key.
///
/// # Errors
///
/// Returns `FleetError::TrustBootstrapFailed` if the key file is missing or
/// is not an ed25519 public key.
pub async fn harvest(rt: &impl NodeShell, node: &NodeIdentity) -> Result<HostIdentity, FleetError> {
    let result = async {
        let output = rt
            .exec(&node.name, &["cat", HOST_KEY_PATH])
            .await
            .context("reading host key")?;
        anyhow::ensure!(
            output.status.success(),
            "host key not available: {}",
            detail(&output)
        );
        HostIdentity::from_harvest(node, &String::from_utf8_lossy(&output.stdout))
    }
    .await;
    result.map_err(|e| bootstrap_failed(node, &e))
}

/// Install the rendered trust map as `node`'s `known_hosts`, replacing it.
///
/// # Errors
///
/// Returns an error if the staging file cannot be written or copied.
pub async fn push_trust_map(
    rt: &impl NodeShell,
    fs: &impl LocalFs,
    node: &NodeIdentity,
    rendered: &str,
    staging_dir: &Path,
) -> Result<()> {
    fs.create_dir_all(staging_dir)?;
    let staged = staging_dir.join(format!("known_hosts.{}", node.name));
    fs.write(&staged, rendered)?;
    copy_checked(rt, &node.name, &staged, NODE_KNOWN_HOSTS).await?;
    let perms = format!("chown root:root {NODE_KNOWN_HOSTS} && chmod 644 {NODE_KNOWN_HOSTS}");
    run_checked(rt, &node.name, &["sh", "-c", &perms], "setting known_hosts permissions").await
}

/// Pin each identity's `[localhost]:port` principal in the operator's store.
///
/// Failures only cost operator convenience, so they are warned about and
/// skipped. Returns the number of principals pinned.
pub fn pin_operator(
    store: &impl OperatorTrustStore,
    identities: &[HostIdentity],
    reporter: &impl ProgressReporter,
) -> usize {
    match store.backup() {
        Ok(true) => tracing::info!("operator known_hosts backed up"),
        Ok(false) => {}
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "operator known_hosts backup failed");
            reporter.warn(&format!("could not back up known_hosts: {e:#}"));
        }
    }

    let mut pinned = 0;
    for id in identities {
        let principal = id.operator_principal();
        match store.pin(&principal, &id.host_key) {
            Ok(()) => pinned += 1,
            Err(e) => {
                tracing::warn!(%principal, error = %format!("{e:#}"), "operator pin failed");
                reporter.warn(&format!("could not pin {principal} in known_hosts: {e:#}"));
            }
        }
    }
    pinned
}

/// Bootstrap trust across `topology`, which must contain only live, ready nodes.
#[allow(clippy::too_many_arguments)]
pub async fn bootstrap(
    rt: &impl NodeShell,
    fs: &impl LocalFs,
    store: &impl OperatorTrustStore,
    topology: &Topology,
    creds: &CredentialPair,
    staging_dir: &Path,
    limit: usize,
    cancel: &Cancellation,
    reporter: &impl ProgressReporter,
) -> BootstrapOutcome {
    let mut outcome = BootstrapOutcome::default();
    let cancelled = || FleetError::Cancelled {
        phase: ProvisionPhase::TrustBootstrapped.label().to_string(),
    };

    // Stage 1: configure and harvest, one task per node.
    let staged = for_each_bounded(topology.nodes(), limit, |node| async move {
        if cancel.is_cancelled() {
            return (node, Err(cancelled()));
        }
        if let Err(e) = configure_node(rt, node, topology, creds).await {
            return (node, Err(bootstrap_failed(node, &e)));
        }
        (node, Ok(harvest(rt, node).await))
    })
    .await;

    let mut configured = Vec::new();
    for (node, result) in staged {
        match result {
            Ok(harvested) => {
                // Configured nodes receive the map even when their own key is unpinned.
                configured.push(node);
                match harvested {
                    Ok(id) => outcome.identities.push(id),
                    Err(e) => {
                        tracing::warn!(node = %node.name, error = %e, "host key harvest failed");
                        reporter.warn(&e.to_string());
                        outcome.failures.push(e);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(node = %node.name, error = %e, "node configuration failed");
                reporter.warn(&e.to_string());
                outcome.failures.push(e);
            }
        }
    }

    // Stage 2: every harvest has joined; build and push one map.
    outcome.trust_map = TrustMap::from_identities(&outcome.identities);
    if cancel.is_cancelled() {
        outcome.failures.push(cancelled());
        return outcome;
    }
    let rendered = outcome.trust_map.render_known_hosts();
    let pushed = for_each_bounded(configured, limit, |node| {
        let rendered = &rendered;
        async move {
            let result = push_trust_map(rt, fs, node, rendered, staging_dir).await;
            (node, result)
        }
    })
    .await;
    for (node, result) in pushed {
        if let Err(e) = result {
            tracing::warn!(node = %node.name, error = %format!("{e:#}"), "trust map push failed");
            outcome.failures.push(bootstrap_failed(node, &e));
        }
    }

    outcome.operator_pinned = pin_operator(store, &outcome.identities, reporter);
    tracing::info!(
        bindings = outcome.trust_map.len(),
        operator_pinned = outcome.operator_pinned,
        "trust map installed"
    );
    outcome
}

async fn run_checked(rt: &impl NodeShell, node: &str, args: &[&str], what: &str) -> Result<()> {
    let output = rt
        .exec(node, args)
        .await
        .with_context(|| format!("{what} on {node}"))?;
    anyhow::ensure!(
        output.status.success(),
        "{what} on {node} failed: {}",
        detail(&output)
    );
    Ok(())
}

async fn copy_checked(rt: &impl NodeShell, node: &str, local: &Path, remote: &str) -> Result<()> {
    let output = rt
        .copy_into(node, local, remote)
        .await
        .with_context(|| format!("copying {} to {node}:{remote}", local.display()))?;
    anyhow::ensure!(
        output.status.success(),
        "copying to {node}:{remote} failed: {}",
        detail(&output)
    );
    Ok(())
}
