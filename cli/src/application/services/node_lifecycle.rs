//! Node lifecycle: create or replace nodes, wait for SSH, discover and remove.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{Cancellation, NodeLifecycle, NodeSpec, ReadinessProbe};
use crate::application::services::{detail, for_each_bounded, is_absent};
use crate::domain::topology::{NODE_NAME_PREFIX, parse_node_name};
use crate::domain::{FleetError, NetworkPlan, NodeIdentity, ProvisionPhase, Topology};

/// Create `node`, replacing any node left under the same name.
///
/// # Errors
///
/// Returns `FleetError::NodeCreateFailed` if the runtime refuses to run the
/// node (image missing, port already bound, address in use).
pub async fn ensure_node(
    rt: &impl NodeLifecycle,
    node: &NodeIdentity,
    plan: &NetworkPlan,
    image: &str,
) -> Result<(), FleetError> {
    if let Err(reason) = remove_node_if_present(rt, &node.name).await {
        tracing::warn!(node = %node.name, %reason, "could not clear previous node");
    }

    let address = node.address.to_string();
    let spec = NodeSpec {
        name: &node.name,
        index: node.index,
        image,
        network: plan.name(),
        address: &address,
        host_port: node.port,
    };
    let create_failed = |reason: String| FleetError::NodeCreateFailed {
        index: node.index,
        reason,
    };
    let output = rt
        .run_node(&spec)
        .await
        .map_err(|e| create_failed(format!("{e:#}")))?;
    if !output.status.success() {
        return Err(create_failed(detail(&output)));
    }
    tracing::info!(node = %node.name, address = %node.address, port = node.port, "node created");
    Ok(())
}

/// Stop and remove `name`. A node that does not exist is not an error.
///
/// # Errors
///
/// Returns the runtime's reason when the node exists but cannot be removed.
pub async fn remove_node_if_present(rt: &impl NodeLifecycle, name: &str) -> Result<(), String> {
    // Stop failures are irrelevant: removal below is forced.
    let _ = rt.stop_node(name).await;
    let output = rt.remove_node(name).await.map_err(|e| format!("{e:#}"))?;
    if output.status.success() || is_absent(&output) {
        Ok(())
    } else {
        Err(detail(&output))
    }
}

/// Create every node in `topology` through a bounded pool.
///
/// Results are in index order. Nodes not yet started when `cancel` fires are
/// reported as `Cancelled`; nodes already created are left running.
pub async fn ensure_nodes(
    rt: &impl NodeLifecycle,
    topology: &Topology,
    plan: &NetworkPlan,
    image: &str,
    limit: usize,
    cancel: &Cancellation,
) -> Vec<(NodeIdentity, Result<(), FleetError>)> {
    for_each_bounded(topology.nodes(), limit, |node| async move {
        if cancel.is_cancelled() {
            let phase = ProvisionPhase::NodesLive.label().to_string();
            return (node.clone(), Err(FleetError::Cancelled { phase }));
        }
        let result = ensure_node(rt, node, plan, image).await;
        if let Err(e) = &result {
            tracing::error!(node = %node.name, index = node.index, error = %e, "node creation failed");
        }
        (node.clone(), result)
    })
    .await
}

/// Poll `node`'s SSH port until it answers or `deadline` passes.
///
/// # Errors
///
/// Returns `FleetError::NodeNotReady` when the deadline passes first.
pub async fn wait_ready(
    probe: &impl ReadinessProbe,
    node: &NodeIdentity,
    deadline: tokio::time::Instant,
    timeout: Duration,
    interval: Duration,
) -> Result<(), FleetError> {
    loop {
        if probe.ssh_ready(node.port).await {
            tracing::debug!(node = %node.name, "ssh ready");
            return Ok(());
        }
        let now = tokio::time::Instant::now();
        if now >= deadline {
            tracing::warn!(node = %node.name, timeout_secs = timeout.as_secs(), "node not ready");
            return Err(FleetError::NodeNotReady {
                index: node.index,
                timeout_secs: timeout.as_secs(),
            });
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

/// Wait for all `nodes` against one shared deadline.
///
/// Returns the ready nodes and one `NodeNotReady` per node that never answered.
pub async fn wait_all_ready(
    probe: &impl ReadinessProbe,
    nodes: &[NodeIdentity],
    timeout: Duration,
    interval: Duration,
) -> (Vec<NodeIdentity>, Vec<FleetError>) {
    let deadline = tokio::time::Instant::now() + timeout;
    // Probes only hold a socket each, so every node is polled at once.
    let results = for_each_bounded(nodes, nodes.len(), |node| async move {
        (node, wait_ready(probe, node, deadline, timeout, interval).await)
    })
    .await;

    let mut ready = Vec::new();
    let mut failures = Vec::new();
    for (node, result) in results {
        match result {
            Ok(()) => ready.push(node.clone()),
            Err(e) => failures.push(e),
        }
    }
    (ready, failures)
}

/// Names of existing nodes that follow the `comp{i}` convention, in index order.
///
/// # Errors
///
/// Returns an error if the runtime cannot list nodes.
pub async fn discover_nodes(rt: &impl NodeLifecycle) -> Result<Vec<String>> {
    let output = rt
        .list_nodes(NODE_NAME_PREFIX)
        .await
        .context("listing fleet nodes")?;
    anyhow::ensure!(
        output.status.success(),
        "listing fleet nodes failed: {}",
        detail(&output)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut found: Vec<(u32, String)> = stdout
        .lines()
        .map(str::trim)
        .filter_map(|name| parse_node_name(name).map(|i| (i, name.to_string())))
        .collect();
    found.sort();
    found.dedup();
    Ok(found.into_iter().map(|(_, name)| name).collect())
}

/// Remove every named node through a bounded pool.
pub async fn remove_nodes(
    rt: &impl NodeLifecycle,
    names: &[String],
    limit: usize,
) -> Vec<(String, Result<(), String>)> {
    for_each_bounded(names, limit, |name| async move {
        (name.clone(), remove_node_if_present(rt, name).await)
    })
    .await
}
