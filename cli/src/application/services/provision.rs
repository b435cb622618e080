//! Fleet orchestrator: image → network → nodes → trust → report.
//!
//! Phases only move forward. Whole-run failures return `Err` before any node
//! work; per-node failures are collected into the report. Nothing is rolled
//! back: recovery is re-running.

use std::collections::BTreeMap;

use crate::application::ports::{
    Cancellation, ContainerRuntime, CredentialStore, LocalFs, OperatorTrustStore,
    ProgressReporter, ReadinessProbe, RuntimeInspector,
};
use crate::application::services::node_lifecycle::{
    discover_nodes, ensure_nodes, remove_nodes, wait_all_ready,
};
use crate::application::services::trust_bootstrap::bootstrap;
use crate::application::services::{FleetEnv, detail, is_absent};
use crate::domain::image::node_dockerfile;
use crate::domain::{
    FleetError, FleetSpec, NodeIdentity, NodeReport, NodeStatus, ProvisionPhase, ProvisionReport,
    Topology,
};

/// Oldest Docker server release with the network and `cp` behaviour relied on.
const MIN_RUNTIME_VERSION: (u64, u64) = (20, 10);

/// Provision a fleet of `spec.size()` nodes.
///
/// # Errors
///
/// Returns a whole-run `FleetError` (`RuntimeUnavailable`,
/// `ImageBuildFailed`, `NetworkSetupFailed`, `CredentialSetupFailed`, or
/// `Cancelled` before any node exists). Once nodes exist, failures are
/// reported in the returned `ProvisionReport` instead.
#[allow(clippy::too_many_lines)]
pub async fn provision<R: ContainerRuntime, F: LocalFs>(
    env: &FleetEnv<'_, R, F>,
    credentials: &impl CredentialStore,
    trust_store: &impl OperatorTrustStore,
    probe: &impl ReadinessProbe,
    spec: FleetSpec,
    reporter: &impl ProgressReporter,
    cancel: &Cancellation,
) -> Result<ProvisionReport, FleetError> {
    let topology = Topology::new(env.plan, spec);
    tracing::info!(size = spec.size(), network = env.plan.name(), "provisioning fleet");

    // Idle → ImagePrepared
    check_cancel(cancel, ProvisionPhase::ImagePrepared)?;
    reporter.step("checking container runtime...");
    let version = check_runtime(env.runtime).await?;
    reporter.step(&format!("building node image {}...", env.config.image.tag));
    prepare_image(env).await?;
    reporter.success(&format!("image {} ready (docker {version})", env.config.image.tag));
    tracing::info!(phase = ProvisionPhase::ImagePrepared.label(), "phase complete");

    // ImagePrepared → NetworkReady
    check_cancel(cancel, ProvisionPhase::NetworkReady)?;
    reporter.step(&format!("recreating network {}...", env.plan.name()));
    prepare_network(env).await?;
    reporter.success(&format!("network {} ({}) ready", env.plan.name(), env.plan.subnet()));
    tracing::info!(phase = ProvisionPhase::NetworkReady.label(), "phase complete");

    // NetworkReady → NodesLive
    check_cancel(cancel, ProvisionPhase::NodesLive)?;
    let creds = credentials
        .ensure_pair()
        .await
        .map_err(|e| FleetError::CredentialSetupFailed(format!("{e:#}")))?;
    reporter.step(&format!("starting {} nodes...", topology.len()));
    let created = ensure_nodes(
        env.runtime,
        &topology,
        env.plan,
        &env.config.image.tag,
        env.limit(),
        cancel,
    )
    .await;

    let mut statuses: BTreeMap<u32, NodeStatus> = BTreeMap::new();
    let mut failures = Vec::new();
    let mut live = Vec::new();
    for (node, result) in created {
        match result {
            Ok(()) => live.push(node),
            Err(FleetError::Cancelled { .. }) => {
                statuses.insert(node.index, NodeStatus::Skipped);
            }
            Err(e) => {
                reporter.warn(&e.to_string());
                statuses.insert(node.index, NodeStatus::CreateFailed);
                failures.push(e);
            }
        }
    }

    let mut report = ProvisionReport {
        phase: ProvisionPhase::NetworkReady,
        network: env.plan.name().to_string(),
        subnet: env.plan.subnet(),
        private_key: creds.private_key.clone(),
        nodes: Vec::new(),
        failures,
    };

    if cancel.is_cancelled() {
        for node in &live {
            statuses.insert(node.index, NodeStatus::Untrusted);
        }
        return Ok(finish_cancelled(report, &topology, &statuses, ProvisionPhase::NodesLive));
    }

    reporter.step(&format!("waiting for SSH on {} nodes...", live.len()));
    let (ready, not_ready) = wait_all_ready(
        probe,
        &live,
        env.config.ready_timeout(),
        env.config.poll_interval(),
    )
    .await;
    for err in not_ready {
        if let FleetError::NodeNotReady { index, .. } = &err {
            statuses.insert(*index, NodeStatus::NotReady);
        }
        reporter.warn(&err.to_string());
        report.failures.push(err);
    }
    report.phase = ProvisionPhase::NodesLive;
    tracing::info!(
        phase = ProvisionPhase::NodesLive.label(),
        live = ready.len(),
        requested = topology.len(),
        "phase complete"
    );

    // NodesLive → TrustBootstrapped
    if cancel.is_cancelled() {
        for node in &ready {
            statuses.insert(node.index, NodeStatus::Untrusted);
        }
        return Ok(finish_cancelled(
            report,
            &topology,
            &statuses,
            ProvisionPhase::TrustBootstrapped,
        ));
    }
    reporter.step(&format!("bootstrapping SSH trust across {} nodes...", ready.len()));
    let ready = Topology::from_nodes(ready);
    let outcome = bootstrap(
        env.runtime,
        env.fs,
        trust_store,
        &ready,
        &creds,
        &env.paths.harvest_dir(),
        env.limit(),
        cancel,
        reporter,
    )
    .await;

    let fingerprints: BTreeMap<&str, Option<String>> = outcome
        .identities
        .iter()
        .map(|id| (id.node.as_str(), id.fingerprint()))
        .collect();
    for node in ready.nodes() {
        let status = if outcome.is_trusted(&node.name) {
            NodeStatus::Trusted
        } else {
            NodeStatus::Untrusted
        };
        statuses.insert(node.index, status);
    }
    let bootstrap_cancelled = outcome
        .failures
        .iter()
        .any(|f| matches!(f, FleetError::Cancelled { .. }));
    report.failures.extend(outcome.failures);
    report.phase = if bootstrap_cancelled {
        ProvisionPhase::NodesLive
    } else {
        ProvisionPhase::TrustBootstrapped
    };
    tracing::info!(
        phase = ProvisionPhase::TrustBootstrapped.label(),
        bindings = outcome.trust_map.len(),
        "phase complete"
    );

    // TrustBootstrapped → Reported
    report.nodes = node_rows(&topology, &statuses, |node| {
        fingerprints.get(node.name.as_str()).cloned().flatten()
    });
    if !bootstrap_cancelled {
        report.phase = ProvisionPhase::Reported;
    }
    let trusted = report
        .nodes
        .iter()
        .filter(|n| n.status == NodeStatus::Trusted)
        .count();
    if report.is_success() {
        reporter.success(&format!("{trusted} nodes provisioned and trusted"));
    } else {
        reporter.warn(&format!(
            "{trusted} of {} nodes trusted, {} failures",
            topology.len(),
            report.failures.len()
        ));
    }
    Ok(report)
}

fn check_cancel(cancel: &Cancellation, next: ProvisionPhase) -> Result<(), FleetError> {
    if cancel.is_cancelled() {
        tracing::warn!(phase = next.label(), "cancelled");
        return Err(FleetError::Cancelled {
            phase: next.label().to_string(),
        });
    }
    Ok(())
}

fn finish_cancelled(
    mut report: ProvisionReport,
    topology: &Topology,
    statuses: &BTreeMap<u32, NodeStatus>,
    during: ProvisionPhase,
) -> ProvisionReport {
    tracing::warn!(phase = during.label(), "cancelled; live nodes left running");
    report.failures.push(FleetError::Cancelled {
        phase: during.label().to_string(),
    });
    report.nodes = node_rows(topology, statuses, |_| None);
    report
}

fn node_rows(
    topology: &Topology,
    statuses: &BTreeMap<u32, NodeStatus>,
    fingerprint: impl Fn(&NodeIdentity) -> Option<String>,
) -> Vec<NodeReport> {
    topology
        .nodes()
        .iter()
        .map(|node| NodeReport {
            identity: node.clone(),
            status: statuses
                .get(&node.index)
                .copied()
                .unwrap_or(NodeStatus::Skipped),
            host_key_fingerprint: fingerprint(node),
        })
        .collect()
}

/// Confirm the runtime answers and is recent enough. Returns its version.
///
/// # Errors
///
/// Returns `FleetError::RuntimeUnavailable` if the runtime cannot be reached
/// or reports a server version older than 20.10.
pub async fn check_runtime(rt: &impl RuntimeInspector) -> Result<String, FleetError> {
    let output = rt
        .version()
        .await
        .map_err(|e| FleetError::RuntimeUnavailable(format!("{e:#}")))?;
    if !output.status.success() {
        return Err(FleetError::RuntimeUnavailable(detail(&output)));
    }
    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let minimum = semver::Version::new(MIN_RUNTIME_VERSION.0, MIN_RUNTIME_VERSION.1, 0);
    match runtime_version(&version) {
        Some(v) if v < minimum => {
            return Err(FleetError::RuntimeUnavailable(format!(
                "docker {version} is too old; {}.{} or newer is required",
                minimum.major, minimum.minor
            )));
        }
        Some(_) => {}
        None => tracing::warn!(%version, "unrecognised docker version; assuming it is recent enough"),
    }
    Ok(version)
}

/// Parse a Docker server version.
///
/// Docker zero-pads the minor component (`19.03.12`), which strict semver
/// rejects, so the numeric core is read component by component. Anything
/// after the core (`-rc.1`, `+dirty`) is ignored.
fn runtime_version(raw: &str) -> Option<semver::Version> {
    let core = raw.trim().split(['-', '+', ' ']).next()?;
    let mut parts = core.split('.').map(str::parse::<u64>);
    let major = parts.next()?.ok()?;
    let minor = parts.next()?.ok()?;
    let patch = match parts.next() {
        Some(patch) => patch.ok()?,
        None => 0,
    };
    Some(semver::Version::new(major, minor, patch))
}

/// Regenerate the image descriptor and build the node image.
///
/// # Errors
///
/// Returns `FleetError::ImageBuildFailed` on any failure.
pub async fn prepare_image<R: ContainerRuntime, F: LocalFs>(
    env: &FleetEnv<'_, R, F>,
) -> Result<(), FleetError> {
    let failed = |e: anyhow::Error| FleetError::ImageBuildFailed(format!("{e:#}"));
    let descriptor = node_dockerfile(&env.config.image.base).map_err(failed)?;
    let build_dir = env.paths.build_dir();
    env.fs.create_dir_all(&build_dir).map_err(failed)?;
    env.fs
        .write(&env.paths.image_descriptor(), &descriptor)
        .map_err(failed)?;

    let output = env
        .runtime
        .build_image(&env.config.image.tag, &build_dir)
        .await
        .map_err(failed)?;
    if !output.status.success() {
        return Err(FleetError::ImageBuildFailed(detail(&output)));
    }
    Ok(())
}

/// Destructively recreate the fleet network.
///
/// Nodes from any earlier run are removed first: the runtime refuses to
/// remove a network with attached containers.
///
/// # Errors
///
/// Returns `FleetError::NetworkSetupFailed` if the network cannot be removed
/// or created.
pub async fn prepare_network<R: ContainerRuntime, F: LocalFs>(
    env: &FleetEnv<'_, R, F>,
) -> Result<(), FleetError> {
    let rt = env.runtime;
    let failed = |e: anyhow::Error| FleetError::NetworkSetupFailed(format!("{e:#}"));

    let previous = discover_nodes(rt).await.map_err(failed)?;
    if !previous.is_empty() {
        tracing::info!(count = previous.len(), "removing nodes from previous run");
    }
    for (name, result) in remove_nodes(rt, &previous, env.limit()).await {
        if let Err(reason) = result {
            tracing::warn!(node = %name, %reason, "could not remove previous node");
        }
    }

    let name = env.plan.name();
    let removed = rt.remove_network(name).await.map_err(failed)?;
    if !removed.status.success() && !is_absent(&removed) {
        return Err(FleetError::NetworkSetupFailed(detail(&removed)));
    }
    let created = rt
        .create_network(name, &env.plan.subnet(), &env.plan.gateway().to_string())
        .await
        .map_err(failed)?;
    if !created.status.success() {
        return Err(FleetError::NetworkSetupFailed(detail(&created)));
    }
    Ok(())
}
