//! Teardown engine: remove everything a provisioning run created.
//!
//! Nodes are discovered by naming convention, so teardown works without
//! knowing the fleet size and is safe when nothing was ever provisioned.
//! Every step is best-effort; failures are collected, never short-circuit.

use std::path::Path;

use crate::application::ports::{
    ContainerRuntime, CredentialStore, LocalFs, OperatorTrustStore, ProgressReporter,
};
use crate::application::services::node_lifecycle::{discover_nodes, remove_nodes};
use crate::application::services::{FleetEnv, detail, is_absent};
use crate::domain::trust::{HostEntry, is_cluster_entry};
use crate::domain::{FleetError, TeardownReport, TrustRestore};

/// Tear down the fleet described by `env`.
pub async fn teardown<R: ContainerRuntime, F: LocalFs>(
    env: &FleetEnv<'_, R, F>,
    credentials: &impl CredentialStore,
    trust_store: &impl OperatorTrustStore,
    reporter: &impl ProgressReporter,
) -> TeardownReport {
    let mut report = TeardownReport {
        removed: Vec::new(),
        trust_store: None,
        failures: Vec::new(),
    };
    let rt = env.runtime;

    reporter.step("removing fleet nodes...");
    match discover_nodes(rt).await {
        Ok(names) => {
            for (name, result) in remove_nodes(rt, &names, env.limit()).await {
                match result {
                    Ok(()) => report.removed.push(format!("node {name}")),
                    Err(reason) => report.failures.push(FleetError::teardown(name, reason)),
                }
            }
        }
        Err(e) => report
            .failures
            .push(FleetError::teardown("nodes", format!("{e:#}"))),
    }

    reporter.step("removing network and image...");
    let network = env.plan.name();
    record_removal(
        &mut report,
        &format!("network {network}"),
        rt.remove_network(network).await,
    );
    let image = &env.config.image.tag;
    record_removal(&mut report, &format!("image {image}"), rt.remove_image(image).await);

    reporter.step("removing local fleet files...");
    match credentials.remove_pair().await {
        Ok(paths) => report
            .removed
            .extend(paths.iter().map(|p| p.display().to_string())),
        Err(e) => report
            .failures
            .push(FleetError::teardown("credentials", format!("{e:#}"))),
    }
    remove_dir(env.fs, &env.paths.build_dir(), &mut report);
    remove_dir(env.fs, &env.paths.harvest_dir(), &mut report);

    let plan = env.plan;
    match trust_store.restore(&|entry: &HostEntry<'_>| is_cluster_entry(plan, entry)) {
        Ok(outcome) => {
            match outcome {
                TrustRestore::Restored => reporter.success("known_hosts restored from backup"),
                TrustRestore::Stripped { removed } if removed > 0 => {
                    reporter.success(&format!("removed {removed} fleet entries from known_hosts"));
                }
                TrustRestore::Stripped { .. } | TrustRestore::Untouched => {}
            }
            report.trust_store = Some(outcome);
        }
        Err(e) => report
            .failures
            .push(FleetError::teardown("operator known_hosts", format!("{e:#}"))),
    }

    for failure in &report.failures {
        tracing::warn!(error = %failure, "teardown step failed");
    }
    tracing::info!(
        removed = report.removed.len(),
        failures = report.failures.len(),
        "teardown complete"
    );
    report
}

fn record_removal(
    report: &mut TeardownReport,
    resource: &str,
    result: anyhow::Result<std::process::Output>,
) {
    match result {
        Ok(output) if output.status.success() => report.removed.push(resource.to_string()),
        Ok(output) if is_absent(&output) => {}
        Ok(output) => report
            .failures
            .push(FleetError::teardown(resource, detail(&output))),
        Err(e) => report
            .failures
            .push(FleetError::teardown(resource, format!("{e:#}"))),
    }
}

fn remove_dir(fs: &impl LocalFs, dir: &Path, report: &mut TeardownReport) {
    if !fs.exists(dir) {
        return;
    }
    match fs.remove_dir_all(dir) {
        Ok(()) => report.removed.push(dir.display().to_string()),
        Err(e) => report
            .failures
            .push(FleetError::teardown(dir.display().to_string(), format!("{e:#}"))),
    }
}
