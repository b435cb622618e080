//! Connectivity verifier: prove the trust mesh works end to end.
//!
//! Every check runs `hostname` over SSH with strict host-key checking, so a
//! check only passes when the key is pinned and the credential is accepted.

use std::path::Path;

use crate::application::ports::{NodeShell, ProgressReporter, SshClient};
use crate::application::services::{detail, for_each_bounded};
use crate::domain::{ConnectivityCheck, NodeIdentity, Topology, VerifyReport};

const OPERATOR: &str = "operator";

/// One connectivity check to perform.
enum Probe<'a> {
    /// Operator to `[localhost]:port`.
    Operator(&'a NodeIdentity),
    /// Node to peer, addressed by name or by address.
    Peer {
        from: &'a NodeIdentity,
        to: &'a NodeIdentity,
        target: String,
    },
}

/// Run operator→node and node→peer checks across `topology`.
pub async fn verify(
    rt: &impl NodeShell,
    ssh: &impl SshClient,
    topology: &Topology,
    identity: &Path,
    limit: usize,
    reporter: &impl ProgressReporter,
) -> VerifyReport {
    let mut probes: Vec<Probe<'_>> = topology.nodes().iter().map(Probe::Operator).collect();
    for from in topology.nodes() {
        for to in topology.peers_of(from) {
            probes.push(Probe::Peer {
                from,
                to,
                target: to.name.clone(),
            });
            probes.push(Probe::Peer {
                from,
                to,
                target: to.address.to_string(),
            });
        }
    }

    reporter.step(&format!("running {} connectivity checks...", probes.len()));
    let checks = for_each_bounded(probes, limit, |probe| async move {
        match probe {
            Probe::Operator(node) => {
                let result = ssh.run_remote(node.port, identity, &["hostname"]).await;
                check(OPERATOR.to_string(), format!("localhost:{}", node.port), node, result)
            }
            Probe::Peer { from, to, target } => {
                let result = rt
                    .exec(
                        &from.name,
                        &[
                            "ssh",
                            "-o",
                            "BatchMode=yes",
                            "-o",
                            "StrictHostKeyChecking=yes",
                            "-o",
                            "ConnectTimeout=5",
                            target.as_str(),
                            "hostname",
                        ],
                    )
                    .await;
                check(from.name.clone(), target, to, result)
            }
        }
    })
    .await;

    let report = VerifyReport { checks };
    for failed in report.checks.iter().filter(|c| !c.ok) {
        tracing::warn!(from = %failed.from, to = %failed.to, detail = %failed.detail, "connectivity check failed");
    }
    if report.is_success() {
        reporter.success(&format!("all {} checks passed", report.checks.len()));
    } else {
        reporter.warn(&format!(
            "{} of {} checks failed",
            report.failed(),
            report.checks.len()
        ));
    }
    report
}

fn check(
    from: String,
    to: String,
    expected: &NodeIdentity,
    result: anyhow::Result<std::process::Output>,
) -> ConnectivityCheck {
    let (ok, detail) = match result {
        Ok(output) if output.status.success() => {
            let answered = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if answered == expected.name {
                (true, answered)
            } else {
                (false, format!("expected {}, reached {answered}", expected.name))
            }
        }
        Ok(output) => (false, detail(&output)),
        Err(e) => (false, format!("{e:#}")),
    };
    ConnectivityCheck { from, to, ok, detail }
}
