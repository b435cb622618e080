//! Application services — use-case orchestration.
//!
//! Each service module implements a single use-case by composing domain logic
//! with port trait calls. Services import only from `crate::domain` and
//! `crate::application::ports` — never from `crate::infra`, `crate::commands`,
//! or `crate::output`.

use std::future::Future;
use std::process::Output;

use futures_util::StreamExt as _;
use futures_util::stream;

use crate::application::ports::{ContainerRuntime, LocalFs};
use crate::domain::{FleetConfig, FleetPaths, NetworkPlan};

pub mod node_lifecycle;
pub mod provision;
pub mod teardown;
pub mod trust_bootstrap;
pub mod verify;


/// Everything a fleet use-case needs besides its use-case specific ports.
pub struct FleetEnv<'a, R: ContainerRuntime, F: LocalFs> {
    pub runtime: &'a R,
    pub fs: &'a F,
    pub config: &'a FleetConfig,
    pub plan: &'a NetworkPlan,
    pub paths: &'a FleetPaths,
}

impl<R: ContainerRuntime, F: LocalFs> FleetEnv<'_, R, F> {
    pub(crate) fn limit(&self) -> usize {
        self.config.concurrency.0.max(1)
    }
}

/// Run one future per item with at most `limit` in flight; results keep
/// input order.
///
/// The futures are polled on the calling task, so they need not be `Send`.
pub(crate) async fn for_each_bounded<I, T, Fut, O>(
    items: I,
    limit: usize,
    task: impl FnMut(T) -> Fut,
) -> Vec<O>
where
    I: IntoIterator<Item = T>,
    Fut: Future<Output = O>,
{
    stream::iter(items)
        .map(task)
        .buffered(limit.max(1))
        .collect()
        .await
}

/// Human-readable reason for a failed runtime command.
pub(crate) fn detail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stdout = stdout.trim();
    if !stdout.is_empty() {
        return stdout.to_string();
    }
    match output.status.code() {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// `true` when a failed removal only reports that the target does not exist.
pub(crate) fn is_absent(output: &Output) -> bool {
    let stderr = String::from_utf8_lossy(&output.stderr).to_ascii_lowercase();
    stderr.contains("no such") || stderr.contains("not found")
}
