//! Infrastructure implementation of the container runtime port traits.
//!
//! `DockerRuntime<R>` routes all docker CLI calls through a `CommandRunner`.
//! Results are returned as raw `Output`; callers decide which failures
//! matter (for example, removing an absent node is fine).

use std::path::Path;
use std::process::Output;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{
    CommandRunner, ImageBuilder, NetworkManager, NodeLifecycle, NodeShell, NodeSpec,
    RuntimeInspector,
};
use crate::infra::command_runner::{BUILD_TIMEOUT, TokioCommandRunner};

const DOCKER: &str = "docker";

/// Label recording a node's ordinal index.
pub const INDEX_LABEL: &str = "fleet.index";

/// Infrastructure adapter for the docker CLI.
///
/// Generic over `R: CommandRunner` so that tests can inject a mock runner
/// without spawning real processes.
pub struct DockerRuntime<R: CommandRunner> {
    runner: R,
    build_timeout: Duration,
}

impl<R: CommandRunner> DockerRuntime<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            build_timeout: BUILD_TIMEOUT,
        }
    }

    async fn docker(&self, args: &[&str], what: &str) -> Result<Output> {
        self.runner
            .run(DOCKER, args)
            .await
            .with_context(|| format!("docker {what}"))
    }
}

impl DockerRuntime<TokioCommandRunner> {
    /// Production runtime with `timeout` for every command except builds.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(TokioCommandRunner::new(timeout))
    }
}

impl<R: CommandRunner> RuntimeInspector for DockerRuntime<R> {
    async fn version(&self) -> Result<Output> {
        self.docker(&["version", "--format", "{{.Server.Version}}"], "version")
            .await
    }
}

impl<R: CommandRunner> ImageBuilder for DockerRuntime<R> {
    async fn build_image(&self, tag: &str, context_dir: &Path) -> Result<Output> {
        let dir = context_dir.to_string_lossy();
        self.runner
            .run_with_timeout(DOCKER, &["build", "-t", tag, &dir], self.build_timeout)
            .await
            .context("docker build")
    }

    async fn remove_image(&self, tag: &str) -> Result<Output> {
        self.docker(&["rmi", "-f", tag], "rmi").await
    }
}

impl<R: CommandRunner> NetworkManager for DockerRuntime<R> {
    async fn create_network(&self, name: &str, subnet: &str, gateway: &str) -> Result<Output> {
        self.docker(
            &[
                "network",
                "create",
                "--driver",
                "bridge",
                "--subnet",
                subnet,
                "--gateway",
                gateway,
                name,
            ],
            "network create",
        )
        .await
    }

    async fn remove_network(&self, name: &str) -> Result<Output> {
        self.docker(&["network", "rm", name], "network rm").await
    }
}

impl<R: CommandRunner> NodeLifecycle for DockerRuntime<R> {
    async fn run_node(&self, spec: &NodeSpec<'_>) -> Result<Output> {
        let publish = format!("{}:22", spec.host_port);
        let label = format!("{INDEX_LABEL}={}", spec.index);
        self.docker(
            &[
                "run",
                "-d",
                "--name",
                spec.name,
                "--hostname",
                spec.name,
                "--network",
                spec.network,
                "--ip",
                spec.address,
                "-p",
                &publish,
                "--label",
                &label,
                spec.image,
            ],
            "run",
        )
        .await
    }

    async fn stop_node(&self, name: &str) -> Result<Output> {
        self.docker(&["stop", "-t", "2", name], "stop").await
    }

    async fn remove_node(&self, name: &str) -> Result<Output> {
        self.docker(&["rm", "-f", name], "rm").await
    }

    async fn list_nodes(&self, prefix: &str) -> Result<Output> {
        // Unanchored: some daemons match against `/comp1`. Callers filter exactly.
        let filter = format!("name={prefix}");
        self.docker(
            &["ps", "-a", "--filter", &filter, "--format", "{{.Names}}"],
            "ps",
        )
        .await
    }
}

impl<R: CommandRunner> NodeShell for DockerRuntime<R> {
    async fn exec(&self, node: &str, args: &[&str]) -> Result<Output> {
        let mut full = vec!["exec", node];
        full.extend_from_slice(args);
        self.docker(&full, "exec").await
    }

    async fn copy_into(&self, node: &str, local: &Path, remote: &str) -> Result<Output> {
        let src = local.to_string_lossy();
        let dest = format!("{node}:{remote}");
        self.docker(&["cp", &src, &dest], "cp").await
    }
}
