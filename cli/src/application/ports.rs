//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` — never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;

use crate::domain::TrustRestore;
use crate::domain::trust::HostEntry;

// ── Value Types ───────────────────────────────────────────────────────────────

/// Launch parameters for one fleet node.
pub struct NodeSpec<'a> {
    /// Runtime name and hostname, e.g. `"comp1"`.
    pub name: &'a str,
    /// Ordinal index, recorded as a label for inspection.
    pub index: u32,
    /// Image tag to run.
    pub image: &'a str,
    /// Network to attach to.
    pub network: &'a str,
    /// Fixed address on that network.
    pub address: &'a str,
    /// Host port published to the node's port 22.
    pub host_port: u16,
}

/// The shared fleet keypair as it exists on the operator's disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub private_key: PathBuf,
    pub public_key_path: PathBuf,
    /// Public key line, e.g. `ssh-ed25519 AAAA... fleet`.
    pub public_key: String,
}

/// Cooperative cancellation: once set, services stop issuing new operations.
///
/// Nothing already running is rolled back.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ── Runtime Port Traits ───────────────────────────────────────────────────────

/// Runtime availability checks.
#[allow(async_fn_in_trait)]
pub trait RuntimeInspector {
    /// Get the runtime server version.
    async fn version(&self) -> Result<Output>;
}

/// Node image build and removal.
#[allow(async_fn_in_trait)]
pub trait ImageBuilder {
    /// Build `tag` from the descriptor in `context_dir`.
    async fn build_image(&self, tag: &str, context_dir: &Path) -> Result<Output>;
    /// Remove the image `tag`.
    async fn remove_image(&self, tag: &str) -> Result<Output>;
}

/// Isolated network management.
#[allow(async_fn_in_trait)]
pub trait NetworkManager {
    /// Create a bridge network with the given subnet and gateway.
    async fn create_network(&self, name: &str, subnet: &str, gateway: &str) -> Result<Output>;
    /// Remove the network `name`.
    async fn remove_network(&self, name: &str) -> Result<Output>;
}

/// Node lifecycle: run, stop, remove, discover.
#[allow(async_fn_in_trait)]
pub trait NodeLifecycle {
    /// Create and start a node.
    async fn run_node(&self, spec: &NodeSpec<'_>) -> Result<Output>;
    /// Stop a node.
    async fn stop_node(&self, name: &str) -> Result<Output>;
    /// Remove a node.
    async fn remove_node(&self, name: &str) -> Result<Output>;
    /// List node names (one per stdout line) containing `prefix`. May
    /// over-match; callers apply the exact naming rule.
    async fn list_nodes(&self, prefix: &str) -> Result<Output>;
}

/// Command execution and file transfer into a node.
#[allow(async_fn_in_trait)]
pub trait NodeShell {
    /// Execute a command inside `node` and capture output.
    async fn exec(&self, node: &str, args: &[&str]) -> Result<Output>;
    /// Copy a host file to `remote` inside `node`, replacing it.
    async fn copy_into(&self, node: &str, local: &Path, remote: &str) -> Result<Output>;
}

/// Composite trait — any type implementing all five sub-traits is a `ContainerRuntime`.
pub trait ContainerRuntime:
    RuntimeInspector + ImageBuilder + NetworkManager + NodeLifecycle + NodeShell
{
}

/// Blanket implementation: any type implementing all five sub-traits is a `ContainerRuntime`.
impl<T> ContainerRuntime for T where
    T: RuntimeInspector + ImageBuilder + NetworkManager + NodeLifecycle + NodeShell
{
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: std::time::Duration,
    ) -> Result<Output>;
}

// ── SSH Ports ─────────────────────────────────────────────────────────────────

/// Generate-or-reuse of the shared fleet keypair.
#[allow(async_fn_in_trait)]
pub trait CredentialStore {
    /// Return the existing pair, generating it first if absent.
    async fn ensure_pair(&self) -> Result<CredentialPair>;
    /// Delete the pair. Returns the files that were removed.
    async fn remove_pair(&self) -> Result<Vec<PathBuf>>;
}

/// The operator's own `known_hosts`, mutated under a single-writer lock.
///
/// Sync trait: each call is one short read-modify-write of a local file.
pub trait OperatorTrustStore {
    /// Take a verbatim backup unless one already exists.
    /// Returns `true` when a new backup was written.
    fn backup(&self) -> Result<bool>;
    /// Remove every binding for `principal`, then bind it to `host_key`.
    fn pin(&self, principal: &str, host_key: &str) -> Result<()>;
    /// Restore the backup if present, otherwise strip host entries matching
    /// `is_cluster`.
    fn restore(&self, is_cluster: &dyn Fn(&HostEntry<'_>) -> bool) -> Result<TrustRestore>;
}

/// Probe whether a node's SSH service answers on its published port.
#[allow(async_fn_in_trait)]
pub trait ReadinessProbe {
    /// `true` once an SSH banner is received from `127.0.0.1:port`.
    async fn ssh_ready(&self, port: u16) -> bool;
}

/// Operator-side SSH client used by connectivity checks.
#[allow(async_fn_in_trait)]
pub trait SshClient {
    /// Run `command` as root on `localhost:port` with strict host key checking.
    async fn run_remote(&self, port: u16, identity: &Path, command: &[&str]) -> Result<Output>;
}

// ── Filesystem Port ───────────────────────────────────────────────────────────

/// Raw local filesystem operations used by services.
pub trait LocalFs {
    fn exists(&self, path: &Path) -> bool;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn remove_dir_all(&self, path: &Path) -> Result<()>;
    fn remove_file(&self, path: &Path) -> Result<()>;
    fn write(&self, path: &Path, content: &str) -> Result<()>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait — no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}
