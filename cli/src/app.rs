//! Application context — unified state passed to every command handler.
//!
//! `AppContext` resolves configuration and file locations once and hands
//! out the production adapters. Adding a cross-cutting concern requires
//! only one field change here; no command signatures change.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::application::ports::Cancellation;
use crate::application::services::FleetEnv;
use crate::domain::config::ConfigSource;
use crate::domain::{FleetConfig, FleetPaths, NetworkPlan};
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::YamlConfigStore;
use crate::infra::docker::DockerRuntime;
use crate::infra::fs::{LocalFs, fleet_root, resolve_paths};
use crate::infra::keys::SshKeygen;
use crate::infra::known_hosts::KnownHostsStore;
use crate::infra::openssh::OpenSshClient;
use crate::infra::probe::BannerProbe;
use crate::output::OutputContext;
use crate::output::reporter::TerminalReporter;

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
    /// Explicit configuration file (`--config` / `FLEET_CONFIG`).
    pub config: Option<PathBuf>,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Effective configuration.
    pub config: FleetConfig,
    /// Where `config` was loaded from.
    pub config_source: ConfigSource,
    /// Network plan derived from `config`.
    pub plan: NetworkPlan,
    /// Operator-side file layout.
    pub paths: FleetPaths,
    /// Docker runtime adapter.
    pub runtime: DockerRuntime<TokioCommandRunner>,
    /// Local filesystem adapter.
    pub fs: LocalFs,
    /// Set on Ctrl-C; services stop issuing new operations.
    pub cancel: Cancellation,
    /// When `true`, skip interactive prompts and use defaults.
    ///
    /// Set when stdin is not a terminal or when the `CI` or `FLEET_YES`
    /// environment variables are present.
    pub non_interactive: bool,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined or the
    /// configuration cannot be loaded or fails validation.
    pub fn new(flags: &AppFlags) -> Result<Self> {
        let root = fleet_root()?;
        let (config_path, explicit) = match &flags.config {
            Some(path) => (path.clone(), true),
            None => (root.join("config.yaml"), false),
        };
        let (config, config_source) = YamlConfigStore::new(config_path, explicit).load()?;
        let plan = config.validate().context("invalid configuration")?;
        let paths = resolve_paths(root, config.ssh.known_hosts.as_deref())?;

        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        // JSON owns stdout; progress lines would corrupt it.
        let quiet = flags.output.quiet || flags.output.json;
        let non_interactive = std::env::var_os("CI").is_some()
            || std::env::var_os("FLEET_YES").is_some()
            || !console::Term::stdout().is_term();

        Ok(Self {
            output: OutputContext::new(flags.output.no_color, quiet),
            mode,
            runtime: DockerRuntime::with_timeout(config.command_timeout()),
            config,
            config_source,
            plan,
            paths,
            fs: LocalFs,
            cancel: Cancellation::new(),
            non_interactive,
        })
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Runtime, filesystem, and configuration bundle for services.
    #[must_use]
    pub fn env(&self) -> FleetEnv<'_, DockerRuntime<TokioCommandRunner>, LocalFs> {
        FleetEnv {
            runtime: &self.runtime,
            fs: &self.fs,
            config: &self.config,
            plan: &self.plan,
            paths: &self.paths,
        }
    }

    #[must_use]
    pub fn credentials(&self) -> SshKeygen<TokioCommandRunner> {
        SshKeygen::new(
            TokioCommandRunner::new(self.config.command_timeout()),
            self.paths.private_key(),
            self.paths.public_key(),
            &self.config.ssh.key_comment,
        )
    }

    #[must_use]
    pub fn trust_store(&self) -> KnownHostsStore {
        KnownHostsStore::with_paths(
            self.paths.operator_known_hosts().to_path_buf(),
            self.paths.known_hosts_backup(),
        )
    }

    #[must_use]
    pub fn probe(&self) -> BannerProbe {
        BannerProbe::default()
    }

    #[must_use]
    pub fn ssh_client(&self) -> OpenSshClient<TokioCommandRunner> {
        OpenSshClient::new(
            TokioCommandRunner::new(self.config.command_timeout()),
            self.paths.operator_known_hosts().to_path_buf(),
        )
    }

    #[must_use]
    pub fn reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output)
    }

    /// Set `cancel` on the first Ctrl-C; exit immediately on the second.
    pub fn watch_interrupts(&self) {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            tracing::warn!("interrupt received; finishing in-flight operations");
            eprintln!("\n  Interrupted: finishing in-flight operations (Ctrl-C again to abort)");
            cancel.cancel();
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        });
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true`, returns `default` immediately
    /// without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails.
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }
}
