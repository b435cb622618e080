//! Human-readable renderings of fleet reports.

use owo_colors::OwoColorize as _;

use crate::domain::config::ConfigSource;
use crate::domain::{
    FleetConfig, FleetPaths, NodeStatus, ProvisionReport, TeardownReport, TrustRestore,
    VerifyReport,
};
use crate::output::{Mark, OutputContext, Screen};

/// Turns reports into a [`Screen`] styled by an `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Failures first, then the node table and ways to connect.
    #[must_use]
    pub fn provision(&self, report: &ProvisionReport) -> Screen {
        let mut screen = Screen::default();
        for failure in &report.failures {
            screen.problem(self.ctx.marked(Mark::Fail, &failure.to_string()));
        }

        let styles = &self.ctx.styles;
        screen.blank();
        screen.line(format!(
            "  {}",
            format!("Fleet on {} ({})", report.network, report.subnet).style(styles.header)
        ));
        screen.blank();
        screen.line(format!(
            "  {:<8} {:<15} {:<6} {:<13} {}",
            "NODE".style(styles.dim),
            "ADDRESS".style(styles.dim),
            "PORT".style(styles.dim),
            "STATUS".style(styles.dim),
            "HOST KEY".style(styles.dim),
        ));
        for node in &report.nodes {
            let style = match node.status {
                NodeStatus::Trusted => styles.success,
                NodeStatus::Untrusted | NodeStatus::Skipped => styles.warning,
                NodeStatus::NotReady | NodeStatus::CreateFailed => styles.error,
            };
            screen.line(format!(
                "  {:<8} {:<15} {:<6} {:<13} {}",
                node.identity.name.style(styles.accent),
                node.identity.address,
                node.identity.port,
                status_label(node.status).style(style),
                node.host_key_fingerprint.as_deref().unwrap_or("-"),
            ));
        }

        let commands = report.connection_commands();
        if !commands.is_empty() {
            screen.blank();
            screen.line(format!("  {}", "Connect:".style(styles.header)));
            for cmd in commands {
                screen.line(format!("    {}", cmd.style(styles.accent)));
            }
        }
        screen.blank();
        screen
    }

    #[must_use]
    pub fn teardown(&self, report: &TeardownReport) -> Screen {
        let mut screen = Screen::default();
        for failure in &report.failures {
            screen.problem(self.ctx.marked(Mark::Fail, &failure.to_string()));
        }
        for resource in &report.removed {
            screen.line(self.ctx.marked(Mark::Ok, &format!("Removed {resource}")));
        }
        match report.trust_store {
            Some(TrustRestore::Restored) => {
                screen.line(self.ctx.marked(Mark::Ok, "Restored known_hosts from backup"));
            }
            Some(TrustRestore::Stripped { removed }) if removed > 0 => {
                screen.line(self.ctx.marked(
                    Mark::Ok,
                    &format!("Removed {removed} fleet entries from known_hosts"),
                ));
            }
            _ => {
                if report.removed.is_empty() && report.failures.is_empty() {
                    screen.line(self.ctx.marked(Mark::Info, "Nothing to tear down"));
                }
            }
        }
        screen
    }

    /// One line per check, then a tally.
    #[must_use]
    pub fn verify(&self, report: &VerifyReport) -> Screen {
        let mut screen = Screen::default();
        if report.checks.is_empty() {
            screen.line(self.ctx.marked(Mark::Warn, "No checks were run"));
            return screen;
        }
        for check in &report.checks {
            let route = format!("{} → {}", check.from, check.to);
            if check.ok {
                screen.line(self.ctx.marked(Mark::Ok, &route));
            } else {
                screen.problem(self.ctx.marked(Mark::Fail, &format!("{route}: {}", check.detail)));
            }
        }
        let total = report.checks.len();
        let passed = total - report.failed();
        screen.blank();
        screen.line(format!("  {passed} of {total} checks passed"));
        screen
    }

    /// Effective settings, where they came from, and the files fleet owns.
    #[must_use]
    pub fn config(&self, config: &FleetConfig, source: &ConfigSource, paths: &FleetPaths) -> Screen {
        let mut screen = Screen::default();
        let origin = match source {
            ConfigSource::File(path) => path.display().to_string(),
            ConfigSource::Defaults => "built-in defaults".to_string(),
        };
        screen.blank();
        screen.line(format!(
            "  {}",
            format!("Configuration ({origin})").style(self.ctx.styles.header)
        ));
        screen.blank();
        let known_hosts = paths.operator_known_hosts().display().to_string();
        let settings = [
            ("network.name", config.network.name.clone()),
            ("network.prefix", config.network.prefix.clone()),
            ("image.tag", config.image.tag.clone()),
            ("image.base", config.image.base.clone()),
            ("ssh.key_comment", config.ssh.key_comment.clone()),
            ("ssh.known_hosts", known_hosts),
            ("ssh.ready_timeout_secs", config.ssh.ready_timeout_secs.to_string()),
            ("ssh.poll_interval_ms", config.ssh.poll_interval_ms.to_string()),
            ("ssh.command_timeout_secs", config.ssh.command_timeout_secs.to_string()),
            ("concurrency", config.concurrency.0.to_string()),
        ];
        for (key, value) in settings {
            screen.line(format!("  {:<26} {value}", format!("{key}:")));
        }
        screen.blank();
        screen.line(format!("  {}", "Files:".style(self.ctx.styles.bold)));
        let files = [
            ("root:", paths.root().to_path_buf()),
            ("private key:", paths.private_key()),
            ("known_hosts backup:", paths.known_hosts_backup()),
        ];
        for (label, path) in files {
            screen.line(format!("    {label:<20} {}", path.display()));
        }
        screen.blank();
        screen
    }
}

fn status_label(status: NodeStatus) -> &'static str {
    match status {
        NodeStatus::Trusted => "trusted",
        NodeStatus::Untrusted => "untrusted",
        NodeStatus::NotReady => "not ready",
        NodeStatus::CreateFailed => "create failed",
        NodeStatus::Skipped => "skipped",
    }
}
