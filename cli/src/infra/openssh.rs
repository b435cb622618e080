//! Infrastructure implementation of the `SshClient` port using OpenSSH.

use std::path::{Path, PathBuf};
use std::process::Output;

use anyhow::{Context, Result};

use crate::application::ports::{CommandRunner, SshClient};

/// Runs commands on fleet nodes through their published ports.
///
/// Host keys are checked strictly against the operator trust store, so a
/// successful call proves the pin is correct.
pub struct OpenSshClient<R: CommandRunner> {
    runner: R,
    known_hosts: PathBuf,
}

impl<R: CommandRunner> OpenSshClient<R> {
    pub fn new(runner: R, known_hosts: PathBuf) -> Self {
        Self {
            runner,
            known_hosts,
        }
    }

    fn args(&self, port: u16, identity: &Path, command: &[&str]) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-i".into(),
            identity.to_string_lossy().into_owned(),
            "-p".into(),
            port.to_string(),
            "-o".into(),
            "BatchMode=yes".into(),
            "-o".into(),
            "IdentitiesOnly=yes".into(),
            "-o".into(),
            "StrictHostKeyChecking=yes".into(),
            "-o".into(),
            format!("UserKnownHostsFile={}", self.known_hosts.display()),
            "-o".into(),
            "ConnectTimeout=5".into(),
            "-o".into(),
            "LogLevel=ERROR".into(),
            "root@localhost".into(),
        ];
        args.extend(command.iter().map(ToString::to_string));
        args
    }
}

impl<R: CommandRunner> SshClient for OpenSshClient<R> {
    async fn run_remote(&self, port: u16, identity: &Path, command: &[&str]) -> Result<Output> {
        let args = self.args(port, identity, command);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.runner
            .run("ssh", &args)
            .await
            .with_context(|| format!("ssh to localhost:{port}"))
    }
}
