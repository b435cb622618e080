//! CLI argument parsing with clap derive

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, OutputFlags, OutputMode};
use crate::commands;

/// Disposable SSH-meshed node fleets on a local container runtime
#[derive(Parser)]
#[command(
    name = "fleet",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Log debug details to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: ~/.fleet/config.yaml)
    #[arg(long, global = true, env = "FLEET_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build, start, and SSH-mesh a fleet of N nodes
    Provision(commands::provision::ProvisionArgs),

    /// Check operator→node and node→node SSH for a fleet of N nodes
    Verify(commands::verify::VerifyArgs),

    /// Remove every fleet node, the network, the image, and fleet credentials
    Teardown(commands::teardown::TeardownArgs),

    /// Show the effective configuration
    Config,

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails before producing a report.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            verbose: _,
            config,
            command,
        } = self;
        if let Command::Version = command {
            commands::version::run(if json { OutputMode::Json } else { OutputMode::Human });
            return Ok(ExitCode::SUCCESS);
        }

        let app = AppContext::new(&AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            config,
        })?;
        match command {
            Command::Provision(args) => {
                app.watch_interrupts();
                commands::provision::run(&app, &args).await
            }
            Command::Verify(args) => commands::verify::run(&app, &args).await,
            Command::Teardown(args) => commands::teardown::run(&app, &args).await,
            Command::Config => commands::config::run(&app),
            Command::Version => Ok(ExitCode::SUCCESS),
        }
    }
}
