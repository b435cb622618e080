//! Fleet CLI - disposable SSH-meshed node fleets

#![cfg_attr(test, allow(clippy::expect_used))]

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use fleet_cli::cli::Cli;
use fleet_cli::domain::FleetError;
use fleet_cli::output::json::format_error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let json = cli.json;

    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            report_error(&e, json);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_tracing(verbose: bool) {
    let default = if verbose { "fleet_cli=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn report_error(err: &anyhow::Error, json: bool) {
    if json {
        let code = err
            .downcast_ref::<FleetError>()
            .map_or("ERROR", FleetError::code);
        if let Ok(text) = format_error(&format!("{err:#}"), code) {
            println!("{text}");
            return;
        }
    }
    eprintln!("Error: {err:#}");
}
