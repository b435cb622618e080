//! `fleet provision <N>` — build, start, and trust-mesh a fleet.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::provision::provision;
use crate::commands::fleet_spec_parser;
use crate::domain::FleetSpec;
use crate::output::human::HumanRenderer;
use crate::output::json::format_report;

/// Arguments for the provision command.
#[derive(Args)]
pub struct ProvisionArgs {
    /// Number of nodes (1-244)
    #[arg(value_parser = fleet_spec_parser(), allow_negative_numbers = true)]
    pub size: FleetSpec,
}

/// Run `fleet provision <N>`.
///
/// # Errors
///
/// Returns the whole-run `FleetError` when the run stops before any node
/// exists. Per-node failures produce a report and a failure exit code.
pub async fn run(app: &AppContext, args: &ProvisionArgs) -> Result<ExitCode> {
    let env = app.env();
    let credentials = app.credentials();
    let trust_store = app.trust_store();
    let probe = app.probe();
    let reporter = app.reporter();

    let report = provision(
        &env,
        &credentials,
        &trust_store,
        &probe,
        args.size,
        &reporter,
        &app.cancel,
    )
    .await?;
    reporter.finish();

    let success = report.is_success();
    if app.is_json() {
        println!("{}", format_report(&report, success)?);
    } else {
        app.output.emit(&HumanRenderer::new(&app.output).provision(&report));
    }
    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
