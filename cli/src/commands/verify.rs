//! `fleet verify <N>` — prove the SSH trust mesh works.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::verify::verify;
use crate::commands::fleet_spec_parser;
use crate::domain::{FleetSpec, Topology};
use crate::output::human::HumanRenderer;
use crate::output::json::format_report;

/// Arguments for the verify command.
#[derive(Args)]
pub struct VerifyArgs {
    /// Number of nodes the fleet was provisioned with (1-244)
    #[arg(value_parser = fleet_spec_parser(), allow_negative_numbers = true)]
    pub size: FleetSpec,
}

/// Run `fleet verify <N>`.
///
/// # Errors
///
/// Returns an error only if the report cannot be rendered.
pub async fn run(app: &AppContext, args: &VerifyArgs) -> Result<ExitCode> {
    let topology = Topology::new(&app.plan, args.size);
    let ssh = app.ssh_client();
    let reporter = app.reporter();
    let report = verify(
        &app.runtime,
        &ssh,
        &topology,
        &app.paths.private_key(),
        app.env().limit(),
        &reporter,
    )
    .await;
    reporter.finish();

    let success = report.is_success();
    if app.is_json() {
        println!("{}", format_report(&report, success)?);
    } else {
        app.output.emit(&HumanRenderer::new(&app.output).verify(&report));
    }
    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
