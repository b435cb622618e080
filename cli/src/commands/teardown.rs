//! `fleet teardown` — remove everything provisioning created.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::teardown::teardown;
use crate::output::human::HumanRenderer;
use crate::output::json::format_report;
use crate::output::{Mark, Screen};

/// Arguments for the teardown command.
#[derive(Args)]
pub struct TeardownArgs {
    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Run `fleet teardown`.
///
/// # Errors
///
/// Returns an error if the confirmation prompt or rendering fails.
pub async fn run(app: &AppContext, args: &TeardownArgs) -> Result<ExitCode> {
    if !args.yes
        && !app.confirm(
            &format!(
                "Remove all fleet nodes, network {}, and fleet credentials?",
                app.plan.name()
            ),
            true,
        )?
    {
        let mut screen = Screen::default();
        screen.line(app.output.marked(Mark::Info, "Cancelled."));
        app.output.emit(&screen);
        return Ok(ExitCode::SUCCESS);
    }

    let credentials = app.credentials();
    let trust_store = app.trust_store();
    let reporter = app.reporter();
    let report = teardown(&app.env(), &credentials, &trust_store, &reporter).await;
    reporter.finish();

    let success = report.is_success();
    if app.is_json() {
        println!("{}", format_report(&report, success)?);
    } else {
        app.output.emit(&HumanRenderer::new(&app.output).teardown(&report));
    }
    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
