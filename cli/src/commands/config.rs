//! `fleet config` — show the effective configuration.

use std::process::ExitCode;

use anyhow::{Context, Result};

use crate::app::AppContext;
use crate::domain::config::ConfigSource;
use crate::output::human::HumanRenderer;

/// Run `fleet config`.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn run(app: &AppContext) -> Result<ExitCode> {
    if app.is_json() {
        let source = match &app.config_source {
            ConfigSource::File(path) => path.display().to_string(),
            ConfigSource::Defaults => "defaults".to_string(),
        };
        let obj = serde_json::json!({
            "source": source,
            "config": app.config,
            "known_hosts": app.paths.operator_known_hosts(),
            "root": app.paths.root(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&obj).context("JSON serialization failed")?
        );
    } else {
        app.output.emit(&HumanRenderer::new(&app.output).config(
            &app.config,
            &app.config_source,
            &app.paths,
        ));
    }
    Ok(ExitCode::SUCCESS)
}
