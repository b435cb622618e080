//! Version command

use crate::app::OutputMode;

/// Run the version command.
///
/// Runs before any configuration is loaded, so it takes only the output mode.
pub fn run(mode: OutputMode) {
    let version = env!("CARGO_PKG_VERSION");

    match mode {
        OutputMode::Json => println!(r#"{{"version":"{version}"}}"#),
        OutputMode::Human => println!("fleet {version}"),
    }
}
