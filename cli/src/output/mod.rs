//! Terminal output.
//!
//! Renderers in [`human`] build a [`Screen`]; [`OutputContext::emit`] prints
//! it. Nothing in a renderer touches stdout directly.

pub mod human;
pub mod json;
pub mod progress;
pub mod reporter;
pub mod styles;

use console::Term;
use owo_colors::OwoColorize as _;
pub use styles::Styles;

/// Leading symbol of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Step,
    Ok,
    Warn,
    Fail,
    Info,
}

/// Rendered lines, split by destination and kept in print order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Screen {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl Screen {
    pub fn line(&mut self, line: impl Into<String>) {
        self.stdout.push(line.into());
    }

    pub fn blank(&mut self) {
        self.stdout.push(String::new());
    }

    /// A line for stderr. Printed even in quiet mode.
    pub fn problem(&mut self, line: impl Into<String>) {
        self.stderr.push(line.into());
    }
}

/// Styling and terminal state shared by every renderer.
pub struct OutputContext {
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl OutputContext {
    /// `no_color` already folds in `NO_COLOR` through the CLI flag.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let mut styles = Styles::default();
        if !no_color && is_tty {
            styles.colorize();
        }
        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    /// Spinners only make sense on an interactive, non-quiet terminal.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    /// `"  ✓ msg"`, with the mark coloured for its kind.
    #[must_use]
    pub fn marked(&self, mark: Mark, msg: &str) -> String {
        let (symbol, style) = match mark {
            Mark::Step => ("→", self.styles.info),
            Mark::Ok => ("✓", self.styles.success),
            Mark::Warn => ("!", self.styles.warning),
            Mark::Fail => ("✗", self.styles.error),
            Mark::Info => ("ℹ", self.styles.info),
        };
        format!("  {} {msg}", symbol.style(style))
    }

    pub fn emit(&self, screen: &Screen) {
        for line in &screen.stderr {
            eprintln!("{line}");
        }
        if self.quiet {
            return;
        }
        for line in &screen.stdout {
            println!("{line}");
        }
    }
}
