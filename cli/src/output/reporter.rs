//! Spinner-driven `ProgressReporter` for fleet runs.

use std::sync::Mutex;

use indicatif::ProgressBar;

use crate::application::ports::ProgressReporter;
use crate::output::{Mark, OutputContext, progress};

/// Terminal progress reporter that wraps an `OutputContext`.
///
/// On a TTY each `step()` drives one spinner that the next `success()`
/// finishes. Without a TTY the same events are printed as plain lines:
///
/// - `step()` prints `"  → {message}"` (suppressed when `ctx.quiet`)
/// - `success()` prints `"  ✓ {message}"` (suppressed when `ctx.quiet`)
/// - `warn()` prints `"  ! {message}"` (suppressed when `ctx.quiet`)
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
    active: Mutex<Option<ProgressBar>>,
}

impl<'a> TerminalReporter<'a> {
    /// Create a new `TerminalReporter` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self {
            ctx,
            active: Mutex::new(None),
        }
    }

    fn with_active<T>(&self, f: impl FnOnce(&mut Option<ProgressBar>) -> T) -> T {
        let mut guard = self
            .active
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut guard)
    }

    /// Clear any spinner still running, e.g. before printing a final report.
    pub fn finish(&self) {
        self.with_active(|active| {
            if let Some(pb) = active.take() {
                pb.finish_and_clear();
            }
        });
    }
}

impl Drop for TerminalReporter<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        if self.ctx.quiet {
            return;
        }
        if !self.ctx.show_progress() {
            println!("{}", self.ctx.marked(Mark::Step, message));
            return;
        }
        self.with_active(|active| match active {
            Some(pb) => pb.set_message(message.to_string()),
            None => *active = Some(progress::spinner(message)),
        });
    }

    fn success(&self, message: &str) {
        if self.ctx.quiet {
            return;
        }
        match self.with_active(Option::take) {
            Some(pb) => progress::finish_ok(&pb, message),
            None => println!("{}", self.ctx.marked(Mark::Ok, message)),
        }
    }

    fn warn(&self, message: &str) {
        if self.ctx.quiet {
            return;
        }
        let line = self.ctx.marked(Mark::Warn, message);
        self.with_active(|active| match active {
            Some(pb) => pb.suspend(|| println!("{line}")),
            None => println!("{line}"),
        });
    }
}
