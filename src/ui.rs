//! Stage progress on the terminal.
//!
//! Long blocking stages (engine start-up, draining) show a spinner when stderr
//! is a terminal and fall back to plain `==> stage` lines otherwise. Frame-rate
//! reports do not go through here; they are printed on stdout.

use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::IsTerminal;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum UiMode {
    #[default]
    Auto,
    Plain,
    Pretty,
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
    disable_pretty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool, disable_pretty: bool) -> Self {
        Self {
            mode,
            is_tty,
            disable_pretty,
        }
    }

    /// Spinners need stderr on a terminal. `Auto` also stays plain when stdout
    /// is redirected; `Pretty` does not.
    pub fn for_stderr(mode: UiMode) -> Self {
        Self::new(
            mode,
            std::io::stderr().is_terminal(),
            !std::io::stdout().is_terminal(),
        )
    }

    /// Plain output regardless of the terminal.
    pub fn plain() -> Self {
        Self::new(UiMode::Plain, false, true)
    }

    fn use_spinner(&self) -> bool {
        self.is_tty
            && match self.mode {
                UiMode::Pretty => true,
                UiMode::Auto => !self.disable_pretty,
                UiMode::Plain => false,
            }
    }

    pub fn stage(&self, name: &str) -> StageGuard {
        if self.use_spinner() {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner.set_message(format!("{name}…"));
            StageGuard::new(name.to_string(), Some(spinner))
        } else {
            eprintln!("==> {}", name);
            StageGuard::new(name.to_string(), None)
        }
    }
}

/// Marks a stage finished, with its duration, when dropped.
pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
    failed: bool,
}

impl StageGuard {
    fn new(name: String, spinner: Option<ProgressBar>) -> Self {
        Self {
            name,
            start: Instant::now(),
            spinner,
            failed: false,
        }
    }

    /// Finish with a failure mark instead of a check.
    pub fn fail(mut self) {
        self.failed = true;
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let mark = if self.failed { "✘" } else { "✔" };
        let message = format!(
            "{} {} ({})",
            mark,
            self.name,
            format_duration(self.start.elapsed())
        );
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(message);
        } else {
            eprintln!("{message}");
        }
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_only_on_terminals() {
        assert!(!Ui::new(UiMode::Pretty, false, false).use_spinner());
        assert!(!Ui::new(UiMode::Plain, true, false).use_spinner());
        assert!(Ui::new(UiMode::Auto, true, false).use_spinner());
    }

    #[test]
    fn pretty_overrides_redirected_stdout() {
        assert!(!Ui::new(UiMode::Auto, true, true).use_spinner());
        assert!(Ui::new(UiMode::Pretty, true, true).use_spinner());
        assert!(!Ui::plain().use_spinner());
    }

    #[test]
    fn durations_switch_units_at_one_second() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1_500)), "1.50s");
    }
}
