use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::IsTerminal;
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Indeterminate progress on stderr. Hidden when stderr is not a terminal.
pub struct Spinner {
    progress_bar: ProgressBar,
}

impl Spinner {
    pub fn start(message: impl Into<String>) -> Self {
        let progress_bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            progress_bar.set_style(style.tick_chars(TICK_CHARS));
        }
        progress_bar.set_message(message.into());

        if std::io::stderr().is_terminal() {
            progress_bar.enable_steady_tick(Duration::from_millis(100));
        } else {
            progress_bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        Spinner { progress_bar }
    }

    pub fn success(self, message: impl AsRef<str>) {
        self.progress_bar.finish_and_clear();
        eprintln!("{} {}", icons::success(), message.as_ref());
    }

    pub fn error(self, message: impl AsRef<str>) {
        self.progress_bar.finish_and_clear();
        eprintln!("{} {}", icons::error(), message.as_ref().red());
    }
}

pub mod icons {
    use colored::Colorize;

    pub fn success() -> String {
        "✓".green().to_string()
    }

    pub fn error() -> String {
        "✗".red().to_string()
    }

    pub fn warning() -> String {
        "!".yellow().to_string()
    }

    pub fn arrow() -> &'static str {
        "→"
    }
}
