//! User interface components.
//!
//! This module provides:
//! - [`UserInterface`] trait for UI abstraction
//! - [`TerminalUI`] for interactive terminal usage
//! - [`NonInteractiveUI`] for unattended/CI environments
//! - [`MockUI`] for tests
//!
//! # Example
//!
//! ```
//! use flightdeck::ui::{create_ui, OutputMode};
//!
//! let mut ui = create_ui(false, OutputMode::Quiet);
//! ui.step(1, 5, "Creating virtual environment");
//! ui.success("Done!");
//! ```

pub mod mock;
pub mod non_interactive;
pub mod spinner;
pub mod terminal;
pub mod theme;

pub use mock::MockUI;
pub use non_interactive::NonInteractiveUI;
pub use spinner::ProgressSpinner;
pub use terminal::{create_ui, TerminalUI};
pub use theme::{should_use_colors, FlightdeckTheme};

use crate::error::Result;

/// How much status output to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Step headers and status lines.
    #[default]
    Normal,
    /// Errors only.
    Quiet,
    /// Everything, including per-invocation detail.
    Verbose,
}

impl OutputMode {
    /// Whether status lines (success/warning/step) are shown.
    pub fn shows_status(&self) -> bool {
        !matches!(self, OutputMode::Quiet)
    }

    /// Whether animated spinners are shown.
    pub fn shows_spinners(&self) -> bool {
        matches!(self, OutputMode::Normal)
    }
}

/// Trait for user interface interactions.
///
/// This trait allows mocking the UI in tests.
pub trait UserInterface {
    /// Get the current output mode.
    fn output_mode(&self) -> OutputMode;

    /// Announce a numbered provisioning step.
    fn step(&mut self, number: usize, total: usize, title: &str);

    /// Display an informational message.
    fn message(&mut self, msg: &str);

    /// Display a success message.
    fn success(&mut self, msg: &str);

    /// Display a warning message.
    fn warning(&mut self, msg: &str);

    /// Display an error message.
    fn error(&mut self, msg: &str);

    /// Ask a yes/no question.
    fn confirm(&mut self, prompt: &Prompt) -> Result<bool>;

    /// Start a spinner for a long-running operation.
    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle>;

    /// Check if running in interactive mode.
    fn is_interactive(&self) -> bool;
}

/// Handle for controlling a spinner.
pub trait SpinnerHandle {
    /// Update the spinner message.
    fn set_message(&mut self, msg: &str);

    /// Mark the operation as successful.
    fn finish_success(&mut self, msg: &str);

    /// Mark the operation as failed.
    fn finish_error(&mut self, msg: &str);

    /// Finish with a warning (e.g. degraded outcome).
    fn finish_warning(&mut self, msg: &str);
}

/// A yes/no question to show to the user.
#[derive(Debug, Clone)]
pub struct Prompt {
    /// Unique key for the prompt (used for scripted responses and
    /// environment overrides).
    pub key: String,
    /// The question to display.
    pub question: String,
    /// Answer assumed when the user just presses enter, and in
    /// non-interactive mode.
    pub default: bool,
}

impl Prompt {
    /// Create a confirm prompt.
    pub fn confirm(key: &str, question: &str, default: bool) -> Self {
        Self {
            key: key.to_string(),
            question: question.to_string(),
            default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_mode_hides_status() {
        assert!(!OutputMode::Quiet.shows_status());
        assert!(OutputMode::Normal.shows_status());
        assert!(OutputMode::Verbose.shows_status());
    }

    #[test]
    fn spinners_only_in_normal_mode() {
        assert!(OutputMode::Normal.shows_spinners());
        assert!(!OutputMode::Quiet.shows_spinners());
        assert!(!OutputMode::Verbose.shows_spinners());
    }

    #[test]
    fn prompt_confirm_builder() {
        let prompt = Prompt::confirm("recreate_env", "Recreate it?", false);
        assert_eq!(prompt.key, "recreate_env");
        assert_eq!(prompt.question, "Recreate it?");
        assert!(!prompt.default);
    }
}
