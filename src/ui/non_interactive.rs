//! Non-interactive UI for unattended/CI environments.

use std::collections::HashMap;

use crate::error::Result;

use super::{OutputMode, Prompt, SpinnerHandle, UserInterface};

/// UI implementation for unattended mode.
///
/// Prompts are never shown: a `FLIGHTDECK_CONFIRM_<KEY>` environment
/// variable answers a specific prompt, otherwise the prompt's default
/// applies. Spinners degrade to plain status lines.
pub struct NonInteractiveUI {
    mode: OutputMode,
    env_overrides: HashMap<String, String>,
}

impl NonInteractiveUI {
    /// Create a new non-interactive UI.
    pub fn new(mode: OutputMode) -> Self {
        let env_overrides: HashMap<String, String> = std::env::vars()
            .filter(|(k, _)| k.starts_with("FLIGHTDECK_CONFIRM_"))
            .collect();

        Self {
            mode,
            env_overrides,
        }
    }

    /// Create with explicit overrides (for testing).
    pub fn with_overrides(mode: OutputMode, overrides: HashMap<String, String>) -> Self {
        Self {
            mode,
            env_overrides: overrides,
        }
    }
}

/// Spinner that prints its start message once and its outcome once.
struct LineSpinner {
    quiet: bool,
}

impl SpinnerHandle for LineSpinner {
    fn set_message(&mut self, _msg: &str) {}

    fn finish_success(&mut self, msg: &str) {
        if !self.quiet {
            println!("✓ {}", msg);
        }
    }

    fn finish_error(&mut self, msg: &str) {
        eprintln!("✗ {}", msg);
    }

    fn finish_warning(&mut self, msg: &str) {
        if !self.quiet {
            eprintln!("⚠ {}", msg);
        }
    }
}

impl UserInterface for NonInteractiveUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn step(&mut self, number: usize, total: usize, title: &str) {
        if self.mode.shows_status() {
            println!("[{}/{}] {}", number, total, title);
        }
    }

    fn message(&mut self, msg: &str) {
        if self.mode.shows_status() {
            println!("{}", msg);
        }
    }

    fn success(&mut self, msg: &str) {
        if self.mode.shows_status() {
            println!("✓ {}", msg);
        }
    }

    fn warning(&mut self, msg: &str) {
        if self.mode.shows_status() {
            eprintln!("⚠ {}", msg);
        }
    }

    fn error(&mut self, msg: &str) {
        eprintln!("✗ {}", msg);
    }

    fn confirm(&mut self, prompt: &Prompt) -> Result<bool> {
        let env_key = format!("FLIGHTDECK_CONFIRM_{}", prompt.key.to_uppercase());
        if let Some(value) = self.env_overrides.get(&env_key) {
            return Ok(matches!(value.as_str(), "true" | "yes" | "y" | "1"));
        }
        Ok(prompt.default)
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        if self.mode.shows_status() {
            println!("{}...", message);
        }
        Box::new(LineSpinner {
            quiet: !self.mode.shows_status(),
        })
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirm_uses_default_without_override() {
        let mut ui = NonInteractiveUI::with_overrides(OutputMode::Quiet, HashMap::new());

        let yes = Prompt::confirm("recreate_env", "Recreate?", true);
        let no = Prompt::confirm("retry_removal", "Retry?", false);

        assert!(ui.confirm(&yes).unwrap());
        assert!(!ui.confirm(&no).unwrap());
    }

    #[test]
    fn confirm_env_override_wins_over_default() {
        let mut overrides = HashMap::new();
        overrides.insert(
            "FLIGHTDECK_CONFIRM_RECREATE_ENV".to_string(),
            "yes".to_string(),
        );
        let mut ui = NonInteractiveUI::with_overrides(OutputMode::Quiet, overrides);

        let prompt = Prompt::confirm("recreate_env", "Recreate?", false);
        assert!(ui.confirm(&prompt).unwrap());
    }

    #[test]
    fn never_interactive() {
        let ui = NonInteractiveUI::with_overrides(OutputMode::Normal, HashMap::new());
        assert!(!ui.is_interactive());
    }
}
