//! Scripted executor for testing.
//!
//! `ScriptedExecutor` implements [`Executor`] and returns pre-configured
//! results matched against the command's display line. Every invocation is
//! recorded for later assertion, so tests can verify exactly which external
//! commands the orchestrator constructed.
//!
//! # Example
//!
//! ```
//! use flightdeck::shell::{ok, fail, CommandSpec, ExecOptions, Executor, ScriptedExecutor};
//!
//! let mut exec = ScriptedExecutor::new();
//! exec.on("nvidia-smi", ok("CUDA Version: 12.4\n"));
//! exec.on("pip install", fail(1, "no network"));
//!
//! let result = exec
//!     .run(&CommandSpec::new("nvidia-smi"), &ExecOptions::default())
//!     .unwrap();
//! assert!(result.stdout.contains("12.4"));
//! assert_eq!(exec.calls_matching("nvidia-smi"), 1);
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use crate::error::Result;

use super::exec::{CommandSpec, ExecOptions, ExecResult, Executor};

/// Shorthand for a successful scripted result with the given stdout.
pub fn ok(stdout: &str) -> ExecResult {
    ExecResult::success(stdout.to_string(), String::new(), Duration::ZERO)
}

/// Shorthand for a failed scripted result with the given exit code and stderr.
pub fn fail(code: i32, stderr: &str) -> ExecResult {
    ExecResult::failure(Some(code), String::new(), stderr.to_string(), Duration::ZERO)
}

struct Rule {
    pattern: String,
    queued: VecDeque<ExecResult>,
    repeat: Option<ExecResult>,
}

/// Executor returning scripted results, for tests.
///
/// Rules are matched in registration order against the command's display
/// line (substring match); the first matching rule wins. Unmatched commands
/// succeed with empty output, so tests only script what they care about.
pub struct ScriptedExecutor {
    rules: RefCell<Vec<Rule>>,
    calls: RefCell<Vec<String>>,
}

impl Default for ScriptedExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self {
            rules: RefCell::new(Vec::new()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Return `result` for every command whose display line contains `pattern`.
    pub fn on(&mut self, pattern: &str, result: ExecResult) {
        self.rules.borrow_mut().push(Rule {
            pattern: pattern.to_string(),
            queued: VecDeque::new(),
            repeat: Some(result),
        });
    }

    /// Return `results` in order for successive commands matching `pattern`.
    ///
    /// After the queue is exhausted the rule no longer matches, so a later
    /// rule (or the all-success default) takes over.
    pub fn queue(&mut self, pattern: &str, results: Vec<ExecResult>) {
        self.rules.borrow_mut().push(Rule {
            pattern: pattern.to_string(),
            queued: results.into(),
            repeat: None,
        });
    }

    /// Display lines of every command run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Number of recorded commands whose display line contains `pattern`.
    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|line| line.contains(pattern))
            .count()
    }
}

impl Executor for ScriptedExecutor {
    fn run(&self, spec: &CommandSpec, _options: &ExecOptions) -> Result<ExecResult> {
        let line = spec.display_line();
        self.calls.borrow_mut().push(line.clone());

        for rule in self.rules.borrow_mut().iter_mut() {
            if !line.contains(&rule.pattern) {
                continue;
            }
            if let Some(result) = rule.queued.pop_front() {
                return Ok(result);
            }
            if let Some(result) = &rule.repeat {
                return Ok(result.clone());
            }
        }

        Ok(ok(""))
    }
}
