//! Subprocess execution.

use crate::error::{FlightdeckError, Result};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// A program invocation: executable name plus argument vector.
///
/// Commands are spawned directly, never through a shell, so arguments need
/// no quoting and the argument vector is what tests assert against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to execute (resolved via PATH or an absolute path).
    pub program: String,

    /// Arguments passed verbatim.
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Create a spec for a program with no arguments yet.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Single-line rendering for logs and error messages.
    pub fn display_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Options for command execution.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Working directory.
    pub cwd: Option<PathBuf>,

    /// Stream output to the parent's stdio instead of capturing it.
    /// Used in debug mode so long installs show real-time progress;
    /// streamed output is not available in the result.
    pub stream_output: bool,
}

impl ExecOptions {
    /// Capture output, run in the given directory.
    pub fn in_dir(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: Some(cwd.into()),
            stream_output: false,
        }
    }
}

/// Result of executing a command.
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    /// Captured standard output (empty when streamed).
    pub stdout: String,

    /// Captured standard error (empty when streamed).
    pub stderr: String,

    /// Execution duration.
    pub duration: Duration,

    /// Whether the command exited 0.
    pub success: bool,
}

impl ExecResult {
    /// Create a success result.
    pub fn success(stdout: String, stderr: String, duration: Duration) -> Self {
        Self {
            exit_code: Some(0),
            stdout,
            stderr,
            duration,
            success: true,
        }
    }

    /// Create a failure result.
    pub fn failure(
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        duration: Duration,
    ) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
            duration,
            success: false,
        }
    }
}

/// Capability interface for running external commands.
///
/// `run` returns `Ok` for any command that launched and exited, regardless
/// of exit code — callers inspect [`ExecResult::success`]. `Err` means the
/// command could not be launched at all.
pub trait Executor {
    fn run(&self, spec: &CommandSpec, options: &ExecOptions) -> Result<ExecResult>;
}

/// Executor backed by `std::process::Command`.
#[derive(Debug, Default)]
pub struct SystemExecutor;

impl SystemExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Executor for SystemExecutor {
    fn run(&self, spec: &CommandSpec, options: &ExecOptions) -> Result<ExecResult> {
        let start = Instant::now();

        tracing::debug!("exec: {}", spec.display_line());

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);

        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }

        if options.stream_output {
            cmd.stdout(Stdio::inherit());
            cmd.stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
        }

        let output = cmd.output().map_err(|_| FlightdeckError::CommandFailed {
            command: spec.display_line(),
            code: None,
        })?;

        let duration = start.elapsed();
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        tracing::debug!(
            "exec done: {} (code {:?}, {}ms)",
            spec.program,
            output.status.code(),
            duration.as_millis()
        );

        if output.status.success() {
            Ok(ExecResult::success(stdout, stderr, duration))
        } else {
            Ok(ExecResult::failure(
                output.status.code(),
                stdout,
                stderr,
                duration,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_line_joins_program_and_args() {
        let spec = CommandSpec::new("pip").args(["install", "numpy"]);
        assert_eq!(spec.display_line(), "pip install numpy");
    }

    #[test]
    fn display_line_bare_program() {
        let spec = CommandSpec::new("nvidia-smi");
        assert_eq!(spec.display_line(), "nvidia-smi");
    }

    #[test]
    fn arg_builder_accumulates() {
        let spec = CommandSpec::new("python")
            .arg("-m")
            .arg("venv")
            .arg("venv");
        assert_eq!(spec.args, vec!["-m", "venv", "venv"]);
    }

    #[cfg(unix)]
    #[test]
    fn system_executor_successful_command() {
        let exec = SystemExecutor::new();
        let spec = CommandSpec::new("echo").arg("hello");

        let result = exec.run(&spec, &ExecOptions::default()).unwrap();

        assert!(result.success);
        assert_eq!(result.exit_code, Some(0));
        assert!(result.stdout.contains("hello"));
    }

    #[cfg(unix)]
    #[test]
    fn system_executor_failing_command_is_ok_not_err() {
        let exec = SystemExecutor::new();
        let spec = CommandSpec::new("false");

        let result = exec.run(&spec, &ExecOptions::default()).unwrap();

        assert!(!result.success);
        assert_eq!(result.exit_code, Some(1));
    }

    #[test]
    fn system_executor_missing_program_is_err() {
        let exec = SystemExecutor::new();
        let spec = CommandSpec::new("definitely-not-a-real-binary-2c7f");

        let err = exec.run(&spec, &ExecOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            crate::error::FlightdeckError::CommandFailed { .. }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn system_executor_honors_cwd() {
        let temp = tempfile::TempDir::new().unwrap();
        let exec = SystemExecutor::new();
        let spec = CommandSpec::new("pwd");

        let result = exec
            .run(&spec, &ExecOptions::in_dir(temp.path()))
            .unwrap();

        assert!(result.success);
    }

    #[cfg(unix)]
    #[test]
    fn exec_result_tracks_duration() {
        let exec = SystemExecutor::new();
        let spec = CommandSpec::new("echo").arg("fast");

        let result = exec.run(&spec, &ExecOptions::default()).unwrap();

        assert!(result.duration.as_millis() < 5000);
    }
}
