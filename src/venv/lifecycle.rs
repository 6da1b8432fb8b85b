//! Virtual environment lifecycle management.
//!
//! A single named directory (`venv`) moves through an explicit state
//! machine: it is created when absent, kept or recreated when present, and
//! removal failures escalate through a bounded retry and a forced-removal
//! tier. Every path ends in a usable environment or an explicit error —
//! never a half-removed directory.
//!
//! Filesystem primitives are injected through [`LifecycleContext`] so each
//! state transition can be exercised in tests without touching a real
//! environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::SetupConfig;
use crate::error::{FlightdeckError, Result};
use crate::shell::{CommandSpec, ExecOptions, Executor};
use crate::ui::{Prompt, UserInterface};

/// Name of the virtual environment directory under the project root.
pub const VENV_DIR: &str = "venv";

/// Delay before the single interactive removal retry.
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// How an existing environment ended up in the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvState {
    /// Newly created this run.
    Fresh,
    /// Pre-existing environment was kept.
    Kept,
}

/// A resolved, usable virtual environment.
#[derive(Debug, Clone)]
pub struct RuntimeEnvironment {
    /// Root of the environment directory.
    pub root: PathBuf,

    /// Whether the environment was created this run or kept.
    pub state: EnvState,

    /// Interpreter inside the environment.
    pub python: PathBuf,

    /// Package installer inside the environment.
    pub pip: PathBuf,
}

impl RuntimeEnvironment {
    /// Describe an environment rooted at `root`, with platform-correct
    /// executable locations.
    pub fn at(root: PathBuf, state: EnvState) -> Self {
        let (python, pip) = if cfg!(windows) {
            (
                root.join("Scripts").join("python.exe"),
                root.join("Scripts").join("pip.exe"),
            )
        } else {
            (root.join("bin").join("python"), root.join("bin").join("pip"))
        };
        Self {
            root,
            state,
            python,
            pip,
        }
    }

    /// Whether the interpreter and installer are actually present.
    pub fn executables_exist(&self) -> bool {
        self.python.exists() && self.pip.exists()
    }
}

/// States of the lifecycle machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No environment directory; next step is creation.
    Absent,
    /// Removal decided; first standard attempt pending.
    Removing,
    /// Standard removal hit a locked resource; one retry offered.
    RemovingRetry,
    /// Escalated to the platform's forced removal strategy.
    RemovingForced,
    /// Environment created this run (terminal).
    PresentFresh,
    /// Pre-existing environment kept (terminal).
    PresentKept,
    /// No usable environment can be produced (terminal).
    Failed,
}

/// Injectable filesystem primitives.
pub struct LifecycleContext<'a> {
    /// Standard recursive removal.
    pub remove_dir: &'a dyn Fn(&Path) -> std::io::Result<()>,

    /// Existence check for the environment directory.
    pub dir_exists: &'a dyn Fn(&Path) -> bool,

    /// Delay between removal attempts.
    pub sleep: &'a dyn Fn(Duration),
}

/// Build the default `LifecycleContext` for production use.
pub fn default_context() -> LifecycleContext<'static> {
    LifecycleContext {
        remove_dir: &|path| std::fs::remove_dir_all(path),
        dir_exists: &|path| path.exists(),
        sleep: &|duration| std::thread::sleep(duration),
    }
}

/// What to do with an existing environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Keep,
    Recreate,
}

/// Drives the environment directory to a terminal state.
pub struct LifecycleManager<'a> {
    config: &'a SetupConfig,
    executor: &'a dyn Executor,
}

impl<'a> LifecycleManager<'a> {
    pub fn new(config: &'a SetupConfig, executor: &'a dyn Executor) -> Self {
        Self { config, executor }
    }

    /// Root of the environment directory for this configuration.
    pub fn env_root(&self) -> PathBuf {
        self.config.project_root.join(VENV_DIR)
    }

    /// Resolve the environment to a usable state.
    ///
    /// Returns the environment on any successful terminal state; removal
    /// and creation failures surface as [`FlightdeckError::EnvRemovalFailed`]
    /// and [`FlightdeckError::EnvCreationFailed`].
    pub fn ensure(
        &self,
        ui: &mut dyn UserInterface,
        ctx: &LifecycleContext<'_>,
    ) -> Result<RuntimeEnvironment> {
        let root = self.env_root();

        let mut state = if (ctx.dir_exists)(&root) {
            ui.warning(&format!(
                "Virtual environment already exists at '{}'",
                root.display()
            ));
            match self.decide_existing(ui)? {
                Decision::Keep => LifecycleState::PresentKept,
                Decision::Recreate => LifecycleState::Removing,
            }
        } else {
            LifecycleState::Absent
        };

        loop {
            state = match state {
                LifecycleState::Absent => self.create(ui)?,
                LifecycleState::Removing => self.remove_standard(ui, ctx, &root),
                LifecycleState::RemovingRetry => self.remove_retry(ui, ctx, &root)?,
                LifecycleState::RemovingForced => self.remove_forced(ui, ctx, &root)?,
                LifecycleState::PresentFresh => {
                    return Ok(RuntimeEnvironment::at(root, EnvState::Fresh));
                }
                LifecycleState::PresentKept => {
                    ui.message("Using existing virtual environment");
                    return Ok(RuntimeEnvironment::at(root, EnvState::Kept));
                }
                LifecycleState::Failed => {
                    return Err(FlightdeckError::EnvRemovalFailed {
                        path: root,
                        message: "all removal strategies exhausted; delete the directory manually"
                            .into(),
                    });
                }
            };
        }
    }

    /// Keep-or-recreate decision for an existing environment.
    fn decide_existing(&self, ui: &mut dyn UserInterface) -> Result<Decision> {
        if self.config.unattended {
            if self.config.recreate {
                ui.warning("Unattended mode: recreating virtual environment");
                return Ok(Decision::Recreate);
            }
            // `keep` explicit or implied: unattended default favors
            // stability over freshness.
            ui.warning("Unattended mode: using existing virtual environment");
            return Ok(Decision::Keep);
        }

        if self.config.recreate {
            return Ok(Decision::Recreate);
        }

        let prompt = Prompt::confirm("recreate_env", "Do you want to recreate it?", false);
        if ui.confirm(&prompt)? {
            Ok(Decision::Recreate)
        } else {
            Ok(Decision::Keep)
        }
    }

    /// First, standard removal attempt.
    fn remove_standard(
        &self,
        ui: &mut dyn UserInterface,
        ctx: &LifecycleContext<'_>,
        root: &Path,
    ) -> LifecycleState {
        ui.message("Removing existing virtual environment...");
        match (ctx.remove_dir)(root) {
            Ok(()) => LifecycleState::Absent,
            Err(e) if is_locked(&e) && !self.config.unattended => {
                ui.warning("The environment directory is held by another process.");
                ui.warning("Close terminals, editors, and Python processes using it.");
                LifecycleState::RemovingRetry
            }
            Err(e) => {
                tracing::debug!("standard removal failed: {}", e);
                LifecycleState::RemovingForced
            }
        }
    }

    /// One interactive retry after a short delay.
    fn remove_retry(
        &self,
        ui: &mut dyn UserInterface,
        ctx: &LifecycleContext<'_>,
        root: &Path,
    ) -> Result<LifecycleState> {
        let prompt = Prompt::confirm(
            "retry_removal",
            "Try again after closing applications?",
            true,
        );
        if !ui.confirm(&prompt)? {
            ui.warning("Keeping existing virtual environment");
            return Ok(LifecycleState::PresentKept);
        }

        (ctx.sleep)(RETRY_DELAY);
        match (ctx.remove_dir)(root) {
            Ok(()) => {
                ui.success("Removed virtual environment on second attempt");
                Ok(LifecycleState::Absent)
            }
            Err(e) => {
                tracing::debug!("retry removal failed: {}", e);
                ui.warning("Removal failed again, trying forced removal...");
                Ok(LifecycleState::RemovingForced)
            }
        }
    }

    /// Platform-specific forced removal, bypassing the standard primitive.
    fn remove_forced(
        &self,
        ui: &mut dyn UserInterface,
        ctx: &LifecycleContext<'_>,
        root: &Path,
    ) -> Result<LifecycleState> {
        let spec = force_remove_spec(root);
        let options = ExecOptions {
            cwd: Some(self.config.project_root.clone()),
            stream_output: self.config.debug,
        };
        // Exit status is advisory; presence of the directory decides.
        if let Err(e) = self.executor.run(&spec, &options) {
            tracing::debug!("forced removal launch failed: {}", e);
        }

        if !(ctx.dir_exists)(root) {
            ui.success("Removed virtual environment using force method");
            return Ok(LifecycleState::Absent);
        }

        ui.error("Could not remove the virtual environment");
        Ok(after_forced_failure(
            self.config.unattended,
            self.config.recreate,
        ))
    }

    /// Create the environment with the host interpreter.
    fn create(&self, ui: &mut dyn UserInterface) -> Result<LifecycleState> {
        ui.message("Creating new virtual environment...");

        let python = host_python();
        let spec = CommandSpec::new(python).args(["-m", "venv", VENV_DIR]);
        let options = ExecOptions {
            cwd: Some(self.config.project_root.clone()),
            stream_output: self.config.debug,
        };

        let result = self.executor.run(&spec, &options)?;
        if !result.success {
            return Err(FlightdeckError::EnvCreationFailed {
                message: if result.stderr.trim().is_empty() {
                    format!("exit code {:?}", result.exit_code)
                } else {
                    result.stderr.trim().to_string()
                },
            });
        }

        ui.success(&format!("Created virtual environment in '{}'", VENV_DIR));
        Ok(LifecycleState::PresentFresh)
    }
}

/// Terminal state after forced removal also failed.
///
/// Unattended mode with an explicit recreate intent must fail (the caller
/// asked for a fresh environment and cannot answer questions); unattended
/// mode without that intent degrades to keeping the stale environment;
/// interactive mode fails so the user can delete the directory manually.
fn after_forced_failure(unattended: bool, recreate: bool) -> LifecycleState {
    if unattended && !recreate {
        LifecycleState::PresentKept
    } else {
        LifecycleState::Failed
    }
}

/// Whether a removal error indicates a locked resource.
fn is_locked(e: &std::io::Error) -> bool {
    e.kind() == std::io::ErrorKind::PermissionDenied
        || e.to_string().contains("Access is denied")
}

/// Forced-removal command for the current platform.
fn force_remove_spec(root: &Path) -> CommandSpec {
    if cfg!(windows) {
        CommandSpec::new("cmd")
            .args(["/c", "rmdir", "/s", "/q"])
            .arg(root.to_string_lossy())
    } else {
        CommandSpec::new("rm").arg("-rf").arg(root.to_string_lossy())
    }
}

/// Host interpreter used for `-m venv`, resolved by iterating PATH
/// entries rather than shelling out to `which`.
fn host_python() -> String {
    let candidates: &[&str] = if cfg!(windows) {
        &["python"]
    } else {
        &["python3", "python"]
    };

    let path_dirs: Vec<PathBuf> = std::env::var_os("PATH")
        .map(|path| std::env::split_paths(&path).collect())
        .unwrap_or_default();

    for candidate in candidates {
        for dir in &path_dirs {
            if dir.join(candidate).is_file() {
                return (*candidate).to_string();
            }
        }
    }

    candidates[0].to_string()
}
