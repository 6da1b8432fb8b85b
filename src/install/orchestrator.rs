//! Dependency installation orchestration.
//!
//! Three stages, strictly in order: bring pip itself up to date, install
//! the filtered manifest (one bulk invocation, falling back to per-package
//! installs so a single bad entry cannot sink the run), then install the
//! accelerator-dependent PyTorch pair through the decision-table fallback
//! chain. Only the terminal CPU-only attempt failing is fatal.

use crate::config::SetupConfig;
use crate::error::{FlightdeckError, Result};
use crate::gpu::Capability;
use crate::install::manifest::{FilteredManifest, Manifest, PackageSpec, MANIFEST_FILE};
use crate::install::profile::{index_url, select_plan, CPU_TAG};
use crate::install::report::{InstallationReport, PackageStatus};
use crate::shell::{CommandSpec, ExecOptions, ExecResult, Executor};
use crate::ui::UserInterface;
use crate::venv::{scratch_dir, RuntimeEnvironment};

/// System packages installed through apt on Linux hosts.
const LINUX_SYSTEM_PACKAGES: &[&str] = &["python3-tk"];

/// Drives the install phase against a resolved environment.
pub struct InstallOrchestrator<'a> {
    config: &'a SetupConfig,
    executor: &'a dyn Executor,
}

impl<'a> InstallOrchestrator<'a> {
    pub fn new(config: &'a SetupConfig, executor: &'a dyn Executor) -> Self {
        Self { config, executor }
    }

    /// Install everything the manifest and capability call for.
    pub fn install(
        &self,
        env: &RuntimeEnvironment,
        capability: &Capability,
        ui: &mut dyn UserInterface,
    ) -> Result<InstallationReport> {
        if !env.executables_exist() {
            return Err(FlightdeckError::EnvMissing {
                path: env.root.clone(),
                message: "interpreter or pip not found; recreate the environment".into(),
            });
        }

        let mut report = InstallationReport::new();

        self.upgrade_pip(env, ui)?;

        if cfg!(target_os = "linux") {
            self.install_system_packages(ui);
        }

        let manifest = Manifest::read(&self.config.project_root.join(MANIFEST_FILE))?;
        let filtered = manifest.filter_for_install(cfg!(windows));

        for package in &filtered.platform_skipped {
            ui.message(&format!("Skipping Windows-only package: {}", package.name));
            report.record(
                &package.name,
                PackageStatus::Skipped {
                    reason: "not applicable on this platform".into(),
                },
            );
        }

        self.install_manifest(env, &filtered, ui, &mut report)?;

        let installed_tag = self.install_torch(env, capability, ui, &mut report)?;
        report.accelerator_available = installed_tag != CPU_TAG;

        report.overall = !report.has_failures();
        if report.overall {
            ui.success("All dependencies installed successfully");
        } else {
            ui.error("Some dependencies failed to install");
        }

        Ok(report)
    }

    fn exec_options(&self) -> ExecOptions {
        ExecOptions {
            cwd: Some(self.config.project_root.clone()),
            stream_output: self.config.debug,
        }
    }

    /// Upgrade pip inside the environment. Failure is fatal — everything
    /// after this depends on a working installer.
    fn upgrade_pip(&self, env: &RuntimeEnvironment, ui: &mut dyn UserInterface) -> Result<()> {
        ui.message("Upgrading pip in virtual environment...");
        let spec = CommandSpec::new(env.python.to_string_lossy()).args([
            "-m",
            "pip",
            "install",
            "--upgrade",
            "pip",
        ]);
        let result = self.executor.run(&spec, &self.exec_options())?;
        if !result.success {
            return Err(FlightdeckError::InstallFailed {
                package: "pip".into(),
                message: failure_reason(&result),
            });
        }
        ui.success("Upgraded pip");
        Ok(())
    }

    /// Best-effort apt installs for system-level prerequisites.
    fn install_system_packages(&self, ui: &mut dyn UserInterface) {
        for package in LINUX_SYSTEM_PACKAGES {
            ui.message(&format!("Installing system package {}...", package));
            let spec = CommandSpec::new("sudo").args(["apt-get", "install", "-y", package]);
            let installed = self
                .executor
                .run(&spec, &self.exec_options())
                .map(|r| r.success)
                .unwrap_or(false);
            if installed {
                ui.success(&format!("Installed {}", package));
            } else {
                ui.warning(&format!(
                    "Could not install {0}; you may need to run 'sudo apt-get install {0}' manually",
                    package
                ));
            }
        }
    }

    /// Bulk install of the derived manifest, with per-package fallback.
    fn install_manifest(
        &self,
        env: &RuntimeEnvironment,
        filtered: &FilteredManifest,
        ui: &mut dyn UserInterface,
        report: &mut InstallationReport,
    ) -> Result<()> {
        let derived = filtered.write_derived(&scratch_dir(&self.config.project_root))?;

        if filtered.install.is_empty() {
            return Ok(());
        }

        let count = filtered.install.len();
        let mut spinner = ui.start_spinner(&format!("Installing {} packages", count));
        let spec = CommandSpec::new(env.pip.to_string_lossy())
            .args(["install", "-r"])
            .arg(derived.to_string_lossy());

        let bulk = self.executor.run(&spec, &self.exec_options())?;
        if bulk.success {
            spinner.finish_success(&format!("Installed {} packages", count));
            for package in &filtered.install {
                report.record(
                    &package.name,
                    PackageStatus::Installed {
                        via: "bulk".into(),
                    },
                );
            }
            return Ok(());
        }

        spinner.finish_warning("Bulk install failed; installing packages individually");
        tracing::debug!("bulk install failed: {}", failure_reason(&bulk));

        for package in &filtered.install {
            self.install_single(env, package, ui, report);
        }
        Ok(())
    }

    /// One package at a time; failures are recorded, not propagated.
    fn install_single(
        &self,
        env: &RuntimeEnvironment,
        package: &PackageSpec,
        ui: &mut dyn UserInterface,
        report: &mut InstallationReport,
    ) {
        ui.message(&format!("Installing {}...", package.name));
        let spec = CommandSpec::new(env.pip.to_string_lossy())
            .arg("install")
            .arg(package.requirement());

        match self.executor.run(&spec, &self.exec_options()) {
            Ok(result) if result.success => {
                ui.success(&format!("Installed {}", package.name));
                report.record(
                    &package.name,
                    PackageStatus::Installed {
                        via: "individual".into(),
                    },
                );
            }
            Ok(result) => {
                ui.error(&format!("Failed to install {}", package.name));
                report.record(
                    &package.name,
                    PackageStatus::Failed {
                        reason: failure_reason(&result),
                    },
                );
            }
            Err(e) => {
                ui.error(&format!("Failed to install {}", package.name));
                report.record(
                    &package.name,
                    PackageStatus::Failed {
                        reason: e.to_string(),
                    },
                );
            }
        }
    }

    /// Walk the build-tag fallback chain for the PyTorch pair.
    ///
    /// Returns the tag that ultimately installed. Only the terminal
    /// CPU-only attempt failing is fatal.
    fn install_torch(
        &self,
        env: &RuntimeEnvironment,
        capability: &Capability,
        ui: &mut dyn UserInterface,
        report: &mut InstallationReport,
    ) -> Result<&'static str> {
        if self.config.force_cpu {
            ui.warning("Forcing CPU-only PyTorch installation");
        }

        let plan = select_plan(capability, self.config.force_cpu);

        if let Some(version) = capability.normalized() {
            if !self.config.force_cpu && plan.tags[0] != CPU_TAG {
                ui.message(&format!(
                    "Installing PyTorch build {} for CUDA {}",
                    plan.tags[0], version
                ));
            }
        }

        let mut tags = plan.tags.iter().peekable();
        while let Some(&tag) = tags.next() {
            let is_last = tags.peek().is_none();
            let label = if tag == CPU_TAG {
                "CPU-only PyTorch".to_string()
            } else {
                format!("PyTorch ({})", tag)
            };

            let mut spinner =
                ui.start_spinner(&format!("Installing {} (this may take a while)", label));
            let spec = CommandSpec::new(env.pip.to_string_lossy())
                .args(["install", "torch", "torchvision", "--index-url"])
                .arg(index_url(tag));

            let outcome = self.executor.run(&spec, &self.exec_options());
            match outcome {
                Ok(result) if result.success => {
                    spinner.finish_success(&format!("Installed {}", label));
                    report.record("torch", PackageStatus::Installed { via: tag.into() });
                    if tag == CPU_TAG && capability.normalized().is_some() && !self.config.force_cpu
                    {
                        ui.warning("Accelerator support unavailable; CPU-only build installed");
                    }
                    return Ok(tag);
                }
                Ok(result) => {
                    spinner.finish_error(&format!("{} installation failed", label));
                    if is_last {
                        return Err(FlightdeckError::InstallFailed {
                            package: "torch".into(),
                            message: failure_reason(&result),
                        });
                    }
                    ui.warning("Falling back to CPU-only PyTorch installation");
                }
                Err(e) => {
                    spinner.finish_error(&format!("{} installation failed", label));
                    if is_last {
                        return Err(e);
                    }
                    ui.warning("Falling back to CPU-only PyTorch installation");
                }
            }
        }

        Err(FlightdeckError::InstallFailed {
            package: "torch".into(),
            message: "no install profile available".into(),
        })
    }
}

/// Compact failure description from a command result.
fn failure_reason(result: &ExecResult) -> String {
    let last_line = result
        .stderr
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty());
    match last_line {
        Some(line) => line.trim().to_string(),
        None => format!("exit code {:?}", result.exit_code),
    }
}
