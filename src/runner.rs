//! Provisioning workflow orchestration.
//!
//! Fully sequential: environment lifecycle resolves before anything touches
//! the environment, capability detection completes before the install
//! profile is selected, and every install finishes before verification
//! begins. Fatal conditions surface as errors; everything else flows
//! through as data and lands in the final summary.

use crate::config::SetupConfig;
use crate::error::{FlightdeckError, Result};
use crate::gpu::{install_cuda_toolkit, install_nvidia_drivers, Capability, CapabilityDetector};
use crate::install::InstallOrchestrator;
use crate::shell::Executor;
use crate::ui::{Prompt, UserInterface};
use crate::venv::{
    create_layout, default_context, logs_dir, EnvState, LifecycleManager, RuntimeEnvironment,
    VENV_DIR,
};
use crate::verify::VerificationProbe;

/// Final state of a provisioning run.
#[derive(Debug, Clone, Default)]
pub struct ProvisionSummary {
    /// A usable environment exists.
    pub env_ready: bool,

    /// Install phase reported overall success (possibly via fallbacks).
    pub deps_installed: bool,

    /// Every component passed its import check.
    pub verified: bool,

    /// Hardware acceleration is active.
    pub accelerator_available: bool,

    /// The user paused the run rather than continue CPU-only.
    pub aborted: bool,
}

impl ProvisionSummary {
    /// Full or degraded success: everything installed and verified.
    pub fn is_success(&self) -> bool {
        self.env_ready && self.deps_installed && self.verified
    }
}

/// Run the provisioning workflow.
pub fn run_setup(
    config: &SetupConfig,
    ui: &mut dyn UserInterface,
    executor: &dyn Executor,
) -> Result<ProvisionSummary> {
    if config.update {
        return run_update(config, ui, executor);
    }

    let total = 5;
    let mut summary = ProvisionSummary::default();

    ui.step(1, total, "Creating Python virtual environment");
    let manager = LifecycleManager::new(config, executor);
    let env = manager.ensure(ui, &default_context())?;
    summary.env_ready = true;

    ui.step(2, total, "Creating required directories");
    create_layout(&config.project_root, ui);

    ui.step(3, total, "Checking CUDA version for PyTorch installation");
    let detector = CapabilityDetector::new(executor);
    let mut capability = detector.detect(ui);

    if capability.is_absent() && !config.force_cpu {
        match offer_gpu_assist(config, ui, executor)? {
            AssistOutcome::Detected(found) => capability = found,
            AssistOutcome::StillAbsent { assist_attempted } => {
                if assist_attempted && !config.unattended {
                    let prompt =
                        Prompt::confirm("continue_cpu_only", "Continue with CPU-only installation?", true);
                    if !ui.confirm(&prompt)? {
                        ui.warning(
                            "Setup paused. Ensure CUDA is properly installed and run this again.",
                        );
                        summary.aborted = true;
                        return Ok(summary);
                    }
                }
            }
        }
    }

    ui.step(4, total, "Installing dependencies into virtual environment");
    let orchestrator = InstallOrchestrator::new(config, executor);
    let mut report = orchestrator.install(&env, &capability, ui)?;
    summary.deps_installed = report.overall;

    ui.step(5, total, "Verifying installations");
    finish_with_verification(config, executor, &env, &mut report, &mut summary, ui);

    print_summary(ui, &summary);
    Ok(summary)
}

/// `--update`: keep the environment, refresh dependencies, re-verify.
fn run_update(
    config: &SetupConfig,
    ui: &mut dyn UserInterface,
    executor: &dyn Executor,
) -> Result<ProvisionSummary> {
    let total = 3;
    let mut summary = ProvisionSummary::default();

    let root = config.project_root.join(VENV_DIR);
    if !root.is_dir() {
        return Err(FlightdeckError::EnvMissing {
            path: root,
            message: "nothing to update; run provisioning first".into(),
        });
    }
    let env = RuntimeEnvironment::at(root, EnvState::Kept);
    summary.env_ready = true;

    ui.step(1, total, "Checking CUDA version for PyTorch installation");
    let capability = CapabilityDetector::new(executor).detect(ui);

    ui.step(2, total, "Refreshing dependencies");
    let orchestrator = InstallOrchestrator::new(config, executor);
    let mut report = orchestrator.install(&env, &capability, ui)?;
    summary.deps_installed = report.overall;

    ui.step(3, total, "Verifying installations");
    finish_with_verification(config, executor, &env, &mut report, &mut summary, ui);

    print_summary(ui, &summary);
    Ok(summary)
}

/// Outcome of the optional GPU setup offer.
enum AssistOutcome {
    Detected(Capability),
    StillAbsent { assist_attempted: bool },
}

/// Offer driver/toolkit setup when nothing was detected, then re-probe.
fn offer_gpu_assist(
    config: &SetupConfig,
    ui: &mut dyn UserInterface,
    executor: &dyn Executor,
) -> Result<AssistOutcome> {
    ui.warning("CUDA not detected. GPU acceleration requires NVIDIA drivers and the CUDA toolkit.");

    let wants_assist = if config.unattended {
        if config.setup_gpu {
            ui.warning("Unattended mode: attempting GPU setup");
        } else {
            ui.warning("Unattended mode: skipping GPU setup");
        }
        config.setup_gpu
    } else {
        let prompt = Prompt::confirm(
            "setup_gpu",
            "Would you like guidance on setting up GPU support?",
            false,
        );
        ui.confirm(&prompt)?
    };

    if !wants_assist {
        return Ok(AssistOutcome::StillAbsent {
            assist_attempted: false,
        });
    }

    install_nvidia_drivers(config, ui, executor);
    install_cuda_toolkit(config, ui, executor);

    ui.message("Checking for CUDA again after installation...");
    let capability = CapabilityDetector::new(executor).detect(ui);
    if capability.is_absent() {
        ui.warning("CUDA still not detected. Continuing with CPU-only installation.");
        Ok(AssistOutcome::StillAbsent {
            assist_attempted: true,
        })
    } else {
        Ok(AssistOutcome::Detected(capability))
    }
}

/// Verification pass plus report persistence.
fn finish_with_verification(
    config: &SetupConfig,
    executor: &dyn Executor,
    env: &RuntimeEnvironment,
    report: &mut crate::install::InstallationReport,
    summary: &mut ProvisionSummary,
    ui: &mut dyn UserInterface,
) {
    let probe = VerificationProbe::new(config, executor);
    let outcome = probe.verify(env, ui);
    summary.verified = outcome.success;
    summary.accelerator_available = outcome.accelerator_available;

    // Verification is ground truth for acceleration.
    report.accelerator_available = outcome.accelerator_available;
    match report.write_json(&logs_dir(&config.project_root)) {
        Ok(path) => tracing::debug!("report written to {}", path.display()),
        Err(e) => ui.warning(&format!("Could not write provisioning report: {}", e)),
    }
}

/// Final human-readable summary.
fn print_summary(ui: &mut dyn UserInterface, summary: &ProvisionSummary) {
    ui.message("");
    ui.message("Setup summary:");
    status_line(ui, "Virtual environment", summary.env_ready);
    status_line(ui, "Dependencies", summary.deps_installed);
    status_line(ui, "Verification", summary.verified);
    if summary.accelerator_available {
        ui.success("GPU acceleration: available");
    } else {
        ui.warning("GPU acceleration: not available (CPU mode)");
    }

    if summary.is_success() {
        let activate = if cfg!(windows) {
            r"venv\Scripts\activate"
        } else {
            "source venv/bin/activate"
        };
        ui.message("");
        ui.success("Setup complete!");
        ui.message(&format!(
            "Activate the environment with '{}' and drop recordings into 'flight_recordings/'",
            activate
        ));
    } else if !summary.aborted {
        ui.warning("Some steps did not complete. Check the errors above and re-run.");
    }
}

fn status_line(ui: &mut dyn UserInterface, label: &str, ok: bool) {
    if ok {
        ui.success(label);
    } else {
        ui.error(label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::MANIFEST_FILE;
    use crate::shell::{fail, ok, ScriptedExecutor};
    use crate::ui::MockUI;
    use crate::venv::EnvState;
    use tempfile::TempDir;

    /// Project with an existing fake environment so the scripted executor
    /// never needs to materialize files.
    fn provisioned_project() -> (TempDir, SetupConfig) {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(MANIFEST_FILE), "numpy==1.24.3\n").unwrap();

        let env = RuntimeEnvironment::at(temp.path().join(VENV_DIR), EnvState::Kept);
        std::fs::create_dir_all(env.python.parent().unwrap()).unwrap();
        std::fs::write(&env.python, b"").unwrap();
        std::fs::write(&env.pip, b"").unwrap();

        let mut config = SetupConfig::at(temp.path());
        config.unattended = true;
        config.keep = true;
        (temp, config)
    }

    fn script_verification(exec: &mut ScriptedExecutor) {
        for (module, _) in crate::verify::COMPONENTS {
            exec.on(
                &format!("import {}; print('Success')", module),
                ok("Success\n"),
            );
        }
    }

    #[test]
    fn full_run_on_existing_environment() {
        let (temp, config) = provisioned_project();
        let mut exec = ScriptedExecutor::new();
        exec.on("nvidia-smi", fail(127, "not found"));
        script_verification(&mut exec);
        let mut ui = MockUI::new();

        let summary = run_setup(&config, &mut ui, &exec).unwrap();

        assert!(summary.is_success());
        assert!(!summary.accelerator_available);
        // Kept environment: no creation, no removal.
        assert_eq!(exec.calls_matching("-m venv"), 0);
        // Report landed in logs/.
        assert!(temp.path().join("logs/provision-report.json").is_file());
        // Runtime layout exists.
        assert!(temp.path().join("flight_recordings").is_dir());
    }

    #[test]
    fn update_mode_skips_provisioning() {
        let (_temp, mut config) = provisioned_project();
        config.update = true;
        let mut exec = ScriptedExecutor::new();
        exec.on("nvidia-smi", fail(127, "not found"));
        script_verification(&mut exec);
        let mut ui = MockUI::new();

        let summary = run_setup(&config, &mut ui, &exec).unwrap();

        assert!(summary.is_success());
        assert_eq!(exec.calls_matching("-m venv"), 0);
        assert_eq!(exec.calls_matching("install -r"), 1);
    }

    #[test]
    fn update_mode_without_environment_is_fatal() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(MANIFEST_FILE), "numpy\n").unwrap();
        let mut config = SetupConfig::at(temp.path());
        config.update = true;
        let exec = ScriptedExecutor::new();
        let mut ui = MockUI::new();

        let err = run_setup(&config, &mut ui, &exec).unwrap_err();
        assert!(matches!(err, FlightdeckError::EnvMissing { .. }));
    }

    #[test]
    fn declined_cpu_only_continue_pauses_the_run() {
        let (_temp, mut config) = provisioned_project();
        config.unattended = false;
        let mut exec = ScriptedExecutor::new();
        exec.on("nvidia-smi", fail(127, "not found"));
        let mut ui = MockUI::new();
        ui.set_confirm_response("recreate_env", false);
        ui.set_confirm_response("setup_gpu", true);
        ui.set_confirm_response("continue_cpu_only", false);

        let summary = run_setup(&config, &mut ui, &exec).unwrap();

        assert!(summary.aborted);
        assert!(!summary.is_success());
        // The run stopped before any install.
        assert_eq!(exec.calls_matching("pip"), 0);
        assert!(ui.has_warning("Setup paused"));
    }

    #[test]
    fn unattended_run_never_prompts() {
        let (_temp, config) = provisioned_project();
        let mut exec = ScriptedExecutor::new();
        exec.on("nvidia-smi", fail(127, "not found"));
        script_verification(&mut exec);
        let mut ui = MockUI::new();

        run_setup(&config, &mut ui, &exec).unwrap();

        assert!(ui.confirms_shown().is_empty());
    }

    #[test]
    fn detected_capability_skips_gpu_assist() {
        let (_temp, mut config) = provisioned_project();
        config.unattended = false;
        let mut exec = ScriptedExecutor::new();
        exec.on("nvidia-smi", ok("CUDA Version: 12.6\n"));
        script_verification(&mut exec);
        let mut ui = MockUI::new();
        ui.set_confirm_response("recreate_env", false);

        let summary = run_setup(&config, &mut ui, &exec).unwrap();

        assert!(summary.is_success());
        assert!(!ui.confirms_shown().contains(&"setup_gpu".to_string()));
        assert_eq!(exec.calls_matching("whl/cu126"), 1);
    }
}
