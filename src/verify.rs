//! Post-install verification.
//!
//! Each required component is re-imported inside the provisioned
//! environment. A check passes only when the literal success marker shows
//! up on stdout — a zero exit code with no marker counts as a failure,
//! since a misconfigured interpreter can exit cleanly without importing
//! anything. The accelerator sub-check can fail in any way whatsoever
//! without affecting overall success.

use crate::config::SetupConfig;
use crate::shell::{CommandSpec, ExecOptions, Executor};
use crate::ui::UserInterface;
use crate::venv::RuntimeEnvironment;

/// Marker the import check must print for the component to count.
const SUCCESS_MARKER: &str = "Success";

/// Placeholder when a component imports but won't report a version.
const UNKNOWN_VERSION: &str = "unknown version";

/// Required components: importable module name and human description.
pub const COMPONENTS: &[(&str, &str)] = &[
    ("numpy", "NumPy (array processing)"),
    ("cv2", "OpenCV (image processing)"),
    ("torch", "PyTorch (deep learning)"),
    ("easyocr", "EasyOCR (optical character recognition)"),
];

/// Result of one component's import check.
#[derive(Debug, Clone)]
pub struct ComponentStatus {
    /// Importable module name.
    pub module: String,
    /// Human description.
    pub description: String,
    /// Whether the import check passed.
    pub ok: bool,
    /// Reported version, when the check passed and the version query worked.
    pub version: Option<String>,
}

/// Aggregated verification result.
#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    /// Conjunction of all component import checks.
    pub success: bool,
    /// Whether hardware acceleration is active. Independent of `success`.
    pub accelerator_available: bool,
    /// Per-component detail, in check order.
    pub components: Vec<ComponentStatus>,
}

/// Re-imports each required component in the provisioned environment.
pub struct VerificationProbe<'a> {
    config: &'a SetupConfig,
    executor: &'a dyn Executor,
}

impl<'a> VerificationProbe<'a> {
    pub fn new(config: &'a SetupConfig, executor: &'a dyn Executor) -> Self {
        Self { config, executor }
    }

    /// Check every component, then the accelerator sub-check.
    pub fn verify(
        &self,
        env: &RuntimeEnvironment,
        ui: &mut dyn UserInterface,
    ) -> VerificationOutcome {
        ui.message("Checking installed packages...");

        let mut components = Vec::with_capacity(COMPONENTS.len());
        for (module, description) in COMPONENTS {
            components.push(self.check_component(env, module, description, ui));
        }
        let success = components.iter().all(|c| c.ok);

        let accelerator_available = self.check_accelerator(env, ui);

        if success {
            ui.success("All core dependencies are installed correctly");
        } else {
            ui.error("Some dependencies failed verification");
            ui.warning("Try installing the missing packages manually and re-run with --update");
        }

        VerificationOutcome {
            success,
            accelerator_available,
            components,
        }
    }

    /// Isolated import check plus a best-effort version query.
    fn check_component(
        &self,
        env: &RuntimeEnvironment,
        module: &str,
        description: &str,
        ui: &mut dyn UserInterface,
    ) -> ComponentStatus {
        ui.message(&format!("Verifying {}...", description));

        let check = format!("import {}; print('{}')", module, SUCCESS_MARKER);
        let imported = self
            .run_python(env, &check)
            .map(|stdout| stdout.contains(SUCCESS_MARKER))
            .unwrap_or(false);

        if !imported {
            ui.error(&format!("{} - failed to import", description));
            return ComponentStatus {
                module: module.to_string(),
                description: description.to_string(),
                ok: false,
                version: None,
            };
        }

        let version = self.query_version(env, module);
        if module == "torch" && version.contains("+cpu") {
            ui.warning(&format!(
                "{} - installed ({}) - CPU-only build",
                description, version
            ));
        } else {
            ui.success(&format!("{} - installed ({})", description, version));
        }

        ComponentStatus {
            module: module.to_string(),
            description: description.to_string(),
            ok: true,
            version: Some(version),
        }
    }

    /// Version query; any failure yields the unknown-version placeholder.
    fn query_version(&self, env: &RuntimeEnvironment, module: &str) -> String {
        let code = format!(
            "import {0}; print(getattr({0}, '__version__', '{1}'))",
            module, UNKNOWN_VERSION
        );
        match self.run_python(env, &code) {
            Some(stdout) => {
                let version = stdout.trim();
                if version.is_empty() {
                    UNKNOWN_VERSION.to_string()
                } else {
                    version.to_string()
                }
            }
            None => UNKNOWN_VERSION.to_string(),
        }
    }

    /// Accelerator sub-check. Every failure mode — launch error, non-zero
    /// exit, unexpected output — reads as "not available".
    fn check_accelerator(&self, env: &RuntimeEnvironment, ui: &mut dyn UserInterface) -> bool {
        ui.message("Checking GPU availability...");

        let available = self
            .run_python(env, "import torch; print(torch.cuda.is_available())")
            .map(|stdout| stdout.contains("True"))
            .unwrap_or(false);

        if !available {
            ui.warning("GPU acceleration not available; OCR will run in CPU mode");
            return false;
        }

        let device = self
            .run_python(env, "import torch; print(torch.cuda.get_device_name(0))")
            .map(|stdout| stdout.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "unknown device".to_string());
        ui.success(&format!("GPU acceleration available ({})", device));

        if let Some(cuda) = self.run_python(env, "import torch; print(torch.version.cuda)") {
            ui.message(&format!("PyTorch built against CUDA {}", cuda.trim()));
        }

        true
    }

    /// Run a one-liner in the environment's interpreter, returning stdout
    /// only on a clean exit.
    fn run_python(&self, env: &RuntimeEnvironment, code: &str) -> Option<String> {
        let spec = CommandSpec::new(env.python.to_string_lossy())
            .arg("-c")
            .arg(code);
        let options = ExecOptions {
            cwd: Some(self.config.project_root.clone()),
            stream_output: false,
        };
        match self.executor.run(&spec, &options) {
            Ok(result) if result.success => Some(result.stdout),
            Ok(result) => {
                tracing::debug!("probe '{}' exited {:?}", code, result.exit_code);
                None
            }
            Err(e) => {
                tracing::debug!("probe '{}' failed to launch: {}", code, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::{fail, ok, ScriptedExecutor};
    use crate::ui::MockUI;
    use crate::venv::EnvState;
    use std::path::PathBuf;

    fn test_env() -> RuntimeEnvironment {
        RuntimeEnvironment::at(PathBuf::from("/proj/venv"), EnvState::Fresh)
    }

    fn script_all_imports(exec: &mut ScriptedExecutor) {
        for (module, _) in COMPONENTS {
            exec.on(
                &format!("import {}; print('Success')", module),
                ok("Success\n"),
            );
        }
    }

    #[test]
    fn all_components_passing_yields_success() {
        let config = SetupConfig::at("/proj");
        let mut exec = ScriptedExecutor::new();
        script_all_imports(&mut exec);
        exec.on("__version__", ok("1.24.3\n"));
        exec.on("cuda.is_available", ok("False\n"));
        let mut ui = MockUI::new();

        let outcome = VerificationProbe::new(&config, &exec).verify(&test_env(), &mut ui);

        assert!(outcome.success);
        assert!(!outcome.accelerator_available);
        assert_eq!(outcome.components.len(), 4);
        assert!(outcome.components.iter().all(|c| c.ok));
    }

    #[test]
    fn clean_exit_without_marker_is_a_failure() {
        let config = SetupConfig::at("/proj");
        let mut exec = ScriptedExecutor::new();
        // easyocr exits 0 but prints nothing; the rule is registered first
        // so it shadows the blanket import script below.
        exec.on("import easyocr; print('Success')", ok(""));
        script_all_imports(&mut exec);
        let mut ui = MockUI::new();

        let outcome = VerificationProbe::new(&config, &exec).verify(&test_env(), &mut ui);

        assert!(!outcome.success);
        let easyocr = outcome
            .components
            .iter()
            .find(|c| c.module == "easyocr")
            .unwrap();
        assert!(!easyocr.ok);
        assert!(ui.has_error("EasyOCR"));
    }

    #[test]
    fn version_query_failure_is_non_fatal() {
        let config = SetupConfig::at("/proj");
        let mut exec = ScriptedExecutor::new();
        script_all_imports(&mut exec);
        exec.on("__version__", fail(1, "AttributeError"));
        let mut ui = MockUI::new();

        let outcome = VerificationProbe::new(&config, &exec).verify(&test_env(), &mut ui);

        assert!(outcome.success);
        let numpy = outcome
            .components
            .iter()
            .find(|c| c.module == "numpy")
            .unwrap();
        assert_eq!(numpy.version.as_deref(), Some("unknown version"));
    }

    #[test]
    fn accelerator_check_failure_does_not_affect_components() {
        let config = SetupConfig::at("/proj");
        let mut exec = ScriptedExecutor::new();
        script_all_imports(&mut exec);
        exec.on("cuda.is_available", fail(1, "ImportError: libcudart"));
        let mut ui = MockUI::new();

        let outcome = VerificationProbe::new(&config, &exec).verify(&test_env(), &mut ui);

        assert!(outcome.success);
        assert!(!outcome.accelerator_available);
        assert_eq!(outcome.components.iter().filter(|c| c.ok).count(), 4);
        assert!(ui.has_warning("GPU acceleration not available"));
    }

    #[test]
    fn accelerator_available_reports_device() {
        let config = SetupConfig::at("/proj");
        let mut exec = ScriptedExecutor::new();
        script_all_imports(&mut exec);
        exec.on("cuda.is_available", ok("True\n"));
        exec.on("get_device_name", ok("NVIDIA GeForce RTX 4070\n"));
        exec.on("torch.version.cuda", ok("12.6\n"));
        let mut ui = MockUI::new();

        let outcome = VerificationProbe::new(&config, &exec).verify(&test_env(), &mut ui);

        assert!(outcome.accelerator_available);
        assert!(ui.has_success("RTX 4070"));
    }

    #[test]
    fn cpu_build_version_is_surfaced_as_warning() {
        let config = SetupConfig::at("/proj");
        let mut exec = ScriptedExecutor::new();
        script_all_imports(&mut exec);
        exec.on("torch, '__version__'", ok("2.4.1+cpu\n"));
        exec.on("cuda.is_available", ok("False\n"));
        let mut ui = MockUI::new();

        let outcome = VerificationProbe::new(&config, &exec).verify(&test_env(), &mut ui);

        assert!(outcome.success);
        assert!(ui.has_warning("+cpu"));
    }

    #[test]
    fn import_launch_error_is_a_failure_not_a_panic() {
        let config = SetupConfig::at("/proj");
        let exec = ScriptedExecutor::new();
        // Default scripted result has no marker, so everything fails.
        let mut ui = MockUI::new();

        let outcome = VerificationProbe::new(&config, &exec).verify(&test_env(), &mut ui);

        assert!(!outcome.success);
        assert!(!outcome.accelerator_available);
    }
}
