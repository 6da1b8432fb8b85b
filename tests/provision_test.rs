//! End-to-end provisioning scenarios against a scripted executor.

use flightdeck::config::SetupConfig;
use flightdeck::gpu::Capability;
use flightdeck::install::{InstallOrchestrator, InstallationReport, PackageStatus, MANIFEST_FILE};
use flightdeck::runner::run_setup;
use flightdeck::shell::{fail, ok, ScriptedExecutor};
use flightdeck::ui::MockUI;
use flightdeck::venv::{EnvState, RuntimeEnvironment, VENV_DIR};
use flightdeck::verify::COMPONENTS;
use tempfile::TempDir;

/// Project with a pre-existing fake environment and the given manifest.
fn project(manifest: &str) -> (TempDir, SetupConfig) {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join(MANIFEST_FILE), manifest).unwrap();

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
    for (module, _) in COMPONENTS {
        exec.on(
            &format!("import {}; print('Success')", module),
            ok("Success\n"),
        );
    }
}

#[test]
fn cpu_only_end_to_end() {
    // Manifest with a pin, a platform-restricted package, and the
    // separately-handled accelerator package.
    let (temp, config) = project("numpy==1.24.3\npywin32\ntorch\n");
    let mut exec = ScriptedExecutor::new();
    exec.on("nvidia-smi", fail(127, "command not found"));
    script_verification(&mut exec);
    exec.on("cuda.is_available", ok("False\n"));
    let mut ui = MockUI::new();

    let summary = run_setup(&config, &mut ui, &exec).unwrap();

    assert!(summary.is_success());
    assert!(!summary.accelerator_available);

    // The derived manifest omits the restricted and separately-handled
    // entries on a non-Windows platform.
    let derived =
        std::fs::read_to_string(temp.path().join(".tmp/requirements-derived.txt")).unwrap();
    assert!(derived.contains("numpy==1.24.3"));
    assert!(!derived.contains("torch"));
    if !cfg!(windows) {
        assert!(!derived.contains("pywin32"));
    }

    // Accelerator package installed through the CPU-only profile; no
    // GPU-tagged index was ever touched.
    assert_eq!(exec.calls_matching("whl/cpu"), 1);
    assert_eq!(exec.calls_matching("whl/cu1"), 0);

    // Report persisted with the per-dependency mapping.
    let report: InstallationReport = serde_json::from_str(
        &std::fs::read_to_string(temp.path().join("logs/provision-report.json")).unwrap(),
    )
    .unwrap();
    assert!(report.overall);
    assert!(!report.accelerator_available);
    assert_eq!(
        report.packages["torch"],
        PackageStatus::Installed { via: "cpu".into() }
    );
}

#[test]
fn unsupported_capability_falls_back_through_nearest_tag() {
    let (_temp, config) = project("numpy\n");
    let mut exec = ScriptedExecutor::new();
    // 12.7 is not in the compatibility table; the nearest known 12.x tag
    // is attempted before CPU-only.
    exec.on("nvidia-smi", ok("CUDA Version: 12.7\n"));
    exec.on("whl/cu126", fail(1, "404: no such wheel"));
    script_verification(&mut exec);
    let mut ui = MockUI::new();

    let summary = run_setup(&config, &mut ui, &exec).unwrap();

    assert!(summary.is_success());
    assert_eq!(exec.calls_matching("whl/cu126"), 1);
    assert_eq!(exec.calls_matching("whl/cpu"), 1);
    assert!(ui.has_warning("Falling back to CPU-only PyTorch installation"));
}

#[test]
fn detected_capability_installs_mapped_tag_only() {
    let (_temp, config) = project("numpy\n");
    let mut exec = ScriptedExecutor::new();
    exec.on("nvidia-smi", ok("CUDA Version: 12.4\n"));
    script_verification(&mut exec);
    exec.on("cuda.is_available", ok("True\n"));
    exec.on("get_device_name", ok("NVIDIA GeForce RTX 4070\n"));
    let mut ui = MockUI::new();

    let summary = run_setup(&config, &mut ui, &exec).unwrap();

    assert!(summary.is_success());
    assert!(summary.accelerator_available);
    assert_eq!(exec.calls_matching("whl/cu124"), 1);
    assert_eq!(exec.calls_matching("whl/cpu"), 0);
}

#[test]
fn utf16_manifest_is_decoded_through_the_fallback_chain() {
    let (temp, config) = project("placeholder\n");
    // Overwrite the manifest as UTF-16LE with BOM, the classic Windows
    // editor artifact.
    let mut bytes = vec![0xFF, 0xFE];
    for unit in "numpy==1.24.3\n".encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    std::fs::write(temp.path().join(MANIFEST_FILE), bytes).unwrap();

    let mut exec = ScriptedExecutor::new();
    exec.on("nvidia-smi", fail(127, ""));
    script_verification(&mut exec);
    let mut ui = MockUI::new();

    let summary = run_setup(&config, &mut ui, &exec).unwrap();

    assert!(summary.is_success());
    let derived =
        std::fs::read_to_string(temp.path().join(".tmp/requirements-derived.txt")).unwrap();
    assert_eq!(derived, "numpy==1.24.3\n");
}

#[test]
fn individual_package_failure_degrades_without_aborting() {
    let (_temp, config) = project("numpy\nbadpkg\ntqdm\n");
    let mut exec = ScriptedExecutor::new();
    exec.on("nvidia-smi", fail(127, ""));
    exec.on("install -r", fail(1, "resolver error"));
    exec.on("install badpkg", fail(1, "ERROR: no matching distribution"));
    script_verification(&mut exec);
    let mut ui = MockUI::new();

    let summary = run_setup(&config, &mut ui, &exec).unwrap();

    // The run finishes; the failed package is recorded and dependencies
    // report as not fully installed.
    assert!(!summary.deps_installed);
    assert!(summary.verified);
    // Both remaining packages were still attempted.
    assert_eq!(exec.calls_matching("install numpy"), 1);
    assert_eq!(exec.calls_matching("install tqdm"), 1);
}

#[test]
fn forced_cpu_ignores_detected_capability() {
    let (_temp, mut config) = project("numpy\n");
    config.force_cpu = true;
    let mut exec = ScriptedExecutor::new();
    exec.on("nvidia-smi", ok("CUDA Version: 12.6\n"));
    script_verification(&mut exec);
    let mut ui = MockUI::new();

    let summary = run_setup(&config, &mut ui, &exec).unwrap();

    assert!(summary.is_success());
    assert_eq!(exec.calls_matching("whl/cu126"), 0);
    assert_eq!(exec.calls_matching("whl/cpu"), 1);
}

#[test]
fn orchestrator_is_usable_directly_as_a_library() {
    let (_temp, config) = project("numpy\n");
    let env = RuntimeEnvironment::at(config.project_root.join(VENV_DIR), EnvState::Kept);
    let exec = ScriptedExecutor::new();
    let mut ui = MockUI::new();

    let report = InstallOrchestrator::new(&config, &exec)
        .install(&env, &Capability::detected("11.8", "nvidia-smi"), &mut ui)
        .unwrap();

    assert!(report.overall);
    assert_eq!(
        report.packages["torch"],
        PackageStatus::Installed {
            via: "cu118".into()
        }
    );
}
