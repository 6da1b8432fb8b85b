//! GPU driver and toolkit setup assistance.
//!
//! When no CUDA installation is detected, the user can opt into guidance:
//! on Windows that is a pointer at the official download pages, on Linux a
//! best-effort install through apt. Nothing here is fatal — a failed
//! install leaves the run on the CPU-only path.

use crate::config::SetupConfig;
use crate::shell::{CommandSpec, ExecOptions, Executor};
use crate::ui::UserInterface;

const DRIVER_URL: &str = "https://www.nvidia.com/Download/index.aspx";
const TOOLKIT_URL: &str = "https://developer.nvidia.com/cuda-downloads";

/// Install (or guide installing) NVIDIA drivers.
pub fn install_nvidia_drivers(
    config: &SetupConfig,
    ui: &mut dyn UserInterface,
    executor: &dyn Executor,
) {
    if cfg!(windows) {
        ui.warning(&format!(
            "Please visit {} to download and install the latest NVIDIA drivers.",
            DRIVER_URL
        ));
        return;
    }

    ui.message("Installing NVIDIA drivers...");
    if apt_install(config, executor, &["nvidia-driver-470"]) {
        ui.success("NVIDIA drivers installed");
    } else {
        ui.error("Failed to install NVIDIA drivers");
    }
}

/// Install (or guide installing) the CUDA toolkit.
pub fn install_cuda_toolkit(
    config: &SetupConfig,
    ui: &mut dyn UserInterface,
    executor: &dyn Executor,
) {
    if cfg!(windows) {
        ui.warning(&format!(
            "Please visit {} to download and install the latest CUDA Toolkit.",
            TOOLKIT_URL
        ));
        return;
    }

    ui.message("Installing CUDA Toolkit...");
    if apt_install(config, executor, &["nvidia-cuda-toolkit"]) {
        ui.success("CUDA Toolkit installed");
    } else {
        ui.error("Failed to install CUDA Toolkit");
    }
}

/// `apt-get update` followed by an install; true when both exit 0.
fn apt_install(config: &SetupConfig, executor: &dyn Executor, packages: &[&str]) -> bool {
    let options = ExecOptions {
        cwd: Some(config.project_root.clone()),
        stream_output: config.debug,
    };

    let update = CommandSpec::new("sudo").args(["apt-get", "update"]);
    let updated = executor
        .run(&update, &options)
        .map(|r| r.success)
        .unwrap_or(false);
    if !updated {
        return false;
    }

    let install = CommandSpec::new("sudo")
        .args(["apt-get", "install", "-y"])
        .args(packages.iter().copied());
    executor
        .run(&install, &options)
        .map(|r| r.success)
        .unwrap_or(false)
}
