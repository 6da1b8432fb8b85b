//! CUDA toolkit detection.
//!
//! Probes run in a fixed order and the first one that yields a version
//! wins: `nvidia-smi` works on every platform, then platform-specific
//! fallbacks (registry and install roots on Windows, `CUDA_PATH` and
//! install symlinks on Linux). A probe failing — tool absent, garbage
//! output, unreadable directory — is never an error; it just means that
//! probe found nothing and the next one runs.
//!
//! Raw versions are normalized to `major.minor` exactly once, here at the
//! detection boundary, so everything downstream only ever sees normalized
//! values.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::shell::{CommandSpec, ExecOptions, Executor};
use crate::ui::UserInterface;

static SMI_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"CUDA Version: (\d+\.\d+)").unwrap());
static PATH_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"cuda-(\d+\.\d+)").unwrap());
static NVCC_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"release (\d+\.\d+)").unwrap());
static REG_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Version\s+REG_\w+\s+(\S+)").unwrap());

/// Detected hardware-acceleration capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    /// A CUDA toolkit/driver was found.
    Detected {
        /// Version string exactly as the probe reported it.
        raw: String,
        /// `major.minor` truncation of `raw`, the only form used downstream.
        normalized: String,
        /// Name of the probe that found it.
        source: &'static str,
    },
    /// No CUDA installation on this host. A valid, common state.
    Absent,
}

impl Capability {
    /// Build a detected capability, normalizing the raw version.
    pub fn detected(raw: impl Into<String>, source: &'static str) -> Self {
        let raw = raw.into();
        let normalized = normalize_version(&raw);
        Capability::Detected {
            raw,
            normalized,
            source,
        }
    }

    /// Normalized version, if anything was detected.
    pub fn normalized(&self) -> Option<&str> {
        match self {
            Capability::Detected { normalized, .. } => Some(normalized),
            Capability::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Capability::Absent)
    }
}

/// Truncate a version string to its first two dot-separated components.
///
/// `"12.4.1"` becomes `"12.4"`; a string with fewer components is returned
/// unchanged (and will simply not match any compatibility table entry).
pub fn normalize_version(raw: &str) -> String {
    raw.split('.').take(2).collect::<Vec<_>>().join(".")
}

/// Multi-strategy CUDA detector.
pub struct CapabilityDetector<'a> {
    executor: &'a dyn Executor,
    env: &'a dyn Fn(&str) -> Result<String, std::env::VarError>,
}

impl<'a> CapabilityDetector<'a> {
    /// Detector using the real process environment.
    pub fn new(executor: &'a dyn Executor) -> Self {
        Self {
            executor,
            env: &|key| std::env::var(key),
        }
    }

    /// Detector with a custom env var lookup, for tests.
    pub fn with_env(
        executor: &'a dyn Executor,
        env: &'a dyn Fn(&str) -> Result<String, std::env::VarError>,
    ) -> Self {
        Self { executor, env }
    }

    /// Run the probe chain and return the host's capability.
    pub fn detect(&self, ui: &mut dyn UserInterface) -> Capability {
        if let Some(raw) = self.probe_nvidia_smi() {
            let capability = Capability::detected(raw, "nvidia-smi");
            report(ui, &capability);
            return capability;
        }

        if let Some(capability) = self.probe_platform() {
            report(ui, &capability);
            return capability;
        }

        ui.warning("No CUDA installation detected. The CPU-only PyTorch build will be used.");
        Capability::Absent
    }

    /// Probe 1: `nvidia-smi`, cross-platform.
    fn probe_nvidia_smi(&self) -> Option<String> {
        let spec = CommandSpec::new("nvidia-smi");
        let result = self
            .executor
            .run(&spec, &ExecOptions::default())
            .map_err(|e| tracing::debug!("nvidia-smi probe failed: {}", e))
            .ok()?;
        if !result.success {
            return None;
        }
        SMI_VERSION
            .captures(&result.stdout)
            .map(|c| c[1].to_string())
    }

    #[cfg(windows)]
    fn probe_platform(&self) -> Option<Capability> {
        if let Some(raw) = self.probe_registry() {
            return Some(Capability::detected(raw, "registry"));
        }

        let mut roots = vec![PathBuf::from(
            r"C:\Program Files\NVIDIA GPU Computing Toolkit\CUDA",
        )];
        if let Some(home) = dirs::home_dir() {
            roots.push(home.join(r"NVIDIA GPU Computing Toolkit\CUDA"));
        }
        scan_version_roots(&roots).map(|raw| Capability::detected(raw, "install-dir"))
    }

    #[cfg(not(windows))]
    fn probe_platform(&self) -> Option<Capability> {
        if let Ok(path) = (self.env)("CUDA_PATH") {
            if let Some(c) = PATH_VERSION.captures(&path) {
                return Some(Capability::detected(&c[1], "CUDA_PATH"));
            }
        }

        for root in ["/usr/local/cuda", "/usr/cuda"] {
            if let Some(capability) = inspect_toolkit_dir(Path::new(root), self.executor) {
                return Some(capability);
            }
        }
        None
    }

    /// Windows registry probe, shelled out through the executor so it
    /// stays scriptable in tests.
    #[cfg(windows)]
    fn probe_registry(&self) -> Option<String> {
        let spec = CommandSpec::new("reg").args([
            "query",
            r"HKLM\SOFTWARE\NVIDIA Corporation\CUDA",
            "/v",
            "Version",
        ]);
        let result = self.executor.run(&spec, &ExecOptions::default()).ok()?;
        if !result.success {
            return None;
        }
        parse_registry_version(&result.stdout)
    }
}

fn report(ui: &mut dyn UserInterface, capability: &Capability) {
    if let Capability::Detected {
        normalized, source, ..
    } = capability
    {
        ui.success(&format!(
            "CUDA version {} detected using {}",
            normalized, source
        ));
    }
}

/// Extract the version value from `reg query` output.
pub fn parse_registry_version(output: &str) -> Option<String> {
    REG_VERSION.captures(output).map(|c| c[1].to_string())
}

/// Scan install roots for `v<version>` subdirectories, picking the
/// lexicographically highest.
pub fn scan_version_roots(roots: &[PathBuf]) -> Option<String> {
    for root in roots {
        let Ok(entries) = std::fs::read_dir(root) else {
            continue;
        };
        let mut versions: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|name| name.starts_with('v'))
            .collect();
        if !versions.is_empty() {
            versions.sort();
            let highest = versions.pop()?;
            return Some(highest[1..].to_string());
        }
    }
    None
}

/// Inspect a Unix toolkit location: a symlink carrying the version in its
/// target, or a real directory whose `bin/nvcc` reports it.
pub fn inspect_toolkit_dir(root: &Path, executor: &dyn Executor) -> Option<Capability> {
    if let Ok(target) = std::fs::read_link(root) {
        if let Some(c) = PATH_VERSION.captures(&target.to_string_lossy()) {
            return Some(Capability::detected(&c[1], "symlink"));
        }
    } else if root.is_dir() {
        let nvcc = root.join("bin").join("nvcc");
        if nvcc.exists() {
            let spec = CommandSpec::new(nvcc.to_string_lossy()).arg("--version");
            let result = executor.run(&spec, &ExecOptions::default()).ok()?;
            if let Some(c) = NVCC_VERSION.captures(&result.stdout) {
                return Some(Capability::detected(&c[1], "nvcc"));
            }
        }
    }
    None
}
