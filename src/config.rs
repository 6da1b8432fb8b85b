//! Run configuration threaded through every component.
//!
//! All process-wide toggles (debug verbosity, forced-CPU mode, unattended
//! operation) live in [`SetupConfig`] and are passed explicitly through call
//! boundaries rather than read from ambient state, so each component can be
//! exercised with synthetic configuration in tests.

use std::path::PathBuf;

/// Configuration for a provisioning run.
#[derive(Debug, Clone, Default)]
pub struct SetupConfig {
    /// Project root the runtime lives under.
    pub project_root: PathBuf,

    /// Skip provisioning; refresh dependencies in the existing environment.
    pub update: bool,

    /// Ignore detected capability and install CPU-only variants.
    pub force_cpu: bool,

    /// Suppress interactive prompts; policy defaults decide instead.
    pub unattended: bool,

    /// Recreate the virtual environment if it exists.
    pub recreate: bool,

    /// Keep the existing virtual environment if it exists.
    pub keep: bool,

    /// Offer GPU driver/toolkit setup when no capability is detected
    /// (implied answer in unattended mode).
    pub setup_gpu: bool,

    /// Stream external command output and trace every invocation.
    pub debug: bool,
}

impl SetupConfig {
    /// Configuration rooted at a directory with everything else defaulted.
    pub fn at(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            ..Default::default()
        }
    }
}
