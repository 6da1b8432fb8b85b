//! Installation outcome reporting.
//!
//! Outcomes accumulate per package during installation and are persisted
//! as JSON under `logs/` so a failed unattended run leaves a machine-readable
//! trace of which dependency broke and how.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// File name of the persisted report under the logs directory.
pub const REPORT_FILE: &str = "provision-report.json";

/// Outcome for a single package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PackageStatus {
    /// Installed successfully.
    Installed {
        /// Which path succeeded: `bulk`, `individual`, or a build tag.
        via: String,
    },
    /// Every attempt failed.
    Failed { reason: String },
    /// Deliberately not installed.
    Skipped { reason: String },
}

/// Aggregated result of the install phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallationReport {
    /// Whether every required component installed via some path. Does not
    /// reflect which fallback tier was used.
    pub overall: bool,

    /// Whether hardware acceleration is in place. Set provisionally from
    /// the installed build tag, then overwritten by verification.
    pub accelerator_available: bool,

    /// Per-dependency outcome, keyed by package name.
    pub packages: BTreeMap<String, PackageStatus>,
}

impl InstallationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an outcome for a package.
    pub fn record(&mut self, name: &str, status: PackageStatus) {
        self.packages.insert(name.to_string(), status);
    }

    /// Whether any recorded package failed.
    pub fn has_failures(&self) -> bool {
        self.packages
            .values()
            .any(|s| matches!(s, PackageStatus::Failed { .. }))
    }

    /// Persist the report as pretty JSON under `logs_dir`.
    pub fn write_json(&self, logs_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(logs_dir)?;
        let path = logs_dir.join(REPORT_FILE);
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("serializing report: {}", e))?;
        std::fs::write(&path, json)?;
        Ok(path)
    }
}
