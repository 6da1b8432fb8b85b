//! CUDA capability → PyTorch build-tag decision table.
//!
//! The table is data: adding support for a new CUDA release means adding a
//! row, not a branch. Every selection produces an ordered attempt list
//! whose terminal entry is always the CPU-only tag — the one profile with
//! no further fallback.

use crate::gpu::Capability;

/// Build tag of the CPU-only PyTorch variant. Terminal fallback.
pub const CPU_TAG: &str = "cpu";

/// Best-effort tag for detected-but-unsupported CUDA versions with no
/// lower table entry to borrow.
pub const DEFAULT_GPU_TAG: &str = "cu118";

/// Wheel index serving the tagged builds.
pub const TORCH_INDEX_BASE: &str = "https://download.pytorch.org/whl";

/// One supported CUDA version and the build tag serving it.
#[derive(Debug, Clone, Copy)]
pub struct ProfileEntry {
    /// Normalized `major.minor` the entry matches.
    pub version: &'static str,
    /// Same version as a comparable pair.
    pub version_pair: (u32, u32),
    /// Build tag to install. Entries with equivalent compatibility alias
    /// to the same tag.
    pub tag: &'static str,
}

/// Supported CUDA versions, newest first.
pub const COMPATIBILITY: &[ProfileEntry] = &[
    ProfileEntry {
        version: "12.6",
        version_pair: (12, 6),
        tag: "cu126",
    },
    ProfileEntry {
        version: "12.4",
        version_pair: (12, 4),
        tag: "cu124",
    },
    ProfileEntry {
        version: "11.8",
        version_pair: (11, 8),
        tag: "cu118",
    },
    ProfileEntry {
        version: "11.7",
        version_pair: (11, 7),
        tag: "cu118",
    },
    ProfileEntry {
        version: "11.6",
        version_pair: (11, 6),
        tag: "cu118",
    },
    ProfileEntry {
        version: "11.5",
        version_pair: (11, 5),
        tag: "cu118",
    },
];

/// Ordered build tags to attempt. The last entry is always [`CPU_TAG`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    pub tags: Vec<&'static str>,
}

impl InstallPlan {
    fn cpu_only() -> Self {
        Self {
            tags: vec![CPU_TAG],
        }
    }

    fn with_fallback(tag: &'static str) -> Self {
        Self {
            tags: vec![tag, CPU_TAG],
        }
    }
}

/// Select the attempt plan for a detected capability.
///
/// `force_cpu` overrides whatever was detected. A capability missing from
/// the table borrows the nearest lower entry's tag, or [`DEFAULT_GPU_TAG`]
/// when nothing lower exists (including unparseable normalized values like
/// a bare `"11"`).
pub fn select_plan(capability: &Capability, force_cpu: bool) -> InstallPlan {
    if force_cpu {
        return InstallPlan::cpu_only();
    }

    let Some(version) = capability.normalized() else {
        return InstallPlan::cpu_only();
    };

    if let Some(entry) = COMPATIBILITY.iter().find(|e| e.version == version) {
        return InstallPlan::with_fallback(entry.tag);
    }

    let tag = parse_major_minor(version)
        .and_then(|pair| {
            COMPATIBILITY
                .iter()
                .filter(|e| e.version_pair <= pair)
                .max_by_key(|e| e.version_pair)
                .map(|e| e.tag)
        })
        .unwrap_or(DEFAULT_GPU_TAG);

    InstallPlan::with_fallback(tag)
}

/// Wheel index URL for a build tag.
pub fn index_url(tag: &str) -> String {
    format!("{}/{}", TORCH_INDEX_BASE, tag)
}

fn parse_major_minor(version: &str) -> Option<(u32, u32)> {
    let (major, minor) = version.split_once('.')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}
