//! CUDA capability detection and optional GPU setup assistance.

pub mod assist;
pub mod detector;

pub use assist::{install_cuda_toolkit, install_nvidia_drivers};
pub use detector::{normalize_version, Capability, CapabilityDetector};
