//! Error types for flightdeck operations.
//!
//! This module defines [`FlightdeckError`], the primary error type used
//! throughout the application, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Fatal conditions (missing manifest, environment creation failure, the
//!   CPU-only install failing) are explicit variants returned up the call
//!   chain immediately
//! - Degraded conditions (a build-tag falling back, individual package
//!   failures) are expressed as status data, never as errors
//! - Use `anyhow::Error` (via `FlightdeckError::Other`) for unexpected errors

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for flightdeck operations.
#[derive(Debug, Error)]
pub enum FlightdeckError {
    /// Package manifest file not found at expected location.
    #[error("Manifest not found: {path}")]
    ManifestNotFound { path: PathBuf },

    /// Manifest could not be decoded with any supported encoding.
    #[error("Could not decode manifest at {path} with any supported encoding")]
    ManifestUndecodable { path: PathBuf },

    /// Virtual environment creation failed. There is no fallback.
    #[error("Failed to create virtual environment: {message}")]
    EnvCreationFailed { message: String },

    /// Virtual environment removal failed after all recovery tiers.
    #[error("Could not remove virtual environment at {path}: {message}")]
    EnvRemovalFailed { path: PathBuf, message: String },

    /// Expected environment (or its executables) is not there.
    #[error("Virtual environment not usable at {path}: {message}")]
    EnvMissing { path: PathBuf, message: String },

    /// External command failed to launch or exited non-zero where that is fatal.
    #[error("Command failed with exit code {code:?}: {command}")]
    CommandFailed { command: String, code: Option<i32> },

    /// A required package failed to install with no remaining fallback.
    #[error("Failed to install '{package}': {message}")]
    InstallFailed { package: String, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for flightdeck operations.
pub type Result<T> = std::result::Result<T, FlightdeckError>;
