//! Flightdeck - provisioning tool for a GPU-accelerated video analysis
//! runtime.
//!
//! Flightdeck creates an isolated Python environment, detects CUDA
//! capability on the host, installs dependencies with
//! capability-appropriate build variants, and verifies the result.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Run configuration threaded through every component
//! - [`error`] - Error types and result aliases
//! - [`gpu`] - CUDA capability detection and setup assistance
//! - [`install`] - Manifest handling and install orchestration
//! - [`runner`] - Workflow orchestration and the final summary
//! - [`shell`] - External process invocation
//! - [`ui`] - Prompts, spinners, and terminal output
//! - [`venv`] - Virtual environment lifecycle and directory layout
//! - [`verify`] - Post-install verification probes
//!
//! # Example
//!
//! ```
//! use flightdeck::gpu::{normalize_version, Capability};
//! use flightdeck::install::select_plan;
//!
//! // Detected versions are truncated to major.minor at the boundary,
//! // then drive the install-profile decision table.
//! assert_eq!(normalize_version("12.4.1"), "12.4");
//! let plan = select_plan(&Capability::detected("12.4.1", "nvidia-smi"), false);
//! assert_eq!(plan.tags, ["cu124", "cpu"]);
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod gpu;
pub mod install;
pub mod runner;
pub mod shell;
pub mod ui;
pub mod venv;
pub mod verify;

pub use error::{FlightdeckError, Result};
