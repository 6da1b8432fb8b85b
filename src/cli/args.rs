//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::Parser;
use std::path::PathBuf;

use crate::config::SetupConfig;

/// Flightdeck - provision the analysis runtime environment.
#[derive(Debug, Parser)]
#[command(name = "flightdeck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to project root (overrides current directory)
    #[arg(short, long)]
    pub project: Option<PathBuf>,

    /// Skip provisioning and refresh dependencies in the existing environment
    #[arg(long)]
    pub update: bool,

    /// Ignore detected CUDA and install CPU-only builds
    #[arg(long)]
    pub force_cpu: bool,

    /// Run in unattended mode without prompts
    #[arg(long)]
    pub unattended: bool,

    /// Recreate the virtual environment if it exists
    #[arg(long)]
    pub recreate: bool,

    /// Keep the existing virtual environment if it exists
    #[arg(long)]
    pub keep: bool,

    /// Attempt GPU setup if CUDA is not detected (answers the prompt in
    /// unattended mode)
    #[arg(long)]
    pub setup_gpu: bool,

    /// Show detailed output from external commands
    #[arg(long)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl Cli {
    /// Build the run configuration for a resolved project root.
    pub fn to_config(&self, project_root: PathBuf) -> SetupConfig {
        SetupConfig {
            project_root,
            update: self.update,
            force_cpu: self.force_cpu,
            unattended: self.unattended,
            recreate: self.recreate,
            keep: self.keep,
            setup_gpu: self.setup_gpu,
            debug: self.debug,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_invocation_has_no_flags_set() {
        let cli = Cli::parse_from(["flightdeck"]);
        assert!(!cli.update);
        assert!(!cli.force_cpu);
        assert!(!cli.unattended);
        assert!(!cli.recreate);
        assert!(!cli.keep);
        assert!(!cli.debug);
        assert!(cli.project.is_none());
    }

    #[test]
    fn all_mode_flags_parse() {
        let cli = Cli::parse_from([
            "flightdeck",
            "--update",
            "--force-cpu",
            "--unattended",
            "--recreate",
            "--keep",
            "--setup-gpu",
            "--debug",
        ]);
        let config = cli.to_config(PathBuf::from("/proj"));
        assert!(config.update);
        assert!(config.force_cpu);
        assert!(config.unattended);
        assert!(config.recreate);
        assert!(config.keep);
        assert!(config.setup_gpu);
        assert!(config.debug);
    }

    #[test]
    fn project_flag_overrides_root() {
        let cli = Cli::parse_from(["flightdeck", "--project", "/elsewhere"]);
        assert_eq!(cli.project, Some(PathBuf::from("/elsewhere")));
    }
}
