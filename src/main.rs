//! Flightdeck CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use flightdeck::cli::Cli;
use flightdeck::runner::run_setup;
use flightdeck::shell::SystemExecutor;
use flightdeck::ui::{create_ui, OutputMode};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is INFO
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("flightdeck=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flightdeck=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tracing::debug!("flightdeck starting with args: {:?}", cli);

    let output_mode = if cli.quiet {
        OutputMode::Quiet
    } else if cli.debug {
        OutputMode::Verbose
    } else {
        OutputMode::Normal
    };

    if cli.no_color {
        std::env::set_var("NO_COLOR", "1");
    }

    let project_root = cli
        .project
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    let config = cli.to_config(project_root);
    let mut ui = create_ui(!config.unattended, output_mode);
    let executor = SystemExecutor::new();

    match run_setup(&config, ui.as_mut(), &executor) {
        Ok(summary) if summary.is_success() || summary.aborted => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(e) => {
            ui.error(&format!("Error: {}", e));
            ExitCode::from(1)
        }
    }
}
