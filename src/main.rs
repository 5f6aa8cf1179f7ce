use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use roadmap_forecasts::commands::base_commands::{CliArgs, Commands};
use roadmap_forecasts::commands::capacity_cmd::capacity_command;
use roadmap_forecasts::commands::completions_cmd::completions_command;
use roadmap_forecasts::commands::simulate_cmd::simulate_command;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(&args.log_level);

    match args.command {
        cmd @ Commands::Simulate { .. } => simulate_command(cmd),
        cmd @ Commands::Capacity { .. } => capacity_command(cmd),
        cmd @ Commands::Completions { .. } => completions_command(cmd),
    }
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
