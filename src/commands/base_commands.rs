use chrono::Local;
use clap::{Parser, Subcommand};
use clap_complete::Shell;

use crate::domain::period::TimePeriodType;

#[derive(Parser)]
#[command(name = "roadmap", author, version, about)]
pub struct CliArgs {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Forecast roadmap completion dates with capacity-constrained Monte Carlo
    Simulate {
        /// Roadmap YAML file
        #[arg(short, long)]
        input: String,
        /// Output YAML file
        #[arg(short, long)]
        output: String,
        /// Project start date (YYYY-MM-DD); defaults to the roadmap config or today
        #[arg(short, long)]
        start_date: Option<String>,
        /// Number of simulation iterations
        #[arg(short = 'n', long)]
        iterations: Option<usize>,
        /// Default capacity per quarter, e.g. 1300 or 1300/q
        #[arg(long)]
        capacity: Option<String>,
        /// Capacity period granularity
        #[arg(long, value_enum)]
        period: Option<TimePeriodType>,
        /// Seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,
        /// Run trials on all cores
        #[arg(long)]
        parallel: bool,
        /// Optional simulation config YAML
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Print the capacity available per period
    Capacity {
        /// Roadmap YAML file
        #[arg(short, long)]
        input: String,
        /// First date of the timeline (YYYY-MM-DD)
        #[arg(long, default_value_t = default_start_date())]
        from: String,
        /// Last date of the timeline (YYYY-MM-DD)
        #[arg(long)]
        to: String,
        /// Capacity period granularity
        #[arg(long, value_enum)]
        period: Option<TimePeriodType>,
        /// Optional simulation config YAML
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn default_start_date() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulate_leaves_unset_options_empty() {
        let args = CliArgs::parse_from([
            "roadmap",
            "simulate",
            "-i",
            "roadmap.yaml",
            "-o",
            "output.yaml",
        ]);

        assert_eq!(args.log_level, "warn");
        if let Commands::Simulate {
            start_date,
            iterations,
            period,
            parallel,
            ..
        } = args.command
        {
            assert_eq!(start_date, None);
            assert_eq!(iterations, None);
            assert_eq!(period, None);
            assert!(!parallel);
        } else {
            panic!("expected simulate command");
        }
    }

    #[test]
    fn simulate_parses_overrides() {
        let args = CliArgs::parse_from([
            "roadmap",
            "simulate",
            "-i",
            "roadmap.yaml",
            "-o",
            "output.yaml",
            "-n",
            "500",
            "--capacity",
            "1300/q",
            "--period",
            "monthly",
            "--seed",
            "9",
            "--parallel",
            "--log-level",
            "debug",
        ]);

        assert_eq!(args.log_level, "debug");
        if let Commands::Simulate {
            iterations,
            capacity,
            period,
            seed,
            parallel,
            ..
        } = args.command
        {
            assert_eq!(iterations, Some(500));
            assert_eq!(capacity.as_deref(), Some("1300/q"));
            assert_eq!(period, Some(TimePeriodType::Monthly));
            assert_eq!(seed, Some(9));
            assert!(parallel);
        } else {
            panic!("expected simulate command");
        }
    }

    #[test]
    fn capacity_defaults_from_to_today() {
        let args = CliArgs::parse_from([
            "roadmap",
            "capacity",
            "-i",
            "roadmap.yaml",
            "--to",
            "2026-12-31",
        ]);

        if let Commands::Capacity { from, .. } = args.command {
            assert_eq!(from, default_start_date());
        } else {
            panic!("expected capacity command");
        }
    }
}
