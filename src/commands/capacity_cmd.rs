use std::process::ExitCode;

use chrono::NaiveDate;

use crate::commands::base_commands::Commands;
use crate::commands::report_format::format_capacity_timeline;
use crate::commands::simulate_cmd::load_base_config;
use crate::services::capacity::CapacityCalculator;
use crate::services::roadmap_yaml::load_roadmap_from_yaml_file;

pub fn capacity_command(cmd: Commands) -> ExitCode {
    let Commands::Capacity {
        input,
        from,
        to,
        period,
        config,
    } = cmd
    else {
        return ExitCode::FAILURE;
    };

    let (from, to) = match (parse_date(&from), parse_date(&to)) {
        (Some(from), Some(to)) => (from, to),
        _ => {
            eprintln!("Failed to parse timeline dates: {from}..{to} (expected YYYY-MM-DD)");
            return ExitCode::FAILURE;
        }
    };

    let config = match load_base_config(config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load simulation config: {e}");
            return ExitCode::FAILURE;
        }
    };
    let roadmap = match load_roadmap_from_yaml_file(&input) {
        Ok(roadmap) => roadmap,
        Err(e) => {
            eprintln!("Failed to load roadmap: {e}");
            return ExitCode::FAILURE;
        }
    };

    let period_type = period
        .or(roadmap.settings.period_type)
        .unwrap_or(config.period_type);
    let capacity = roadmap
        .settings
        .default_capacity_per_quarter
        .unwrap_or(config.default_capacity_per_quarter);
    let calculator = CapacityCalculator::new(period_type, capacity)
        .with_overrides(roadmap.capacity_overrides(period_type));

    match calculator.capacity_timeline(from, to) {
        Ok(timeline) => {
            println!("{}", format_capacity_timeline(&timeline));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to build capacity timeline: {e}");
            ExitCode::FAILURE
        }
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}
