use std::process::ExitCode;

use chrono::NaiveDate;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use crate::commands::base_commands::{Commands, default_start_date};
use crate::commands::report_format::format_simulation_report;
use crate::domain::period::TimePeriodType;
use crate::services::capacity::CapacityCalculator;
use crate::services::config::{
    ConfigError, SimulationConfig, load_config_from_yaml_file, parse_capacity_value,
    validate_num_simulations,
};
use crate::services::roadmap_yaml::{RoadmapSettings, load_roadmap_from_yaml_file};
use crate::services::simulation::{
    Cancellation, EngineSettings, ProgressError, SimulationEngine, TrialPlan,
};
use crate::services::simulation_types::{SimulationOutput, SimulationReport};
use crate::services::triangular_sampler::TriangularSampler;

/// Values given on the command line; each one wins over the files.
#[derive(Debug, Default)]
pub(crate) struct CliOverrides {
    pub iterations: Option<usize>,
    pub capacity: Option<String>,
    pub period: Option<TimePeriodType>,
    pub seed: Option<u64>,
    pub parallel: bool,
}

pub fn simulate_command(cmd: Commands) -> ExitCode {
    let Commands::Simulate {
        input,
        output,
        start_date,
        iterations,
        capacity,
        period,
        seed,
        parallel,
        config,
    } = cmd
    else {
        return ExitCode::FAILURE;
    };

    let base_config = match load_base_config(config.as_deref()) {
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

    let overrides = CliOverrides {
        iterations,
        capacity,
        period,
        seed,
        parallel,
    };
    let config = match resolve_config(base_config, &roadmap.settings, overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to resolve simulation settings: {e}");
            return ExitCode::FAILURE;
        }
    };

    let start_date = match resolve_start_date(start_date.as_deref(), &roadmap.settings) {
        Ok(date) => date,
        Err(value) => {
            eprintln!("Failed to parse start date: {value} (expected YYYY-MM-DD)");
            return ExitCode::FAILURE;
        }
    };

    let calculator = CapacityCalculator::new(config.period_type, config.default_capacity_per_quarter)
        .with_overrides(roadmap.capacity_overrides(config.period_type));
    let nominal_capacity_per_period = calculator.default_capacity();
    let engine = SimulationEngine::new(
        calculator,
        EngineSettings {
            progress_update_interval: config.progress_update_interval,
            max_periods_per_item: config.max_periods_per_item,
        },
    );
    let plan = TrialPlan {
        work_items: &roadmap.work_items,
        nominal_capacity_per_period,
        project_start_date: start_date,
        num_trials: config.default_num_simulations,
    };

    let stats = if config.parallel {
        let seed = config.seed.unwrap_or_else(rand::random);
        engine.simulate_parallel(&plan, seed, &Cancellation::none())
    } else {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut sampler = TriangularSampler::new(rng);
        let mut progress = |fraction: f64, message: &str| -> Result<(), ProgressError> {
            info!(percent = (fraction * 100.0).round(), "{message}");
            Ok(())
        };
        engine.simulate(&plan, &mut sampler, Some(&mut progress), &Cancellation::none())
    };
    let stats = match stats {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("Failed to simulate roadmap: {e}");
            return ExitCode::FAILURE;
        }
    };

    let report = SimulationReport {
        data_source: input,
        start_date: start_date.format("%Y-%m-%d").to_string(),
        iterations: config.default_num_simulations,
        period_type: config.period_type,
        default_capacity_per_quarter: config.default_capacity_per_quarter,
        seed: config.seed,
        simulated_items: roadmap.work_items.len(),
    };
    let simulation = SimulationOutput::new(report, stats);
    println!("{}", format_simulation_report(&simulation));

    let yaml = match serde_yaml::to_string(&simulation) {
        Ok(contents) => contents,
        Err(e) => {
            eprintln!("Failed to serialize simulation output: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = std::fs::write(&output, yaml) {
        eprintln!("Failed to write simulation output: {e}");
        return ExitCode::FAILURE;
    }
    println!("Simulation result written to {output}");
    ExitCode::SUCCESS
}

pub(crate) fn load_base_config(path: Option<&str>) -> Result<SimulationConfig, ConfigError> {
    match path {
        Some(path) => load_config_from_yaml_file(path),
        None => Ok(SimulationConfig::default()),
    }
}

/// Layers the roadmap's own settings and then the command line over the
/// base config.
pub(crate) fn resolve_config(
    mut config: SimulationConfig,
    roadmap: &RoadmapSettings,
    overrides: CliOverrides,
) -> Result<SimulationConfig, ConfigError> {
    if let Some(capacity) = roadmap.default_capacity_per_quarter {
        config.default_capacity_per_quarter = capacity;
    }
    if let Some(iterations) = roadmap.iterations {
        config.default_num_simulations = iterations;
    }
    if let Some(period_type) = roadmap.period_type {
        config.period_type = period_type;
    }

    if let Some(capacity) = overrides.capacity.as_deref() {
        config.default_capacity_per_quarter = parse_capacity_value(capacity)?;
    }
    if let Some(iterations) = overrides.iterations {
        config.default_num_simulations = validate_num_simulations(iterations)?;
    }
    if let Some(period_type) = overrides.period {
        config.period_type = period_type;
    }
    if overrides.seed.is_some() {
        config.seed = overrides.seed;
    }
    config.parallel |= overrides.parallel;

    config.validate()?;
    Ok(config)
}

fn resolve_start_date(cli: Option<&str>, roadmap: &RoadmapSettings) -> Result<NaiveDate, String> {
    let text = match (cli, roadmap.start_date) {
        (Some(text), _) => text.to_string(),
        (None, Some(date)) => return Ok(date),
        (None, None) => default_start_date(),
    };
    NaiveDate::parse_from_str(&text, "%Y-%m-%d").map_err(|_| text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::on_date;

    #[test]
    fn command_line_wins_over_roadmap_and_config() {
        let roadmap = RoadmapSettings {
            start_date: None,
            default_capacity_per_quarter: Some(900.0),
            iterations: Some(5_000),
            period_type: Some(TimePeriodType::Monthly),
        };
        let overrides = CliOverrides {
            iterations: Some(250),
            capacity: Some("1100/q".to_string()),
            seed: Some(3),
            ..CliOverrides::default()
        };

        let config = resolve_config(SimulationConfig::default(), &roadmap, overrides).unwrap();
        assert_eq!(config.default_capacity_per_quarter, 1100.0);
        assert_eq!(config.default_num_simulations, 250);
        assert_eq!(config.period_type, TimePeriodType::Monthly);
        assert_eq!(config.seed, Some(3));
        assert!(!config.parallel);
    }

    #[test]
    fn roadmap_settings_apply_over_defaults() {
        let roadmap = RoadmapSettings {
            iterations: Some(1_000),
            ..RoadmapSettings::default()
        };

        let config =
            resolve_config(SimulationConfig::default(), &roadmap, CliOverrides::default()).unwrap();
        assert_eq!(config.default_num_simulations, 1_000);
        assert_eq!(config.default_capacity_per_quarter, 1300.0);
    }

    #[test]
    fn out_of_range_iterations_are_rejected() {
        let overrides = CliOverrides {
            iterations: Some(10),
            ..CliOverrides::default()
        };
        let error = resolve_config(SimulationConfig::default(), &RoadmapSettings::default(), overrides)
            .unwrap_err();
        assert!(matches!(error, ConfigError::SimulationsOutOfRange(10)));

        let roadmap = RoadmapSettings {
            iterations: Some(500_000),
            ..RoadmapSettings::default()
        };
        assert!(
            resolve_config(SimulationConfig::default(), &roadmap, CliOverrides::default()).is_err()
        );
    }

    #[test]
    fn start_date_prefers_command_line() {
        let roadmap = RoadmapSettings {
            start_date: Some(on_date(2025, 1, 6)),
            ..RoadmapSettings::default()
        };

        assert_eq!(
            resolve_start_date(Some("2025-02-03"), &roadmap),
            Ok(on_date(2025, 2, 3))
        );
        assert_eq!(resolve_start_date(None, &roadmap), Ok(on_date(2025, 1, 6)));
        assert_eq!(
            resolve_start_date(Some("03/02/2025"), &roadmap),
            Err("03/02/2025".to_string())
        );
    }
}
