use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::domain::period::{Period, TimePeriodType};
use crate::domain::work_item::WorkItem;
use crate::services::config::{CapacityValue, ConfigError, deserialize_capacity};
use crate::services::dependency_order::{DependencyError, schedule_order};

#[derive(Error, Debug)]
pub enum RoadmapYamlError {
    #[error("failed to read roadmap yaml {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse roadmap yaml: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("roadmap has no work items")]
    NoWorkItems,
    #[error("invalid position {0} (positions must be positive)")]
    InvalidPosition(i64),
    #[error("work item at position {0} has an empty name")]
    EmptyName(u32),
    #[error("duplicate work item name: {0}")]
    DuplicateName(String),
    #[error("invalid date format for {item}: {value} (expected YYYY-MM-DD)")]
    InvalidDate { item: String, value: String },
    #[error("estimates for {item} must be positive")]
    NonPositiveEstimate { item: String },
    #[error("estimates for {item} must satisfy best <= likely <= worst ({best}, {likely}, {worst})")]
    InvalidEstimateOrder {
        item: String,
        best: f64,
        likely: f64,
        worst: f64,
    },
    #[error(transparent)]
    Dependency(#[from] DependencyError),
}

/// Run settings carried by the roadmap file itself. They sit between the
/// built-in defaults and command-line flags.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoadmapSettings {
    pub start_date: Option<NaiveDate>,
    #[serde(
        alias = "capacity_per_quarter",
        deserialize_with = "deserialize_optional_capacity"
    )]
    pub default_capacity_per_quarter: Option<f64>,
    #[serde(alias = "num_simulations")]
    pub iterations: Option<usize>,
    pub period_type: Option<TimePeriodType>,
}

/// A capacity row whose period and value have both been parsed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapacityEntry {
    pub period: Period,
    pub capacity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Roadmap {
    pub work_items: Vec<WorkItem>,
    pub capacity: Vec<CapacityEntry>,
    pub settings: RoadmapSettings,
}

impl Roadmap {
    /// Capacity overrides for a run at `period_type` granularity, keyed by
    /// canonical period identifier. Rows of the other granularity are
    /// dropped with a warning.
    pub fn capacity_overrides(&self, period_type: TimePeriodType) -> HashMap<String, f64> {
        let mut overrides = HashMap::new();
        for entry in &self.capacity {
            if entry.period.period_type != period_type {
                warn!(
                    period = %entry.period,
                    run_granularity = %period_type,
                    "ignoring capacity row with mismatched granularity"
                );
                continue;
            }
            overrides.insert(entry.period.to_string(), entry.capacity);
        }
        overrides
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RoadmapRecord {
    #[serde(default)]
    config: RoadmapSettings,
    #[serde(alias = "Work items", alias = "items")]
    work_items: Vec<WorkItemRecord>,
    #[serde(default, alias = "Capacity")]
    capacity: Vec<CapacityRecord>,
}

// Spreadsheet column headers are accepted next to the snake_case names.
#[derive(Deserialize)]
struct WorkItemRecord {
    #[serde(alias = "Position", alias = "POSITION")]
    position: i64,
    #[serde(alias = "Item", alias = "ITEM", alias = "name")]
    item: String,
    #[serde(alias = "Due date", alias = "Due Date", alias = "due date")]
    due_date: String,
    #[serde(default, alias = "Start date", alias = "Start Date", alias = "start date")]
    start_date: Option<String>,
    #[serde(default, alias = "Priority")]
    priority: Option<String>,
    #[serde(default, alias = "Dependency", alias = "depends_on")]
    dependency: Option<i64>,
    #[serde(alias = "Best", alias = "best", alias = "Best estimate")]
    best_estimate: f64,
    #[serde(alias = "Likely", alias = "likely", alias = "Most likely")]
    most_likely_estimate: f64,
    #[serde(alias = "Worst", alias = "worst", alias = "Worst estimate")]
    worst_estimate: f64,
}

#[derive(Deserialize)]
struct CapacityRecord {
    #[serde(alias = "Period", alias = "Quarter", alias = "Month")]
    period: serde_yaml::Value,
    #[serde(alias = "Capacity")]
    capacity: serde_yaml::Value,
}

pub fn load_roadmap_from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Roadmap, RoadmapYamlError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| RoadmapYamlError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    deserialize_roadmap_from_yaml_str(&contents)
}

pub fn deserialize_roadmap_from_yaml_str(input: &str) -> Result<Roadmap, RoadmapYamlError> {
    let record: RoadmapRecord = serde_yaml::from_str(input)?;
    if record.work_items.is_empty() {
        return Err(RoadmapYamlError::NoWorkItems);
    }

    let work_items = record
        .work_items
        .into_iter()
        .map(work_item_from_record)
        .collect::<Result<Vec<_>, _>>()?;
    validate_work_items(&work_items)?;

    let capacity = record
        .capacity
        .into_iter()
        .enumerate()
        .filter_map(|(row, value)| capacity_entry_from_record(row + 1, value))
        .collect();

    Ok(Roadmap {
        work_items,
        capacity,
        settings: record.config,
    })
}

fn work_item_from_record(record: WorkItemRecord) -> Result<WorkItem, RoadmapYamlError> {
    let position = positive_position(record.position)?;
    let item = record.item.trim().to_string();
    if item.is_empty() {
        return Err(RoadmapYamlError::EmptyName(position));
    }
    let due_date = parse_date(&record.due_date, &item)?;
    let start_date = match record.start_date.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(text) => Some(parse_date(text, &item)?),
    };
    let dependency = record.dependency.map(positive_position).transpose()?;
    let priority = record
        .priority
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    Ok(WorkItem {
        position,
        item,
        due_date,
        start_date,
        priority,
        dependency,
        best_estimate: record.best_estimate,
        most_likely_estimate: record.most_likely_estimate,
        worst_estimate: record.worst_estimate,
    })
}

fn validate_work_items(work_items: &[WorkItem]) -> Result<(), RoadmapYamlError> {
    let mut names = HashSet::with_capacity(work_items.len());
    for item in work_items {
        if !names.insert(item.item.as_str()) {
            return Err(RoadmapYamlError::DuplicateName(item.item.clone()));
        }
        let (best, likely, worst) = item.estimate_range();
        if best <= 0.0 || likely <= 0.0 || worst <= 0.0 {
            return Err(RoadmapYamlError::NonPositiveEstimate {
                item: item.item.clone(),
            });
        }
        if !(best <= likely && likely <= worst) {
            return Err(RoadmapYamlError::InvalidEstimateOrder {
                item: item.item.clone(),
                best,
                likely,
                worst,
            });
        }
    }
    // positions, self-dependencies, dangling references and cycles
    schedule_order(work_items)?;
    Ok(())
}

fn capacity_entry_from_record(row: usize, record: CapacityRecord) -> Option<CapacityEntry> {
    let period_text = match &record.period {
        serde_yaml::Value::String(text) => text.trim().to_string(),
        // 2025.10 would already have been read as the float 2025.1
        serde_yaml::Value::Number(number) => {
            warn!(
                row,
                period = %number,
                "skipping capacity row with a numeric period; quote it, e.g. \"2025.10\""
            );
            return None;
        }
        _ => {
            warn!(row, "skipping capacity row without a period");
            return None;
        }
    };
    let period = match Period::parse(&period_text) {
        Ok(period) => period,
        Err(e) => {
            warn!(row, period = %period_text, error = %e, "skipping capacity row");
            return None;
        }
    };
    let capacity = match capacity_value(&record.capacity) {
        Ok(capacity) => capacity,
        Err(e) => {
            warn!(row, period = %period, error = %e, "skipping capacity row");
            return None;
        }
    };
    Some(CapacityEntry { period, capacity })
}

fn capacity_value(value: &serde_yaml::Value) -> Result<f64, ConfigError> {
    let parsed = match value {
        serde_yaml::Value::Number(number) => number
            .as_f64()
            .map(CapacityValue::Number)
            .ok_or_else(|| ConfigError::InvalidCapacity(number.to_string()))?,
        serde_yaml::Value::String(text) => CapacityValue::Text(text.clone()),
        other => return Err(ConfigError::InvalidCapacity(format!("{other:?}"))),
    };
    parsed.resolve()
}

fn deserialize_optional_capacity<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserialize_capacity(deserializer).map(Some)
}

fn positive_position(value: i64) -> Result<u32, RoadmapYamlError> {
    u32::try_from(value)
        .ok()
        .filter(|position| *position > 0)
        .ok_or(RoadmapYamlError::InvalidPosition(value))
}

fn parse_date(value: &str, item: &str) -> Result<NaiveDate, RoadmapYamlError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| RoadmapYamlError::InvalidDate {
        item: item.to_string(),
        value: value.to_string(),
    })
}
