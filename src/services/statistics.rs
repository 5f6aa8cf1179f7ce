use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::work_item::{SimulationStats, TrialRecord, WorkItem};
use crate::services::dependency_order::{DependencyError, schedule_order};
use crate::services::percentiles::value_sorted;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatisticsError {
    #[error("no trials to aggregate")]
    NoTrials,
    #[error("work item {0} has no results")]
    MissingResults(u32),
    #[error("no statistics for work item {0}")]
    MissingStats(String),
    #[error(transparent)]
    Dependency(#[from] DependencyError),
}

/// Collapses all trials into per-item statistics keyed by item name.
/// Start percentiles stay empty until [`derive_start_percentiles`] runs.
pub fn aggregate(
    trials: &[TrialRecord],
    work_items: &[WorkItem],
) -> Result<BTreeMap<String, SimulationStats>, StatisticsError> {
    if trials.is_empty() {
        return Err(StatisticsError::NoTrials);
    }

    let slot_by_position: HashMap<u32, usize> = work_items
        .iter()
        .enumerate()
        .map(|(slot, item)| (item.position, slot))
        .collect();
    let mut completions: Vec<Vec<NaiveDate>> = vec![Vec::with_capacity(trials.len()); work_items.len()];
    let mut on_time: Vec<usize> = vec![0; work_items.len()];

    for trial in trials {
        for result in &trial.results {
            let Some(&slot) = slot_by_position.get(&result.position) else {
                continue;
            };
            completions[slot].push(result.completion_date);
            if result.on_time() {
                on_time[slot] += 1;
            }
        }
    }

    let mut stats = BTreeMap::new();
    for (slot, item) in work_items.iter().enumerate() {
        let dates = &mut completions[slot];
        dates.sort();
        let missing = || StatisticsError::MissingResults(item.position);
        let p10 = value_sorted(dates, 0.1).ok_or_else(missing)?;
        let p50 = value_sorted(dates, 0.5).ok_or_else(missing)?;
        let p90 = value_sorted(dates, 0.9).ok_or_else(missing)?;

        stats.insert(
            item.item.clone(),
            SimulationStats {
                position: item.position,
                item: item.item.clone(),
                due_date: item.due_date,
                on_time_probability: 100.0 * on_time[slot] as f64 / dates.len() as f64,
                p10,
                p50,
                p90,
                start_p10: None,
                start_p50: None,
                start_p90: None,
                best_effort: item.best_estimate,
                likely_effort: item.most_likely_estimate,
                worst_effort: item.worst_estimate,
            },
        );
    }

    Ok(stats)
}

/// Sets each item's start percentiles to its dependency's completion
/// percentiles, or to the project start when it has none. Items are
/// visited in dependency order so chains resolve from the root down.
pub fn derive_start_percentiles(
    stats: &mut BTreeMap<String, SimulationStats>,
    work_items: &[WorkItem],
    project_start_date: NaiveDate,
) -> Result<(), StatisticsError> {
    let name_by_position: HashMap<u32, &str> = work_items
        .iter()
        .map(|item| (item.position, item.item.as_str()))
        .collect();

    for index in schedule_order(work_items)? {
        let item = &work_items[index];
        let starts = match item.dependency {
            Some(dependency) => {
                let dependency_name = name_by_position.get(&dependency).copied().ok_or(
                    DependencyError::UnresolvedDependency {
                        position: item.position,
                        dependency,
                    },
                )?;
                let dependency_stats = stats
                    .get(dependency_name)
                    .ok_or_else(|| StatisticsError::MissingStats(dependency_name.to_string()))?;
                (dependency_stats.p10, dependency_stats.p50, dependency_stats.p90)
            }
            None => (project_start_date, project_start_date, project_start_date),
        };

        let item_stats = stats
            .get_mut(&item.item)
            .ok_or_else(|| StatisticsError::MissingStats(item.item.clone()))?;
        item_stats.start_p10 = Some(starts.0);
        item_stats.start_p50 = Some(starts.1);
        item_stats.start_p90 = Some(starts.2);
    }

    Ok(())
}
