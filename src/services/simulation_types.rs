use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::period::TimePeriodType;
use crate::domain::work_item::SimulationStats;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SimulationReport {
    pub data_source: String,
    pub start_date: String,
    pub iterations: usize,
    pub period_type: TimePeriodType,
    pub default_capacity_per_quarter: f64,
    pub seed: Option<u64>,
    pub simulated_items: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SimulationOutput {
    pub report: SimulationReport,
    pub items: Vec<SimulationStats>,
}

impl SimulationOutput {
    /// Orders the per-item statistics by roadmap position.
    pub fn new(report: SimulationReport, stats: BTreeMap<String, SimulationStats>) -> Self {
        let mut items: Vec<SimulationStats> = stats.into_values().collect();
        items.sort_by_key(|item| item.position);
        Self { report, items }
    }
}
