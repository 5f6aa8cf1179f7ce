use chrono::NaiveDate;
use serde::Serialize;

/// A roadmap entry. Validated by the loader before it reaches the engine:
/// positions are unique, `best <= most_likely <= worst` and an item never
/// depends on itself.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    pub position: u32,
    pub item: String,
    pub due_date: NaiveDate,
    pub start_date: Option<NaiveDate>,
    pub priority: Option<String>,
    pub dependency: Option<u32>,
    pub best_estimate: f64,
    pub most_likely_estimate: f64,
    pub worst_estimate: f64,
}

impl WorkItem {
    pub fn has_dependency(&self) -> bool {
        self.dependency.is_some()
    }

    pub fn estimate_range(&self) -> (f64, f64, f64) {
        (
            self.best_estimate,
            self.most_likely_estimate,
            self.worst_estimate,
        )
    }

    /// Mean of the triangular distribution over the three estimates.
    pub fn expected_effort(&self) -> f64 {
        (self.best_estimate + self.most_likely_estimate + self.worst_estimate) / 3.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub position: u32,
    pub item: String,
    pub effort: f64,
    pub start_date: NaiveDate,
    pub completion_date: NaiveDate,
    pub due_date: NaiveDate,
}

impl SimulationResult {
    pub fn on_time(&self) -> bool {
        self.completion_date <= self.due_date
    }
}

/// All item results of a single trial, in the caller's item order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrialRecord {
    pub results: Vec<SimulationResult>,
}

impl TrialRecord {
    pub fn result_for(&self, position: u32) -> Option<&SimulationResult> {
        self.results.iter().find(|result| result.position == position)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationStats {
    pub position: u32,
    pub item: String,
    pub due_date: NaiveDate,
    pub on_time_probability: f64,
    pub p10: NaiveDate,
    pub p50: NaiveDate,
    pub p90: NaiveDate,
    pub start_p10: Option<NaiveDate>,
    pub start_p50: Option<NaiveDate>,
    pub start_p90: Option<NaiveDate>,
    pub best_effort: f64,
    pub likely_effort: f64,
    pub worst_effort: f64,
}
