use std::collections::HashMap;

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::calendar::{add_working_days, ensure_working_day};
use crate::domain::period::Period;
use crate::domain::work_item::{SimulationResult, TrialRecord, WorkItem};
use crate::services::capacity::{CapacityCalculator, CapacityError};
use crate::services::triangular_sampler::{EffortSampler, EstimateRangeError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    #[error("period {period} has non-positive capacity {capacity}")]
    ZeroOrNegativeCapacityPeriod { period: String, capacity: f64 },
    #[error("dependency {dependency} of work item {position} has not been scheduled")]
    UnresolvedDependency { position: u32, dependency: u32 },
    #[error("work item starting {start_date} did not finish within {limit} periods")]
    PeriodLimitExceeded { start_date: NaiveDate, limit: u32 },
    #[error("invalid estimates for work item {position}: {source}")]
    InvalidEstimate {
        position: u32,
        source: EstimateRangeError,
    },
    #[error(transparent)]
    Capacity(#[from] CapacityError),
}

/// Scheduler state for one trial. Capacity consumed per period is shared by
/// every item of the trial; nothing carries over between trials.
#[derive(Debug, Clone, Default)]
pub struct TrialState {
    pub completion_dates: HashMap<u32, NaiveDate>,
    pub capacity_usage: HashMap<String, f64>,
}

impl TrialState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.completion_dates.clear();
        self.capacity_usage.clear();
    }

    pub fn consumed(&self, period_id: &str) -> f64 {
        self.capacity_usage.get(period_id).copied().unwrap_or(0.0)
    }
}

pub struct ItemScheduler<'a> {
    calculator: &'a CapacityCalculator,
    nominal_capacity_per_period: f64,
    max_periods_per_item: u32,
}

impl<'a> ItemScheduler<'a> {
    pub fn new(
        calculator: &'a CapacityCalculator,
        nominal_capacity_per_period: f64,
        max_periods_per_item: u32,
    ) -> Self {
        Self {
            calculator,
            nominal_capacity_per_period,
            max_periods_per_item,
        }
    }

    /// Latest of the project start, the item's own start date and its
    /// dependency's completion in this trial.
    pub fn determine_start_date(
        &self,
        item: &WorkItem,
        project_start_date: NaiveDate,
        state: &TrialState,
    ) -> Result<NaiveDate, ScheduleError> {
        let mut start = project_start_date;

        if let Some(explicit) = item.start_date {
            start = start.max(ensure_working_day(explicit));
        }

        if let Some(dependency) = item.dependency {
            let completion = state.completion_dates.get(&dependency).ok_or(
                ScheduleError::UnresolvedDependency {
                    position: item.position,
                    dependency,
                },
            )?;
            start = start.max(ensure_working_day(*completion));
        }

        Ok(start)
    }

    /// Consumes period capacity greedily from `start_date` until `effort` is
    /// used up, then converts the final period's share into working days.
    pub fn calculate_completion_date(
        &self,
        start_date: NaiveDate,
        effort: f64,
        state: &mut TrialState,
    ) -> Result<NaiveDate, ScheduleError> {
        let mut current_date = ensure_working_day(start_date);
        let mut remaining = effort;
        let mut periods_visited = 0;

        loop {
            periods_visited += 1;
            if periods_visited > self.max_periods_per_item {
                return Err(ScheduleError::PeriodLimitExceeded {
                    start_date,
                    limit: self.max_periods_per_item,
                });
            }

            let info = self
                .calculator
                .period_info_with_fallback(current_date, self.nominal_capacity_per_period)?;
            if info.total_capacity <= 0.0 {
                return Err(ScheduleError::ZeroOrNegativeCapacityPeriod {
                    period: info.period_id,
                    capacity: info.total_capacity,
                });
            }

            let (_, proportional) = self
                .calculator
                .remaining_capacity(current_date, info.total_capacity)?;
            let unused = info.total_capacity - state.consumed(&info.period_id);
            let available = proportional.min(unused).max(0.0);

            if available <= 0.0 {
                current_date = self.next_period_start(current_date)?;
                continue;
            }

            let usage = state
                .capacity_usage
                .entry(info.period_id)
                .or_insert(0.0);
            if remaining <= available {
                *usage += remaining;
                let working_days = (remaining / info.capacity_per_working_day).round() as u32;
                return Ok(add_working_days(current_date, working_days));
            }

            *usage += available;
            remaining -= available;
            current_date = self.next_period_start(current_date)?;
        }
    }

    pub fn schedule_item(
        &self,
        item: &WorkItem,
        effort: f64,
        project_start_date: NaiveDate,
        state: &mut TrialState,
    ) -> Result<SimulationResult, ScheduleError> {
        let start_date = self.determine_start_date(item, project_start_date, state)?;
        let completion_date = self.calculate_completion_date(start_date, effort, state)?;
        state.completion_dates.insert(item.position, completion_date);

        Ok(SimulationResult {
            position: item.position,
            item: item.item.clone(),
            effort,
            start_date,
            completion_date,
            due_date: item.due_date,
        })
    }

    /// Runs one trial: `order` lists indices into `work_items` with every
    /// predecessor ahead of its dependents. The record keeps list order.
    pub fn run_trial<S: EffortSampler + ?Sized>(
        &self,
        work_items: &[WorkItem],
        order: &[usize],
        project_start_date: NaiveDate,
        sampler: &mut S,
        state: &mut TrialState,
    ) -> Result<TrialRecord, ScheduleError> {
        state.reset();
        let mut results: Vec<Option<SimulationResult>> = vec![None; work_items.len()];

        for &index in order {
            let item = &work_items[index];
            let (best, most_likely, worst) = item.estimate_range();
            let effort = sampler.sample(best, most_likely, worst).map_err(|source| {
                ScheduleError::InvalidEstimate {
                    position: item.position,
                    source,
                }
            })?;
            results[index] = Some(self.schedule_item(item, effort, project_start_date, state)?);
        }

        Ok(TrialRecord {
            results: results.into_iter().flatten().collect(),
        })
    }

    fn next_period_start(&self, date: NaiveDate) -> Result<NaiveDate, ScheduleError> {
        let next = Period::containing(date, self.calculator.period_type()).next();
        next.first_working_day().ok_or_else(|| {
            ScheduleError::Capacity(CapacityError::InvalidPeriod {
                period: next.to_string(),
            })
        })
    }
}
