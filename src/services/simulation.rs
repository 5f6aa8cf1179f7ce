use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::NaiveDate;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::work_item::{SimulationStats, TrialRecord, WorkItem};
use crate::services::capacity::CapacityCalculator;
use crate::services::dependency_order::{DependencyError, schedule_order};
use crate::services::scheduler::{ItemScheduler, ScheduleError, TrialState};
use crate::services::statistics::{StatisticsError, aggregate, derive_start_percentiles};
use crate::services::triangular_sampler::{EffortSampler, TriangularSampler};

const PARALLEL_BATCH_SIZE: usize = 256;

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("number of trials must be greater than zero")]
    InvalidTrialCount,
    #[error("roadmap has no work items")]
    EmptyRoadmap,
    #[error(transparent)]
    Dependency(#[from] DependencyError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Statistics(#[from] StatisticsError),
    #[error("progress callback failed: {0}")]
    Progress(#[from] ProgressError),
    #[error("simulation cancelled after {completed} of {requested} trials")]
    Cancelled { completed: usize, requested: usize },
    #[error("simulation deadline exceeded after {completed} of {requested} trials")]
    DeadlineExceeded { completed: usize, requested: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct ProgressError(pub String);

/// Receives `(fraction_complete, message)` between trials.
pub type ProgressCallback<'a> = dyn FnMut(f64, &str) -> Result<(), ProgressError> + 'a;

/// Cooperative stop conditions, checked between trials only.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Option<Arc<AtomicBool>>,
    deadline: Option<Instant>,
}

impl Cancellation {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.flag = Some(flag);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    fn check(&self, completed: usize, requested: usize) -> Result<(), SimulationError> {
        if self
            .flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            return Err(SimulationError::Cancelled {
                completed,
                requested,
            });
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(SimulationError::DeadlineExceeded {
                completed,
                requested,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub progress_update_interval: usize,
    pub max_periods_per_item: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            progress_update_interval: 100,
            max_periods_per_item: 400,
        }
    }
}

/// Inputs shared by every trial of one run.
#[derive(Debug, Clone, Copy)]
pub struct TrialPlan<'a> {
    pub work_items: &'a [WorkItem],
    pub nominal_capacity_per_period: f64,
    pub project_start_date: NaiveDate,
    pub num_trials: usize,
}

pub struct SimulationEngine {
    calculator: CapacityCalculator,
    settings: EngineSettings,
}

impl SimulationEngine {
    pub fn new(calculator: CapacityCalculator, settings: EngineSettings) -> Self {
        Self {
            calculator,
            settings,
        }
    }

    pub fn calculator(&self) -> &CapacityCalculator {
        &self.calculator
    }

    pub fn calculator_mut(&mut self) -> &mut CapacityCalculator {
        &mut self.calculator
    }

    pub fn run_trials<S: EffortSampler + ?Sized>(
        &self,
        plan: &TrialPlan<'_>,
        sampler: &mut S,
        mut progress: Option<&mut ProgressCallback<'_>>,
        cancellation: &Cancellation,
    ) -> Result<Vec<TrialRecord>, SimulationError> {
        let order = self.prepare(plan)?;
        let scheduler = self.scheduler(plan);
        let interval = self.settings.progress_update_interval.max(1);
        let mut state = TrialState::new();
        let mut trials = Vec::with_capacity(plan.num_trials);
        let started = Instant::now();

        info!(
            trials = plan.num_trials,
            items = plan.work_items.len(),
            period_type = %self.calculator.period_type(),
            "starting simulation"
        );

        for trial in 0..plan.num_trials {
            cancellation.check(trial, plan.num_trials)?;
            if trial % interval == 0 {
                debug!(trial, "simulation progress");
                if let Some(report) = progress.as_deref_mut() {
                    let message = format!("Running simulation {} of {}...", trial + 1, plan.num_trials);
                    report(trial as f64 / plan.num_trials as f64, &message)?;
                }
            }
            trials.push(scheduler.run_trial(
                plan.work_items,
                &order,
                plan.project_start_date,
                sampler,
                &mut state,
            )?);
        }

        if let Some(report) = progress.as_deref_mut() {
            report(1.0, "Simulation complete!")?;
        }
        info!(
            trials = trials.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "simulation finished"
        );
        Ok(trials)
    }

    /// Splits the trials into fixed-size batches run on the rayon pool. Each
    /// batch draws from its own `StdRng` seeded from `seed` and the batch
    /// index, so a given seed yields the same trials on any thread count.
    pub fn run_trials_parallel(
        &self,
        plan: &TrialPlan<'_>,
        seed: u64,
        cancellation: &Cancellation,
    ) -> Result<Vec<TrialRecord>, SimulationError> {
        let order = self.prepare(plan)?;
        let batches = plan.num_trials.div_ceil(PARALLEL_BATCH_SIZE);
        let started = Instant::now();

        info!(
            trials = plan.num_trials,
            items = plan.work_items.len(),
            batches,
            threads = rayon::current_num_threads(),
            "starting parallel simulation"
        );

        let results: Vec<Result<Vec<TrialRecord>, SimulationError>> = (0..batches)
            .into_par_iter()
            .map(|batch| {
                let first = batch * PARALLEL_BATCH_SIZE;
                let last = (first + PARALLEL_BATCH_SIZE).min(plan.num_trials);
                let scheduler = self.scheduler(plan);
                let mut sampler =
                    TriangularSampler::new(StdRng::seed_from_u64(seed.wrapping_add(batch as u64)));
                let mut state = TrialState::new();
                let mut records = Vec::with_capacity(last - first);
                for trial in first..last {
                    cancellation.check(trial, plan.num_trials)?;
                    records.push(scheduler.run_trial(
                        plan.work_items,
                        &order,
                        plan.project_start_date,
                        &mut sampler,
                        &mut state,
                    )?);
                }
                debug!(batch, trials = records.len(), "simulation batch finished");
                Ok(records)
            })
            .collect();

        let mut trials = Vec::with_capacity(plan.num_trials);
        for batch in results {
            trials.extend(batch?);
        }
        info!(
            trials = trials.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "parallel simulation finished"
        );
        Ok(trials)
    }

    pub fn aggregate(
        &self,
        trials: &[TrialRecord],
        plan: &TrialPlan<'_>,
    ) -> Result<BTreeMap<String, SimulationStats>, SimulationError> {
        let mut stats = aggregate(trials, plan.work_items)?;
        derive_start_percentiles(&mut stats, plan.work_items, plan.project_start_date)?;
        Ok(stats)
    }

    pub fn simulate<S: EffortSampler + ?Sized>(
        &self,
        plan: &TrialPlan<'_>,
        sampler: &mut S,
        progress: Option<&mut ProgressCallback<'_>>,
        cancellation: &Cancellation,
    ) -> Result<BTreeMap<String, SimulationStats>, SimulationError> {
        let trials = self.run_trials(plan, sampler, progress, cancellation)?;
        self.aggregate(&trials, plan)
    }

    pub fn simulate_parallel(
        &self,
        plan: &TrialPlan<'_>,
        seed: u64,
        cancellation: &Cancellation,
    ) -> Result<BTreeMap<String, SimulationStats>, SimulationError> {
        let trials = self.run_trials_parallel(plan, seed, cancellation)?;
        self.aggregate(&trials, plan)
    }

    fn prepare(&self, plan: &TrialPlan<'_>) -> Result<Vec<usize>, SimulationError> {
        if plan.num_trials == 0 {
            return Err(SimulationError::InvalidTrialCount);
        }
        if plan.work_items.is_empty() {
            return Err(SimulationError::EmptyRoadmap);
        }
        Ok(schedule_order(plan.work_items)?)
    }

    fn scheduler(&self, plan: &TrialPlan<'_>) -> ItemScheduler<'_> {
        ItemScheduler::new(
            &self.calculator,
            plan.nominal_capacity_per_period,
            self.settings.max_periods_per_item,
        )
    }
}
