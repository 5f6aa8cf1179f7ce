use chrono::NaiveDate;

use crate::domain::work_item::WorkItem;
use crate::services::triangular_sampler::{EffortSampler, EstimateRangeError};

// A mock EffortSampler that always returns the most likely value
pub struct MostLikelySampler;
impl EffortSampler for MostLikelySampler {
    fn sample(&mut self, _best: f64, most_likely: f64, _worst: f64) -> Result<f64, EstimateRangeError> {
        Ok(most_likely)
    }
}

pub fn on_date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn build_work_item(position: u32, name: &str, effort: f64, dependency: Option<u32>) -> WorkItem {
    WorkItem {
        position,
        item: name.to_string(),
        due_date: on_date(2030, 12, 31),
        start_date: None,
        priority: None,
        dependency,
        best_estimate: effort,
        most_likely_estimate: effort,
        worst_estimate: effort,
    }
}
