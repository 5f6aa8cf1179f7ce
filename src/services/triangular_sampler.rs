use rand::Rng;
use rand_distr::{Distribution, Triangular};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid estimate range: best {best}, most likely {most_likely}, worst {worst}")]
pub struct EstimateRangeError {
    pub best: f64,
    pub most_likely: f64,
    pub worst: f64,
}

pub trait EffortSampler {
    fn sample(&mut self, best: f64, most_likely: f64, worst: f64) -> Result<f64, EstimateRangeError>;
}

pub struct TriangularSampler<R: Rng> {
    rng: R,
}

impl<R: Rng> TriangularSampler<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> EffortSampler for TriangularSampler<R> {
    fn sample(&mut self, best: f64, most_likely: f64, worst: f64) -> Result<f64, EstimateRangeError> {
        let error = || EstimateRangeError {
            best,
            most_likely,
            worst,
        };
        if worst < best || most_likely < best || most_likely > worst {
            return Err(error());
        }
        if (worst - best).abs() < f64::EPSILON {
            return Ok(best);
        }

        let distribution = Triangular::new(best, worst, most_likely).map_err(|_| error())?;
        Ok(distribution.sample(&mut self.rng).clamp(best, worst))
    }
}
