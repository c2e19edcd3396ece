//! Latin-hypercube experiment design.

use mc_types::{validation_error, Bounds, CalResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Stratified space-filling sampler.
///
/// Every dimension is cut into `count` equal strata; each stratum is hit by
/// exactly one point, and the strata are shuffled independently per
/// dimension.
#[derive(Debug, Clone)]
pub struct LatinHypercube {
    rng: StdRng,
}

impl LatinHypercube {
    /// Fresh OS entropy; a different design on every construction.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reproducible design for a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::new(),
        }
    }

    /// `count` points of the unit hypercube `[0, 1)^dim`.
    pub fn unit_sample(&mut self, dim: usize, count: usize) -> CalResult<Vec<Vec<f64>>> {
        if dim == 0 {
            return Err(validation_error!("design needs at least one dimension"));
        }
        if count == 0 {
            return Err(validation_error!("design needs at least one sample"));
        }

        let mut points = vec![vec![0.0; dim]; count];
        let mut strata: Vec<usize> = (0..count).collect();
        let n = count as f64;

        for d in 0..dim {
            strata.shuffle(&mut self.rng);
            for (point, &stratum) in points.iter_mut().zip(&strata) {
                let offset: f64 = self.rng.random();
                point[d] = (stratum as f64 + offset) / n;
            }
        }

        Ok(points)
    }

    /// `count` points spread over the box described by `bounds`.
    pub fn sample(&mut self, bounds: &Bounds, count: usize) -> CalResult<Vec<Vec<f64>>> {
        let unit = self.unit_sample(bounds.dim(), count)?;
        Ok(unit.iter().map(|u| rescale_within(bounds, u)).collect())
    }
}

impl Default for LatinHypercube {
    fn default() -> Self {
        Self::new()
    }
}

/// Rescale a unit point, absorbing the last-ulp overshoot of `min + w * u`.
pub(crate) fn rescale_within(bounds: &Bounds, unit: &[f64]) -> Vec<f64> {
    bounds
        .rescale(unit)
        .into_iter()
        .zip(bounds.intervals())
        .map(|(value, interval)| value.clamp(interval.min, interval.max))
        .collect()
}
