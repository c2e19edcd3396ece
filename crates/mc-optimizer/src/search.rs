//! Search strategies over a bounded parameter box.

use mc_types::{config_error, validation_error, Bounds, CalResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::history::{SearchHistory, SearchOutcome};
use crate::objective::{checked, Objective};
use crate::sampler::{rescale_within, LatinHypercube};
use crate::surrogate::{expected_improvement, GaussianProcess};

/// Common trait for all search strategies.
pub trait SearchStrategy: Send + Sync {
    /// Minimize `objective` over `bounds`. Every evaluated point lies in
    /// `bounds`. Fails only when no evaluation succeeded.
    fn optimize(&self, objective: &dyn Objective, bounds: &Bounds) -> CalResult<SearchOutcome>;

    /// Human-readable strategy name.
    fn name(&self) -> &str;
}

// ---- Exhaustive search ----

/// Evaluate a full Latin-hypercube design and keep the minimum.
///
/// Evaluations are independent and run on a dedicated rayon pool.
#[derive(Debug, Clone)]
pub struct ExhaustiveSearch {
    samples: usize,
    parallelism: usize,
    seed: Option<u64>,
}

impl ExhaustiveSearch {
    pub fn new(samples: usize) -> Self {
        Self {
            samples,
            parallelism: default_parallelism(),
            seed: None,
        }
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl SearchStrategy for ExhaustiveSearch {
    fn optimize(&self, objective: &dyn Objective, bounds: &Bounds) -> CalResult<SearchOutcome> {
        let candidates = LatinHypercube::from_seed(self.seed).sample(bounds, self.samples)?;
        info!(
            "Exhaustive search over {} candidates on {} workers",
            candidates.len(),
            self.parallelism
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallelism)
            .build()
            .map_err(|e| config_error!("failed to build worker pool: {}", e))?;

        let outcomes: Vec<_> = pool.install(|| {
            candidates
                .par_iter()
                .map(|candidate| checked(objective.evaluate(candidate)))
                .collect()
        });

        // Recorded in design order so ties resolve the same way regardless of
        // which worker finished first.
        let mut history = SearchHistory::new(self.name());
        for (candidate, outcome) in candidates.into_iter().zip(outcomes) {
            history.record(candidate, outcome);
        }

        history.finish()
    }

    fn name(&self) -> &str {
        "exhaustive"
    }
}

// ---- Bayesian search ----

/// Sequential model-based search.
///
/// Starts from warm-start points and a small Latin-hypercube design, then
/// repeatedly fits a Gaussian process to every successful observation and
/// evaluates the candidate with the highest expected improvement. Half of
/// each candidate pool is a fresh design over the whole box; the other half
/// is drawn uniformly from the incumbent's ±10% neighbourhood, intersected
/// with the box.
#[derive(Debug, Clone)]
pub struct BayesianSearch {
    budget: usize,
    initial_samples: usize,
    candidate_pool: usize,
    exploration: f64,
    seed: Option<u64>,
    initial_points: Vec<Vec<f64>>,
}

impl BayesianSearch {
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            initial_samples: 10,
            candidate_pool: 2048,
            exploration: 0.01,
            seed: None,
            initial_points: Vec::new(),
        }
    }

    pub fn with_initial_samples(mut self, n: usize) -> Self {
        self.initial_samples = n;
        self
    }

    pub fn with_candidate_pool(mut self, n: usize) -> Self {
        self.candidate_pool = n.max(2);
        self
    }

    pub fn with_exploration(mut self, xi: f64) -> Self {
        self.exploration = xi;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Points evaluated before anything else, e.g. a known-good prior.
    pub fn with_initial_points(mut self, points: Vec<Vec<f64>>) -> Self {
        self.initial_points = points;
        self
    }

    fn propose(
        &self,
        history: &SearchHistory,
        bounds: &Bounds,
        sampler: &mut LatinHypercube,
        rng: &mut StdRng,
    ) -> CalResult<Vec<f64>> {
        let (inputs, targets): (Vec<Vec<f64>>, Vec<f64>) = history
            .successes()
            .map(|(point, value)| (bounds.normalize(point), value))
            .unzip();

        let incumbent = history.best().map(|(point, _)| bounds.normalize(point));
        let gp = if targets.len() >= 2 {
            GaussianProcess::fit(&inputs, &targets)
        } else {
            None
        };

        let (Some(gp), Some(incumbent)) = (gp, incumbent) else {
            debug!("Surrogate unavailable, sampling at random");
            let unit = sampler.unit_sample(bounds.dim(), 1)?.remove(0);
            return Ok(rescale_within(bounds, &unit));
        };

        let best = targets.iter().copied().fold(f64::INFINITY, f64::min);
        let global = self.candidate_pool / 2;
        let mut candidates = sampler.unit_sample(bounds.dim(), global)?;
        for _ in global..self.candidate_pool {
            candidates.push(local_candidate(&incumbent, rng));
        }

        let mut chosen = 0;
        let mut chosen_ei = f64::NEG_INFINITY;
        for (i, candidate) in candidates.iter().enumerate() {
            let (mean, std) = gp.predict(candidate);
            let ei = expected_improvement(mean, std, best, self.exploration);
            if ei > chosen_ei {
                chosen = i;
                chosen_ei = ei;
            }
        }

        debug!(
            "Next candidate EI={:.3e} (length scale {})",
            chosen_ei,
            gp.length_scale()
        );
        Ok(rescale_within(bounds, &candidates[chosen]))
    }
}

/// Half-width of the neighbourhood sampled around the incumbent, in unit
/// coordinates.
const LOCAL_RADIUS: f64 = 0.1;

/// Uniform draw from the part of the incumbent's neighbourhood that lies
/// inside the unit cube.
fn local_candidate(incumbent: &[f64], rng: &mut StdRng) -> Vec<f64> {
    incumbent
        .iter()
        .map(|&u| {
            let low = (u - LOCAL_RADIUS).max(0.0);
            let high = (u + LOCAL_RADIUS).min(1.0);
            rng.random_range(low..=high)
        })
        .collect()
}

impl SearchStrategy for BayesianSearch {
    fn optimize(&self, objective: &dyn Objective, bounds: &Bounds) -> CalResult<SearchOutcome> {
        if self.budget == 0 {
            return Err(validation_error!("evaluation budget must be positive"));
        }
        if let Some(point) = self.initial_points.iter().find(|p| !bounds.contains(p)) {
            return Err(validation_error!("initial point {:?} lies outside the bounds", point));
        }

        let mut sampler = LatinHypercube::from_seed(self.seed);
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_os_rng(),
        };
        let mut history = SearchHistory::new(self.name());
        info!("Bayesian search with a budget of {} evaluations", self.budget);

        for point in self.initial_points.iter().take(self.budget) {
            let outcome = checked(objective.evaluate(point));
            history.record(point.clone(), outcome);
        }

        let remaining = self.budget - history.len();
        let design = self.initial_samples.min(remaining);
        if design > 0 {
            for point in sampler.sample(bounds, design)? {
                let outcome = checked(objective.evaluate(&point));
                history.record(point, outcome);
            }
        }

        while history.len() < self.budget {
            let point = self.propose(&history, bounds, &mut sampler, &mut rng)?;
            let outcome = checked(objective.evaluate(&point));
            history.record(point, outcome);
        }

        history.finish()
    }

    fn name(&self) -> &str {
        "bayesian"
    }
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Serializable strategy selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    Exhaustive {
        samples: usize,
        #[serde(default = "default_parallelism")]
        parallelism: usize,
    },
    Bayesian {
        budget: usize,
        #[serde(default = "default_initial_samples")]
        initial_samples: usize,
    },
}

fn default_initial_samples() -> usize {
    10
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self::Bayesian {
            budget: 40,
            initial_samples: default_initial_samples(),
        }
    }
}

impl StrategyConfig {
    /// Instantiate the strategy. Warm-start points only apply to the
    /// Bayesian strategy.
    pub fn build(&self, seed: Option<u64>, initial_points: Vec<Vec<f64>>) -> Box<dyn SearchStrategy> {
        match self {
            Self::Exhaustive {
                samples,
                parallelism,
            } => {
                let mut search = ExhaustiveSearch::new(*samples).with_parallelism(*parallelism);
                if let Some(seed) = seed {
                    search = search.with_seed(seed);
                }
                Box::new(search)
            }
            Self::Bayesian {
                budget,
                initial_samples,
            } => {
                let mut search = BayesianSearch::new(*budget)
                    .with_initial_samples(*initial_samples)
                    .with_initial_points(initial_points);
                if let Some(seed) = seed {
                    search = search.with_seed(seed);
                }
                Box::new(search)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mc_types::{CalError, TrainingError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const OPTIMUM: [f64; 4] = [0.3, 0.6, 0.4, 0.7];

    #[test]
    fn local_candidates_stay_inside_without_piling_on_faces() {
        let mut rng = StdRng::seed_from_u64(9);
        let incumbent = [0.0, 1.0, 0.5, 0.03];
        let draws: Vec<Vec<f64>> = (0..500)
            .map(|_| local_candidate(&incumbent, &mut rng))
            .collect();

        for draw in &draws {
            for (value, centre) in draw.iter().zip(&incumbent) {
                assert!((0.0..=1.0).contains(value), "outside the cube: {draw:?}");
                assert!((value - centre).abs() <= LOCAL_RADIUS + 1e-12);
            }
        }
        for d in [0, 1, 3] {
            let on_face = draws
                .iter()
                .filter(|p| p[d] == 0.0 || p[d] == 1.0)
                .count();
            assert!(on_face < 5, "dimension {d} has {on_face} draws on a face");
        }
    }

    fn melo_bounds() -> Bounds {
        Bounds::new(&[(0.0, 0.5), (0.0, 0.5), (0.0, 15.0), (0.0, 0.5)]).unwrap()
    }

    /// Quadratic bowl with its minimum at `OPTIMUM` in unit coordinates.
    fn bowl(bounds: &Bounds) -> impl Fn(&[f64]) -> Result<f64, TrainingError> + Sync + '_ {
        move |x: &[f64]| {
            let unit = bounds.normalize(x);
            Ok(1.0 + unit
                .iter()
                .zip(OPTIMUM)
                .map(|(u, o)| (u - o).powi(2))
                .sum::<f64>())
        }
    }

    fn unit_distance(bounds: &Bounds, point: &[f64]) -> f64 {
        bounds
            .normalize(point)
            .iter()
            .zip(OPTIMUM)
            .map(|(u, o)| (u - o).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    #[test]
    fn exhaustive_finds_global_minimum() {
        let bounds = melo_bounds();
        let search = ExhaustiveSearch::new(2000).with_parallelism(4).with_seed(17);
        let outcome = search.optimize(&bowl(&bounds), &bounds).unwrap();

        assert_eq!(outcome.evaluations, 2000);
        assert!(bounds.contains(&outcome.best));
        assert!(unit_distance(&bounds, &outcome.best) < 0.2);
    }

    #[test]
    fn exhaustive_best_beats_every_sample() {
        let bounds = melo_bounds();
        let outcome = ExhaustiveSearch::new(1000)
            .with_seed(5)
            .optimize(&bowl(&bounds), &bounds)
            .unwrap();

        for observation in &outcome.observations {
            assert!(bounds.contains(&observation.point));
            let value = observation.objective().unwrap();
            assert!(outcome.objective - value <= f64::EPSILON * value.abs().max(1.0));
        }
    }

    #[test]
    fn exhaustive_ties_prefer_first_candidate() {
        let bounds = melo_bounds();
        let flat = |_: &[f64]| Ok::<_, TrainingError>(1.0);
        let outcome = ExhaustiveSearch::new(50)
            .with_seed(9)
            .optimize(&flat, &bounds)
            .unwrap();

        assert_eq!(outcome.best, outcome.observations[0].point);
    }

    #[test]
    fn exhaustive_absorbs_training_failures() {
        let bounds = melo_bounds();
        // Reject the upper half of k.
        let partial = |x: &[f64]| {
            if x[0] > 0.25 {
                Err(TrainingError::Rejected {
                    message: "k too large".into(),
                })
            } else {
                Ok(x[0])
            }
        };
        let outcome = ExhaustiveSearch::new(100)
            .with_seed(2)
            .optimize(&partial, &bounds)
            .unwrap();

        assert!(outcome.failures > 0);
        assert!(outcome.best[0] <= 0.25);
    }

    #[test]
    fn all_failures_abort_the_run() {
        let bounds = melo_bounds();
        let broken = |_: &[f64]| Ok::<_, TrainingError>(f64::NAN);

        let exhaustive = ExhaustiveSearch::new(20).optimize(&broken, &bounds);
        assert!(matches!(
            exhaustive,
            Err(CalError::OptimizationFailed { evaluations: 20, .. })
        ));

        let bayesian = BayesianSearch::new(15).with_seed(1).optimize(&broken, &bounds);
        assert!(matches!(
            bayesian,
            Err(CalError::OptimizationFailed { evaluations: 15, .. })
        ));
    }

    #[test]
    fn bayesian_respects_budget_and_bounds() {
        let bounds = melo_bounds();
        let calls = AtomicUsize::new(0);
        let counted = |x: &[f64]| {
            calls.fetch_add(1, Ordering::SeqCst);
            bowl(&bounds)(x)
        };

        let outcome = BayesianSearch::new(25)
            .with_seed(3)
            .optimize(&counted, &bounds)
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 25);
        assert_eq!(outcome.evaluations, 25);
        for observation in &outcome.observations {
            assert!(bounds.contains(&observation.point));
        }
    }

    #[test]
    fn bayesian_beats_random_baseline() {
        let bounds = melo_bounds();
        let objective = bowl(&bounds);

        for seed in [1_u64, 2, 3] {
            let outcome = BayesianSearch::new(40)
                .with_seed(seed)
                .optimize(&objective, &bounds)
                .unwrap();

            let mut rng = StdRng::seed_from_u64(seed);
            let random_best = (0..40)
                .map(|_| {
                    let point: Vec<f64> = bounds
                        .intervals()
                        .iter()
                        .map(|i| rng.random_range(i.min..=i.max))
                        .collect();
                    objective(&point).unwrap()
                })
                .fold(f64::INFINITY, f64::min);

            assert!(
                outcome.objective <= random_best,
                "seed {seed}: surrogate {} vs random {}",
                outcome.objective,
                random_best
            );
        }
    }

    #[test]
    fn bayesian_evaluates_initial_points_first() {
        let bounds = melo_bounds();
        let prior = vec![0.286, 0.38, 4.0, 0.03];
        let outcome = BayesianSearch::new(12)
            .with_seed(4)
            .with_initial_points(vec![prior.clone()])
            .optimize(&bowl(&bounds), &bounds)
            .unwrap();

        assert_eq!(outcome.observations[0].point, prior);
    }

    #[test]
    fn bayesian_rejects_out_of_bounds_initial_points() {
        let bounds = melo_bounds();
        let result = BayesianSearch::new(5)
            .with_initial_points(vec![vec![1.0, 0.0, 0.0, 0.0]])
            .optimize(&bowl(&bounds), &bounds);
        assert!(matches!(result, Err(CalError::Validation(_))));
    }

    #[test]
    fn strategy_config_serde() {
        let config: StrategyConfig =
            serde_json::from_str(r#"{"kind":"exhaustive","samples":1000,"parallelism":2}"#)
                .unwrap();
        assert_eq!(
            config,
            StrategyConfig::Exhaustive {
                samples: 1000,
                parallelism: 2
            }
        );

        let default: StrategyConfig = serde_json::from_str(r#"{"kind":"bayesian","budget":40}"#).unwrap();
        assert_eq!(default, StrategyConfig::default());
        assert_eq!(default.build(Some(1), Vec::new()).name(), "bayesian");
    }
}
