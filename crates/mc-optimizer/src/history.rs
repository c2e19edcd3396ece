//! Observation tracking and run outcomes.

use chrono::{DateTime, Utc};
use mc_types::{CalError, CalResult, TrainingError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique optimization run identifier.
pub type RunId = Uuid;

/// One evaluated point.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub index: usize,
    pub point: Vec<f64>,
    pub outcome: Result<f64, TrainingError>,
    pub recorded_at: DateTime<Utc>,
}

impl Observation {
    pub fn objective(&self) -> Option<f64> {
        self.outcome.as_ref().ok().copied()
    }
}

/// Append-only record of a run with a running best.
///
/// Ties keep the earliest observation, so a run replayed with the same seed
/// picks the same winner.
#[derive(Debug, Clone)]
pub struct SearchHistory {
    run_id: RunId,
    strategy: String,
    observations: Vec<Observation>,
    best: Option<usize>,
    failures: usize,
    started_at: DateTime<Utc>,
}

impl SearchHistory {
    pub fn new(strategy: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            strategy: strategy.to_string(),
            observations: Vec::new(),
            best: None,
            failures: 0,
            started_at: Utc::now(),
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Record a finished evaluation and update the running best.
    pub fn record(&mut self, point: Vec<f64>, outcome: Result<f64, TrainingError>) {
        let index = self.observations.len();

        match &outcome {
            Ok(value) => {
                let improves = match self.best() {
                    None => true,
                    Some((_, best)) => strictly_better(*value, best),
                };
                if improves {
                    self.best = Some(index);
                }
            }
            Err(e) => {
                self.failures += 1;
                tracing::warn!("Evaluation {} failed at {:?}: {}", index, point, e);
            }
        }

        self.observations.push(Observation {
            index,
            point,
            outcome,
            recorded_at: Utc::now(),
        });
    }

    pub fn best(&self) -> Option<(&[f64], f64)> {
        let observation = &self.observations[self.best?];
        observation
            .objective()
            .map(|value| (observation.point.as_slice(), value))
    }

    /// Successful observations as `(point, objective)` pairs.
    pub fn successes(&self) -> impl Iterator<Item = (&[f64], f64)> {
        self.observations
            .iter()
            .filter_map(|o| o.objective().map(|value| (o.point.as_slice(), value)))
    }

    /// Close the run. Fails when no evaluation produced a usable value.
    pub fn finish(self) -> CalResult<SearchOutcome> {
        let evaluations = self.observations.len();
        let best = match self.best {
            Some(index) => index,
            None => {
                let last_error = self
                    .observations
                    .iter()
                    .rev()
                    .find_map(|o| o.outcome.as_ref().err())
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "no evaluations were run".to_string());
                return Err(CalError::OptimizationFailed {
                    evaluations,
                    last_error,
                });
            }
        };

        let winner = &self.observations[best];
        let objective = winner.objective().unwrap_or(f64::INFINITY);
        let point = winner.point.clone();

        Ok(SearchOutcome {
            run_id: self.run_id,
            strategy: self.strategy,
            best: point,
            objective,
            evaluations,
            failures: self.failures,
            started_at: self.started_at,
            finished_at: Utc::now(),
            observations: self.observations,
        })
    }
}

/// `value` beats `best` by more than floating-point noise. Values within
/// one relative epsilon are ties, and ties keep the earlier observation.
fn strictly_better(value: f64, best: f64) -> bool {
    value < best - f64::EPSILON * best.abs().max(1.0)
}

/// Result of a completed search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub run_id: RunId,
    pub strategy: String,
    pub best: Vec<f64>,
    pub objective: f64,
    pub evaluations: usize,
    pub failures: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(skip)]
    pub observations: Vec<Observation>,
}

impl SearchOutcome {
    pub fn duration_seconds(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}
