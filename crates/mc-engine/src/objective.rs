use mc_optimizer::{checked, Objective};
use mc_types::{CalError, HistoricalData, Mode, ParameterVector, TrainingError};

use crate::factory::ModelFactory;
use crate::model::{RatingEngine, RatingModel};

/// In-sample predictive entropy of the model built from a candidate point.
pub struct EntropyObjective<'a, E> {
    factory: &'a ModelFactory<E>,
    mode: Mode,
    data: &'a HistoricalData,
}

impl<'a, E: RatingEngine> EntropyObjective<'a, E> {
    pub fn new(factory: &'a ModelFactory<E>, mode: Mode, data: &'a HistoricalData) -> Self {
        Self {
            factory,
            mode,
            data,
        }
    }
}

impl<E: RatingEngine> Objective for EntropyObjective<'_, E> {
    fn evaluate(&self, point: &[f64]) -> Result<f64, TrainingError> {
        let params = ParameterVector::from_slice(point).map_err(rejected)?;
        tracing::debug!("Evaluating {} at {}", self.mode, params);

        let model = self
            .factory
            .build(self.mode, &params, self.data)
            .map_err(|e| match e {
                CalError::Training(err) => err,
                other => rejected(other),
            })?;
        checked(Ok(model.entropy()))
    }
}

fn rejected(error: CalError) -> TrainingError {
    TrainingError::Rejected {
        message: error.to_string(),
    }
}
