use mc_types::TrainingError;

/// Scalar loss over a bounded point; lower is better.
///
/// Implementations may be slow (a full model fit per call) and are shared
/// read-only across worker threads.
pub trait Objective: Sync {
    fn evaluate(&self, point: &[f64]) -> Result<f64, TrainingError>;
}

impl<F> Objective for F
where
    F: Fn(&[f64]) -> Result<f64, TrainingError> + Sync,
{
    fn evaluate(&self, point: &[f64]) -> Result<f64, TrainingError> {
        self(point)
    }
}

/// Turn a non-finite objective value into a training failure.
pub fn checked(result: Result<f64, TrainingError>) -> Result<f64, TrainingError> {
    match result {
        Ok(value) if value.is_finite() => Ok(value),
        Ok(value) => Err(TrainingError::NonFinite { value }),
        Err(e) => Err(e),
    }
}
