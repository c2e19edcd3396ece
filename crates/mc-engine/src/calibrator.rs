use mc_data::CalibrationCache;
use mc_optimizer::{SearchOutcome, StrategyConfig};
use mc_types::{CalError, CalResult, HistoricalData, Mode, ParameterVector};
use rayon::prelude::*;
use serde::Serialize;

use crate::config::CalibrationConfig;
use crate::factory::ModelFactory;
use crate::model::{RatingEngine, RatingModel};
use crate::objective::EntropyObjective;

/// Winning parameters of one optimizer run.
#[derive(Debug, Clone, Serialize)]
pub struct Calibration {
    pub mode: Mode,
    pub parameters: ParameterVector,
    pub outcome: SearchOutcome,
}

/// Calibrates rating models per mode and persists the winners.
#[derive(Debug)]
pub struct Calibrator<E> {
    factory: ModelFactory<E>,
    cache: CalibrationCache,
    strategy: StrategyConfig,
    seed: Option<u64>,
}

impl<E: RatingEngine> Calibrator<E> {
    pub fn new(factory: ModelFactory<E>, cache: CalibrationCache, strategy: StrategyConfig) -> Self {
        Self {
            factory,
            cache,
            strategy,
            seed: None,
        }
    }

    /// Wire a calibrator from loaded settings.
    pub fn from_config(engine: E, config: &CalibrationConfig) -> CalResult<Self> {
        config.validate()?;
        let factory = ModelFactory::new(engine, config.modes.clone())?;
        let cache = CalibrationCache::new(config.resolve_cache_dir());
        let calibrator = Self::new(factory, cache, config.strategy.clone());
        Ok(match config.seed {
            Some(seed) => calibrator.with_seed(seed),
            None => calibrator,
        })
    }

    /// Fix the optimizer's random stream for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn factory(&self) -> &ModelFactory<E> {
        &self.factory
    }

    pub fn cache(&self) -> &CalibrationCache {
        &self.cache
    }

    pub fn strategy(&self) -> &StrategyConfig {
        &self.strategy
    }

    /// Entropy of the model built from `params`.
    pub fn evaluate(
        &self,
        mode: Mode,
        params: &ParameterVector,
        data: &HistoricalData,
    ) -> CalResult<f64> {
        let model = self.factory.build(mode, params, data)?;
        let entropy = mc_optimizer::checked(Ok(model.entropy()))?;
        Ok(entropy)
    }

    /// Search the mode's bounds for the entropy-minimizing parameters.
    ///
    /// The mode's prior, when it has one, is evaluated before any sampled
    /// point.
    pub fn optimize(&self, mode: Mode, data: &HistoricalData) -> CalResult<Calibration> {
        let profile = self.factory.modes().profile(mode)?;
        let initial_points = profile
            .prior
            .map(|prior| vec![prior.to_array().to_vec()])
            .unwrap_or_default();

        let strategy = self.strategy.build(self.seed, initial_points);
        let objective = EntropyObjective::new(&self.factory, mode, data);

        tracing::info!(
            "Calibrating {} with {} over {} games",
            mode,
            strategy.name(),
            data.len()
        );
        let outcome = strategy.optimize(&objective, &profile.bounds)?;
        let parameters = ParameterVector::from_slice(&outcome.best)?;

        tracing::info!(
            "Calibrated {}: {} (entropy {:.6}, {} evaluations, {} failed, {:.2}s)",
            mode,
            parameters,
            outcome.objective,
            outcome.evaluations,
            outcome.failures,
            outcome.duration_seconds()
        );

        Ok(Calibration {
            mode,
            parameters,
            outcome,
        })
    }

    /// Return a model for `mode`, reusing the cached calibration unless
    /// `retrain` is set or no usable entry exists.
    ///
    /// A fresh calibration is written to the cache before the model is
    /// built. Failed optimizations leave the cache untouched.
    pub fn get_or_train(
        &self,
        mode: Mode,
        data: &HistoricalData,
        retrain: bool,
    ) -> CalResult<E::Model> {
        let bounds = self.factory.modes().bounds(mode)?;

        if !retrain {
            if let Some(params) = self.cache.load_within(mode, bounds) {
                return self.factory.build(mode, &params, data);
            }
        }

        let calibration = self.optimize(mode, data)?;
        self.cache.store(mode, &calibration.parameters)?;
        self.factory.build(mode, &calibration.parameters, data)
    }

    /// [`Calibrator::get_or_train`] for each of `modes` in parallel.
    /// Results keep the order of `modes`.
    pub fn calibrate_modes(
        &self,
        modes: &[Mode],
        data: &HistoricalData,
        retrain: bool,
    ) -> Vec<(Mode, CalResult<E::Model>)> {
        modes
            .par_iter()
            .map(|&mode| (mode, self.get_or_train(mode, data, retrain)))
            .collect()
    }

    /// Calibrate every registered mode.
    pub fn calibrate_all(
        &self,
        data: &HistoricalData,
        retrain: bool,
    ) -> Vec<(Mode, CalResult<E::Model>)> {
        let modes = self.factory.modes().modes();
        self.calibrate_modes(&modes, data, retrain)
    }

    /// Drop the cached calibration for `mode`.
    pub fn invalidate(&self, mode: Mode) -> CalResult<()> {
        if !self.factory.modes().modes().contains(&mode) {
            return Err(CalError::UnknownMode(mode.to_string()));
        }
        self.cache.invalidate(mode)
    }
}
