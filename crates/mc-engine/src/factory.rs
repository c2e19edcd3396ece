use mc_types::{CalResult, HistoricalData, Mode, ModeTable, ParameterVector, TrainingError};

use crate::model::{ModelConfig, RatingEngine};

/// Maps `(mode, parameters, games)` to a configured rating model.
///
/// Construction is pure; the same inputs always yield the same
/// [`ModelConfig`].
#[derive(Debug)]
pub struct ModelFactory<E> {
    engine: E,
    modes: ModeTable,
}

impl<E: RatingEngine> ModelFactory<E> {
    pub fn new(engine: E, modes: ModeTable) -> CalResult<Self> {
        modes.validate()?;
        Ok(Self { engine, modes })
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn modes(&self) -> &ModeTable {
        &self.modes
    }

    /// Model construction input for `mode`.
    pub fn config(
        &self,
        mode: Mode,
        params: &ParameterVector,
        data: &HistoricalData,
    ) -> CalResult<ModelConfig> {
        let profile = self.modes.profile(mode)?;
        profile.check_in_bounds(mode, params)?;
        if data.is_empty() {
            return Err(TrainingError::EmptyData.into());
        }

        let games = data.games();
        Ok(ModelConfig {
            dates: data.dates(),
            home: data.home_teams(),
            away: data.away_teams(),
            values: games.iter().map(|g| profile.target.value(g)).collect(),
            lines: profile.lines.values(),
            k: params.k,
            bias: games
                .iter()
                .map(|g| if g.neutral { 0.0 } else { params.bias })
                .collect(),
            smooth: params.smooth,
            commutes: profile.commutes,
            regress: profile.regression.with_rate(params.regress),
        })
    }

    pub fn build(
        &self,
        mode: Mode,
        params: &ParameterVector,
        data: &HistoricalData,
    ) -> CalResult<E::Model> {
        let config = self.config(mode, params, data)?;
        Ok(self.engine.fit(config)?)
    }
}
