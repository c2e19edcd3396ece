//! Forecasting modes and the table describing how each one is calibrated.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::{CalError, CalResult};
use crate::game::Game;
use crate::params::{Bounds, ParameterVector};
use crate::regression::{RegressionRule, TimeUnit};
use crate::{config_error, validation_error};

/// Forecasting target. Partition key for the calibration cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Spread,
    Total,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Spread, Mode::Total];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spread => "Spread",
            Self::Total => "Total",
        }
    }

    /// Lowercased name used for cache file naming.
    pub fn cache_key(&self) -> String {
        self.as_str().to_lowercase()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cache_key())
    }
}

impl FromStr for Mode {
    type Err = CalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "spread" => Ok(Self::Spread),
            "total" => Ok(Self::Total),
            _ => Err(CalError::UnknownMode(s.to_string())),
        }
    }
}

/// Which historical value a mode trains on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetColumn {
    /// Home points minus away points.
    PointDifferential,
    /// Home points plus away points.
    PointTotal,
}

impl TargetColumn {
    pub fn value(&self, game: &Game) -> f64 {
        match self {
            Self::PointDifferential => game.point_differential(),
            Self::PointTotal => game.point_total(),
        }
    }
}

/// Evenly spaced outcome lines in `[start, stop)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeGrid {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl OutcomeGrid {
    pub fn new(start: f64, stop: f64, step: f64) -> Self {
        Self { start, stop, step }
    }

    /// Upper limit on the number of lines a grid may expand to.
    pub const MAX_LINES: usize = 100_000;

    /// Number of lines, or 0 for grids that [`OutcomeGrid::validate`]
    /// rejects.
    pub fn len(&self) -> usize {
        match self.line_count() {
            Some(count) if count <= Self::MAX_LINES => count,
            _ => 0,
        }
    }

    fn line_count(&self) -> Option<usize> {
        let finite = self.start.is_finite() && self.stop.is_finite() && self.step.is_finite();
        if !finite || self.step <= 0.0 || self.stop <= self.start {
            return None;
        }
        let count = ((self.stop - self.start) / self.step).ceil();
        if count.is_finite() && count <= Self::MAX_LINES as f64 {
            Some(count as usize)
        } else {
            None
        }
    }

    /// Finite bounds, a positive step and at most [`OutcomeGrid::MAX_LINES`] lines.
    pub fn validate(&self) -> CalResult<()> {
        if !(self.start.is_finite() && self.stop.is_finite() && self.step.is_finite()) {
            return Err(config_error!(
                "outcome grid {}..{} step {} is not finite",
                self.start,
                self.stop,
                self.step
            ));
        }
        if self.step <= 0.0 {
            return Err(config_error!("outcome grid step {} must be positive", self.step));
        }
        if self.stop <= self.start {
            return Err(config_error!(
                "outcome grid {}..{} is empty",
                self.start,
                self.stop
            ));
        }
        if self.line_count().is_none() {
            return Err(config_error!(
                "outcome grid {}..{} step {} exceeds {} lines",
                self.start,
                self.stop,
                self.step,
                Self::MAX_LINES
            ));
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn values(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| self.start + i as f64 * self.step)
            .collect()
    }
}

/// Everything that distinguishes one mode's calibration from another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeProfile {
    pub target: TargetColumn,
    /// Whether swapping the two teams leaves the target unchanged.
    pub commutes: bool,
    pub lines: OutcomeGrid,
    pub bounds: Bounds,
    /// Threshold and unit of the regression rule; the rate is calibrated.
    pub regression: RegressionRule,
    /// Known-good vector used to warm-start the surrogate search.
    #[serde(default)]
    pub prior: Option<ParameterVector>,
}

impl ModeProfile {
    fn default_bounds() -> Bounds {
        Bounds::from_static(&[(0.0, 0.5), (0.0, 0.5), (0.0, 15.0), (0.0, 0.5)])
    }

    /// Default profile for `mode`. The `match` is exhaustive so adding a
    /// mode without a profile does not compile.
    pub fn defaults_for(mode: Mode) -> Self {
        match mode {
            Mode::Spread => Self {
                target: TargetColumn::PointDifferential,
                commutes: false,
                lines: OutcomeGrid::new(-70.5, 71.5, 1.0),
                bounds: Self::default_bounds(),
                regression: RegressionRule::new(3.0, 0.0, TimeUnit::Month),
                prior: Some(ParameterVector::new(0.286, 0.38, 4.0, 0.03)),
            },
            Mode::Total => Self {
                target: TargetColumn::PointTotal,
                commutes: true,
                lines: OutcomeGrid::new(-0.5, 300.5, 1.0),
                bounds: Self::default_bounds(),
                regression: RegressionRule::new(3.0, 0.0, TimeUnit::Month),
                prior: None,
            },
        }
    }

    pub fn validate(&self, mode: Mode) -> CalResult<()> {
        if self.bounds.dim() != ParameterVector::DIM {
            return Err(config_error!(
                "{} bounds have {} dimensions, expected {}",
                mode,
                self.bounds.dim(),
                ParameterVector::DIM
            ));
        }
        self.lines.validate().map_err(|e| match e {
            CalError::Config(message) => config_error!("{} {}", mode, message),
            other => other,
        })?;
        if let Some(prior) = &self.prior {
            if !self.bounds.contains(&prior.to_array()) {
                return Err(config_error!("{} prior {} lies outside its bounds", mode, prior));
            }
        }
        Ok(())
    }

    /// Check that a parameter vector may be handed to the model factory.
    pub fn check_in_bounds(&self, mode: Mode, params: &ParameterVector) -> CalResult<()> {
        if self.bounds.contains(&params.to_array()) {
            Ok(())
        } else {
            Err(validation_error!("{} parameters {} outside bounds", mode, params))
        }
    }
}

/// Registry of calibratable modes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModeTable {
    profiles: BTreeMap<Mode, ModeProfile>,
}

impl ModeTable {
    pub fn empty() -> Self {
        Self {
            profiles: BTreeMap::new(),
        }
    }

    pub fn with_profile(mut self, mode: Mode, profile: ModeProfile) -> Self {
        self.profiles.insert(mode, profile);
        self
    }

    pub fn profile(&self, mode: Mode) -> CalResult<&ModeProfile> {
        self.profiles
            .get(&mode)
            .ok_or_else(|| CalError::UnknownMode(mode.to_string()))
    }

    pub fn bounds(&self, mode: Mode) -> CalResult<&Bounds> {
        Ok(&self.profile(mode)?.bounds)
    }

    /// Registered modes in stable order.
    pub fn modes(&self) -> Vec<Mode> {
        self.profiles.keys().copied().collect()
    }

    pub fn validate(&self) -> CalResult<()> {
        for (mode, profile) in &self.profiles {
            profile.validate(*mode)?;
        }
        Ok(())
    }
}

impl Default for ModeTable {
    fn default() -> Self {
        Mode::ALL.iter().fold(Self::empty(), |table, &mode| {
            table.with_profile(mode, ModeProfile::defaults_for(mode))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("spread".parse::<Mode>().unwrap(), Mode::Spread);
        assert_eq!("Total".parse::<Mode>().unwrap(), Mode::Total);
        match "moneyline".parse::<Mode>() {
            Err(CalError::UnknownMode(name)) => assert_eq!(name, "moneyline"),
            other => panic!("expected UnknownMode, got {other:?}"),
        }
        assert_eq!(Mode::Spread.cache_key(), "spread");
    }

    #[test]
    fn test_spread_grid_matches_half_point_lines() {
        let grid = ModeProfile::defaults_for(Mode::Spread).lines;
        let values = grid.values();
        assert_eq!(values.len(), 142);
        assert_eq!(values[0], -70.5);
        assert_eq!(values[141], 70.5);
    }

    #[test]
    fn test_oversized_or_non_finite_grids_rejected() {
        for lines in [
            OutcomeGrid::new(-70.5, 1e300, 1.0),
            OutcomeGrid::new(-70.5, f64::INFINITY, 1.0),
            OutcomeGrid::new(f64::NAN, 71.5, 1.0),
            OutcomeGrid::new(-70.5, 71.5, 0.0),
            OutcomeGrid::new(-70.5, 71.5, -1.0),
            OutcomeGrid::new(71.5, -70.5, 1.0),
        ] {
            assert!(lines.validate().is_err(), "accepted {lines:?}");
            assert_eq!(lines.len(), 0);
            assert!(lines.values().is_empty());

            let profile = ModeProfile {
                lines,
                ..ModeProfile::defaults_for(Mode::Spread)
            };
            let table = ModeTable::empty().with_profile(Mode::Spread, profile);
            assert!(matches!(table.validate(), Err(CalError::Config(_))));
        }

        let widest = OutcomeGrid::new(0.0, OutcomeGrid::MAX_LINES as f64, 1.0);
        assert!(widest.validate().is_ok());
        assert_eq!(widest.len(), OutcomeGrid::MAX_LINES);
    }

    #[test]
    fn test_total_grid_is_broader() {
        let spread = ModeProfile::defaults_for(Mode::Spread).lines;
        let total = ModeProfile::defaults_for(Mode::Total).lines;
        assert!(total.len() > spread.len());
    }

    #[test]
    fn test_target_columns() {
        let game = Game::new(
            NaiveDate::from_ymd_opt(2015, 1, 3).unwrap(),
            "Duke",
            "UNC",
            80.0,
            72.0,
            false,
        );
        assert_eq!(TargetColumn::PointDifferential.value(&game), 8.0);
        assert_eq!(TargetColumn::PointTotal.value(&game), 152.0);
    }

    #[test]
    fn test_default_table_is_valid() {
        let table = ModeTable::default();
        table.validate().unwrap();
        assert_eq!(table.modes(), vec![Mode::Spread, Mode::Total]);
        assert!(!table.profile(Mode::Spread).unwrap().commutes);
        assert!(table.profile(Mode::Total).unwrap().commutes);
    }

    #[test]
    fn test_unregistered_mode() {
        let table = ModeTable::empty()
            .with_profile(Mode::Spread, ModeProfile::defaults_for(Mode::Spread));
        assert!(matches!(
            table.bounds(Mode::Total),
            Err(CalError::UnknownMode(_))
        ));
    }

    #[test]
    fn test_profile_validation_rejects_wrong_dimension() {
        let mut profile = ModeProfile::defaults_for(Mode::Total);
        profile.bounds = Bounds::new(&[(0.0, 1.0)]).unwrap();
        assert!(profile.validate(Mode::Total).is_err());
    }

    #[test]
    fn test_table_serde_round_trip() {
        let table = ModeTable::default();
        let json = serde_json::to_string_pretty(&table).unwrap();
        assert!(json.contains("\"spread\""));
        let back: ModeTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }
}
