//! Synthetic rating engine shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;
use mc_types::{Game, HistoricalData, TrainingError};

use crate::model::{ModelConfig, RatingEngine, RatingModel};

/// Optimum of [`BowlEngine`]'s entropy surface, as `[k, bias, smooth, regress]`.
pub const BOWL_OPTIMUM: [f64; 4] = [0.3, 0.2, 6.0, 0.1];
const BOWL_WIDTHS: [f64; 4] = [0.5, 0.5, 15.0, 0.5];

/// Engine whose entropy is a quadratic bowl around [`BOWL_OPTIMUM`].
#[derive(Debug, Default)]
pub struct BowlEngine {
    fits: AtomicUsize,
    fail_all: bool,
}

impl BowlEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    pub fn fits(&self) -> usize {
        self.fits.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct BowlModel {
    entropy: f64,
    values: Vec<f64>,
}

impl RatingModel for BowlModel {
    fn entropy(&self) -> f64 {
        self.entropy
    }

    fn residuals(&self, standardize: bool) -> Vec<f64> {
        let n = self.values.len() as f64;
        let mean = self.values.iter().sum::<f64>() / n;
        let residuals: Vec<f64> = self.values.iter().map(|v| v - mean).collect();
        if !standardize {
            return residuals;
        }
        let std = (residuals.iter().map(|r| r * r).sum::<f64>() / n).sqrt();
        residuals.iter().map(|r| r / std).collect()
    }

    fn quantiles(&self) -> Vec<f64> {
        let n = self.values.len() as f64;
        (0..self.values.len())
            .map(|i| (i as f64 + 0.5) / n)
            .collect()
    }
}

impl RatingEngine for BowlEngine {
    type Model = BowlModel;

    fn fit(&self, config: ModelConfig) -> Result<BowlModel, TrainingError> {
        self.fits.fetch_add(1, Ordering::SeqCst);
        if self.fail_all {
            return Err(TrainingError::Rejected {
                message: "synthetic failure".to_string(),
            });
        }

        let bias = config.bias.iter().cloned().fold(0.0, f64::max);
        let point = [config.k, bias, config.smooth, config.regress.rate];
        let entropy = 1.0
            + point
                .iter()
                .zip(BOWL_OPTIMUM.iter().zip(BOWL_WIDTHS.iter()))
                .map(|(p, (o, w))| ((p - o) / w).powi(2))
                .sum::<f64>();

        Ok(BowlModel {
            entropy,
            values: config.values,
        })
    }
}

pub fn sample_games() -> HistoricalData {
    let day = |d| NaiveDate::from_ymd_opt(2015, 1, d).unwrap();
    HistoricalData::new(vec![
        Game::new(day(3), "Duke", "UNC", 80.0, 72.0, false),
        Game::new(day(5), "Kansas", "Baylor", 66.0, 70.0, true),
        Game::new(day(7), "Gonzaga", "Duke", 75.0, 75.0, false),
        Game::new(day(9), "UNC", "Kansas", 61.0, 83.0, false),
    ])
}

pub const SAMPLE_CSV: &str = "\
date,home,away,home_points,away_points,neutral
2015-01-03,Duke,UNC,80,72,false
2015-01-05,Kansas,Baylor,66,70,true
2015-01-07,Gonzaga,Duke,75,75,false
2015-01-09,UNC,Kansas,61,83,false
";
