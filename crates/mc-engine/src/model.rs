//! Boundary to the external margin-dependent rating model.

use chrono::NaiveDate;
use mc_types::{RegressionRule, TrainingError};

/// Full construction input for one rating model.
///
/// Column vectors are aligned by game index and keep the dataset order.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub dates: Vec<NaiveDate>,
    pub home: Vec<String>,
    pub away: Vec<String>,
    /// Training target per game (differential or total).
    pub values: Vec<f64>,
    /// Outcome lines the model forecasts probabilities for.
    pub lines: Vec<f64>,
    pub k: f64,
    /// Home advantage per game; zero for neutral-site games.
    pub bias: Vec<f64>,
    pub smooth: f64,
    pub commutes: bool,
    pub regress: RegressionRule,
}

/// A trained rating model.
pub trait RatingModel: Send {
    /// In-sample predictive entropy; lower means better calibrated forecasts.
    fn entropy(&self) -> f64;

    /// Observed minus predicted outcomes, optionally divided by the
    /// predicted standard deviation.
    fn residuals(&self, standardize: bool) -> Vec<f64>;

    /// Predicted CDF evaluated at each observed outcome.
    fn quantiles(&self) -> Vec<f64>;
}

/// Trains rating models. Implemented by the wrapped rating library.
pub trait RatingEngine: Send + Sync {
    type Model: RatingModel;

    fn fit(&self, config: ModelConfig) -> Result<Self::Model, TrainingError>;
}

impl<E: RatingEngine + ?Sized> RatingEngine for &E {
    type Model = E::Model;

    fn fit(&self, config: ModelConfig) -> Result<Self::Model, TrainingError> {
        (**self).fit(config)
    }
}
