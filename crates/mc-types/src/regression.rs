//! Regression-to-mean rule applied to ratings after a stretch of inactivity.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Unit in which elapsed time is measured before comparing to the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Week,
    Month,
}

impl TimeUnit {
    /// Length of one unit in seconds. A month is the mean Gregorian month.
    pub fn seconds(&self) -> f64 {
        match self {
            Self::Week => 7.0 * 86_400.0,
            Self::Month => 30.436_875 * 86_400.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

/// Step function: pull a rating toward the mean by `rate` once more than
/// `threshold` units have elapsed since the entity last played.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionRule {
    pub threshold: f64,
    pub rate: f64,
    pub unit: TimeUnit,
}

impl RegressionRule {
    pub fn new(threshold: f64, rate: f64, unit: TimeUnit) -> Self {
        Self {
            threshold,
            rate,
            unit,
        }
    }

    /// Same threshold and unit with a different rate; the rate is the
    /// calibrated `regress` parameter.
    pub fn with_rate(self, rate: f64) -> Self {
        Self { rate, ..self }
    }

    /// Elapsed time expressed in this rule's unit.
    pub fn elapsed_units(&self, elapsed: Duration) -> f64 {
        elapsed.num_seconds() as f64 / self.unit.seconds()
    }

    /// Regression fraction to apply after `elapsed` time.
    pub fn apply(&self, elapsed: Duration) -> f64 {
        if self.elapsed_units(elapsed) > self.threshold {
            self.rate
        } else {
            0.0
        }
    }
}
