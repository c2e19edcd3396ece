//! Parameter vectors and the boxes that constrain them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{CalError, CalResult};
use crate::validation_error;

/// Tunable rating-model parameters in their fixed positional order
/// `[k, bias, smooth, regress]`.
///
/// The order is part of the cache format and must never change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterVector {
    /// Rating update step size.
    pub k: f64,
    /// Home-court advantage applied to non-neutral games.
    pub bias: f64,
    /// Smoothing of the prior distribution.
    pub smooth: f64,
    /// Regression-to-mean rate once the inactivity threshold is passed.
    pub regress: f64,
}

impl ParameterVector {
    pub const DIM: usize = 4;

    pub fn new(k: f64, bias: f64, smooth: f64, regress: f64) -> Self {
        Self {
            k,
            bias,
            smooth,
            regress,
        }
    }

    pub fn to_array(&self) -> [f64; Self::DIM] {
        [self.k, self.bias, self.smooth, self.regress]
    }

    pub fn from_array(values: [f64; Self::DIM]) -> Self {
        let [k, bias, smooth, regress] = values;
        Self::new(k, bias, smooth, regress)
    }

    /// Build a vector from an ordered slice, rejecting wrong lengths and
    /// non-finite components.
    pub fn from_slice(values: &[f64]) -> CalResult<Self> {
        let array: [f64; Self::DIM] = values.try_into().map_err(|_| {
            validation_error!(
                "expected {} parameters, got {}",
                Self::DIM,
                values.len()
            )
        })?;
        if let Some(bad) = array.iter().find(|v| !v.is_finite()) {
            return Err(validation_error!("non-finite parameter: {}", bad));
        }
        Ok(Self::from_array(array))
    }
}

impl fmt::Display for ParameterVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "k={:.4} bias={:.4} smooth={:.4} regress={:.4}",
            self.k, self.bias, self.smooth, self.regress
        )
    }
}

/// Closed interval for a single dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Ordered per-dimension intervals describing a search box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(f64, f64)>", into = "Vec<(f64, f64)>")]
pub struct Bounds {
    intervals: Vec<Interval>,
}

impl Bounds {
    pub fn new(pairs: &[(f64, f64)]) -> CalResult<Self> {
        if pairs.is_empty() {
            return Err(validation_error!("bounds must not be empty"));
        }

        let mut intervals = Vec::with_capacity(pairs.len());
        for (dim, &(min, max)) in pairs.iter().enumerate() {
            if !min.is_finite() || !max.is_finite() {
                return Err(validation_error!("dimension {} has non-finite bounds", dim));
            }
            if min > max {
                return Err(validation_error!(
                    "dimension {} has min {} greater than max {}",
                    dim,
                    min,
                    max
                ));
            }
            intervals.push(Interval { min, max });
        }

        Ok(Self { intervals })
    }

    /// Built-in tables only; the pairs are known to be ordered and finite.
    pub(crate) fn from_static(pairs: &[(f64, f64)]) -> Self {
        Self {
            intervals: pairs
                .iter()
                .map(|&(min, max)| Interval { min, max })
                .collect(),
        }
    }

    pub fn dim(&self) -> usize {
        self.intervals.len()
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Inclusive membership test; a point of the wrong length is never contained.
    pub fn contains(&self, point: &[f64]) -> bool {
        point.len() == self.dim()
            && self
                .intervals
                .iter()
                .zip(point)
                .all(|(interval, &value)| interval.contains(value))
    }

    /// Map a point of the unit hypercube into the box.
    pub fn rescale(&self, unit: &[f64]) -> Vec<f64> {
        self.intervals
            .iter()
            .zip(unit)
            .map(|(interval, &u)| interval.min + interval.width() * u)
            .collect()
    }

    /// Inverse of [`Bounds::rescale`]; degenerate dimensions map to zero.
    pub fn normalize(&self, point: &[f64]) -> Vec<f64> {
        self.intervals
            .iter()
            .zip(point)
            .map(|(interval, &value)| {
                let width = interval.width();
                if width > 0.0 {
                    (value - interval.min) / width
                } else {
                    0.0
                }
            })
            .collect()
    }
}

impl TryFrom<Vec<(f64, f64)>> for Bounds {
    type Error = CalError;

    fn try_from(pairs: Vec<(f64, f64)>) -> CalResult<Self> {
        Self::new(&pairs)
    }
}

impl From<Bounds> for Vec<(f64, f64)> {
    fn from(bounds: Bounds) -> Self {
        bounds.intervals.iter().map(|i| (i.min, i.max)).collect()
    }
}
