use serde::{Deserialize, Serialize};

use crate::model::RatingModel;

/// Calibration quality of a trained model.
///
/// A well-calibrated model has standardized residuals with mean near 0 and
/// standard deviation near 1, and quantiles close to uniform on `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub entropy: f64,
    pub observations: usize,
    pub residual_mean: f64,
    pub residual_std: f64,
    /// Kolmogorov-Smirnov distance between the quantiles and `U(0, 1)`.
    pub quantile_ks: f64,
}

impl Diagnostics {
    pub fn from_model<M: RatingModel>(model: &M) -> Self {
        let residuals = model.residuals(true);
        let (residual_mean, residual_std) = mean_std(&residuals);

        Self {
            entropy: model.entropy(),
            observations: residuals.len(),
            residual_mean,
            residual_std,
            quantile_ks: ks_uniform(model.quantiles()),
        }
    }
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

fn ks_uniform(mut quantiles: Vec<f64>) -> f64 {
    if quantiles.is_empty() {
        return f64::NAN;
    }
    quantiles.sort_by(f64::total_cmp);
    let n = quantiles.len() as f64;
    quantiles
        .iter()
        .enumerate()
        .map(|(i, &q)| {
            let below = q - i as f64 / n;
            let above = (i + 1) as f64 / n - q;
            below.max(above)
        })
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        residuals: Vec<f64>,
        quantiles: Vec<f64>,
    }

    impl RatingModel for Fixed {
        fn entropy(&self) -> f64 {
            2.5
        }

        fn residuals(&self, _standardize: bool) -> Vec<f64> {
            self.residuals.clone()
        }

        fn quantiles(&self) -> Vec<f64> {
            self.quantiles.clone()
        }
    }

    #[test]
    fn summarizes_residuals_and_quantiles() {
        let model = Fixed {
            residuals: vec![-1.0, 1.0, -1.0, 1.0],
            quantiles: vec![0.875, 0.125, 0.625, 0.375],
        };
        let diagnostics = Diagnostics::from_model(&model);

        assert_eq!(diagnostics.entropy, 2.5);
        assert_eq!(diagnostics.observations, 4);
        assert!(diagnostics.residual_mean.abs() < 1e-12);
        assert!((diagnostics.residual_std - 1.0).abs() < 1e-12);
        assert!((diagnostics.quantile_ks - 0.125).abs() < 1e-12);
    }

    #[test]
    fn skewed_quantiles_have_large_distance() {
        let model = Fixed {
            residuals: vec![0.0],
            quantiles: vec![0.99, 0.98, 0.97, 0.96],
        };
        assert!(Diagnostics::from_model(&model).quantile_ks > 0.9);
    }

    #[test]
    fn empty_model_reports_nan() {
        let model = Fixed {
            residuals: vec![],
            quantiles: vec![],
        };
        let diagnostics = Diagnostics::from_model(&model);
        assert!(diagnostics.residual_mean.is_nan());
        assert!(diagnostics.quantile_ks.is_nan());
    }
}
