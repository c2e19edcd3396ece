//! Gaussian-process surrogate and expected-improvement acquisition.

/// Length scales tried when fitting, in unit-cube coordinates.
const LENGTH_SCALES: [f64; 7] = [0.05, 0.1, 0.2, 0.3, 0.5, 0.8, 1.2];

/// Diagonal jitter escalation for ill-conditioned kernels.
const JITTERS: [f64; 4] = [1e-8, 1e-6, 1e-4, 1e-2];

// ---------- normal distribution ----------

/// Standard normal cumulative distribution function (Abramowitz & Stegun 26.2.17).
fn norm_cdf(x: f64) -> f64 {
    if x >= 8.0 {
        return 1.0;
    }
    if x <= -8.0 {
        return 0.0;
    }

    let a1 = 0.254829592_f64;
    let a2 = -0.284496736_f64;
    let a3 = 1.421413741_f64;
    let a4 = -1.453152027_f64;
    let a5 = 1.061405429_f64;
    let p = 0.3275911_f64;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let z = x.abs() / std::f64::consts::SQRT_2;
    let t = 1.0 / (1.0 + p * z);
    let erf = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-z * z).exp();

    0.5 * (1.0 + sign * erf)
}

/// Standard normal probability density function.
fn norm_pdf(x: f64) -> f64 {
    const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Expected improvement below `best` for a Gaussian prediction.
///
/// `xi` shifts the target to favour exploration.
pub fn expected_improvement(mean: f64, std: f64, best: f64, xi: f64) -> f64 {
    let improvement = best - mean - xi;
    if std <= 1e-12 {
        return improvement.max(0.0);
    }
    let z = improvement / std;
    (improvement * norm_cdf(z) + std * norm_pdf(z)).max(0.0)
}

// ---------- dense linear algebra for small systems ----------

fn cholesky(matrix: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = matrix.len();
    let mut lower = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let mut sum = matrix[i][j];
            for k in 0..j {
                sum -= lower[i][k] * lower[j][k];
            }
            if i == j {
                if !(sum > 0.0) || !sum.is_finite() {
                    return None;
                }
                lower[i][i] = sum.sqrt();
            } else {
                lower[i][j] = sum / lower[j][j];
            }
        }
    }

    Some(lower)
}

/// Solve `L y = b`.
fn forward_solve(lower: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = b.len();
    let mut y = vec![0.0; n];
    for i in 0..n {
        let sum: f64 = (0..i).map(|k| lower[i][k] * y[k]).sum();
        y[i] = (b[i] - sum) / lower[i][i];
    }
    y
}

/// Solve `Lᵀ x = y`.
fn backward_solve(lower: &[Vec<f64>], y: &[f64]) -> Vec<f64> {
    let n = y.len();
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let sum: f64 = (i + 1..n).map(|k| lower[k][i] * x[k]).sum();
        x[i] = (y[i] - sum) / lower[i][i];
    }
    x
}

fn squared_exponential(a: &[f64], b: &[f64], length_scale: f64) -> f64 {
    let dist2: f64 = a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum();
    (-0.5 * dist2 / (length_scale * length_scale)).exp()
}

/// Zero-mean GP with unit signal variance over standardised targets.
#[derive(Debug, Clone)]
pub struct GaussianProcess {
    inputs: Vec<Vec<f64>>,
    lower: Vec<Vec<f64>>,
    alpha: Vec<f64>,
    length_scale: f64,
    noise: f64,
    y_mean: f64,
    y_std: f64,
    log_likelihood: f64,
}

impl GaussianProcess {
    /// Fit to `(input, target)` pairs, choosing the length scale with the
    /// highest log marginal likelihood. Returns `None` when no kernel in the
    /// grid could be factorized.
    pub fn fit(inputs: &[Vec<f64>], targets: &[f64]) -> Option<Self> {
        let n = targets.len();
        if n == 0 || inputs.len() != n {
            return None;
        }

        let y_mean = targets.iter().sum::<f64>() / n as f64;
        let variance = targets.iter().map(|y| (y - y_mean).powi(2)).sum::<f64>() / n as f64;
        let y_std = if variance.sqrt() > 1e-12 {
            variance.sqrt()
        } else {
            1.0
        };
        let z: Vec<f64> = targets.iter().map(|y| (y - y_mean) / y_std).collect();

        let mut best: Option<Self> = None;
        for &length_scale in &LENGTH_SCALES {
            let Some((lower, noise)) = Self::factorize(inputs, length_scale) else {
                continue;
            };

            let alpha = backward_solve(&lower, &forward_solve(&lower, &z));
            let data_fit: f64 = z.iter().zip(&alpha).map(|(a, b)| a * b).sum();
            let log_det: f64 = (0..n).map(|i| lower[i][i].ln()).sum();
            let log_likelihood = -0.5 * data_fit
                - log_det
                - 0.5 * n as f64 * (2.0 * std::f64::consts::PI).ln();

            if !log_likelihood.is_finite() {
                continue;
            }
            let better = best
                .as_ref()
                .map_or(true, |current| log_likelihood > current.log_likelihood);
            if better {
                best = Some(Self {
                    inputs: inputs.to_vec(),
                    lower,
                    alpha,
                    length_scale,
                    noise,
                    y_mean,
                    y_std,
                    log_likelihood,
                });
            }
        }

        best
    }

    fn factorize(inputs: &[Vec<f64>], length_scale: f64) -> Option<(Vec<Vec<f64>>, f64)> {
        let n = inputs.len();
        let mut kernel = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in 0..=i {
                let k = squared_exponential(&inputs[i], &inputs[j], length_scale);
                kernel[i][j] = k;
                kernel[j][i] = k;
            }
        }

        JITTERS.iter().find_map(|&jitter| {
            let mut jittered = kernel.clone();
            for (i, row) in jittered.iter_mut().enumerate() {
                row[i] += jitter;
            }
            cholesky(&jittered).map(|lower| (lower, jitter))
        })
    }

    pub fn length_scale(&self) -> f64 {
        self.length_scale
    }

    /// Posterior mean and standard deviation in the original target units.
    pub fn predict(&self, x: &[f64]) -> (f64, f64) {
        let k_star: Vec<f64> = self
            .inputs
            .iter()
            .map(|xi| squared_exponential(xi, x, self.length_scale))
            .collect();

        let mean_z: f64 = k_star.iter().zip(&self.alpha).map(|(k, a)| k * a).sum();
        let v = forward_solve(&self.lower, &k_star);
        let var_z = (1.0 + self.noise - v.iter().map(|x| x * x).sum::<f64>()).max(1e-12);

        (
            self.y_mean + self.y_std * mean_z,
            self.y_std * var_z.sqrt(),
        )
    }
}
