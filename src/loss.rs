//! Loss functions.
//!
//! Every loss returns the *mean* over the prediction vector and writes the
//! gradient of that mean with respect to the prediction. The scaling of each
//! variant's gradient is exactly the derivative of its loss formula, so each one
//! passes a central finite-difference check on its own.
//!
//! Typical use:
//!
//! - run [`crate::forward::predict`]
//! - compute `d_loss/d_prediction` via [`Loss::loss_and_gradient`]
//! - run [`crate::backward::backward`]

use crate::error::check_len;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
/// Supported loss functions. `n` is the vector length, `d = prediction - truth`.
pub enum Loss {
    /// `mean(d^2)`
    #[default]
    SquaredDistance,
    /// `mean(|d|)`; the gradient is 0 where `d == 0`.
    ManhattanDistance,
    /// `mean((d / (|truth| + eps))^2)`
    RelativeSquared { eps: f64 },
    /// `mean(ln(1 + d^2))`; large residuals count logarithmically.
    LogSquared,
}

impl Loss {
    /// Validate a loss configuration.
    pub fn validate(self) -> Result<()> {
        if let Loss::RelativeSquared { eps } = self {
            if !(eps.is_finite() && eps >= 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "relative squared eps must be finite and >= 0, got {eps}"
                )));
            }
        }
        Ok(())
    }

    /// Stable lowercase name, used by the model format.
    pub fn name(self) -> &'static str {
        match self {
            Loss::SquaredDistance => "squared_distance",
            Loss::ManhattanDistance => "manhattan_distance",
            Loss::RelativeSquared { .. } => "relative_squared",
            Loss::LogSquared => "log_squared",
        }
    }

    /// Mean loss only.
    pub fn loss(self, prediction: &[f64], truth: &[f64]) -> Result<f64> {
        check_len("loss truth", prediction.len(), truth.len())?;
        if prediction.is_empty() {
            return Ok(0.0);
        }

        let mut sum = 0.0;
        for (&p, &t) in prediction.iter().zip(truth) {
            let d = p - t;
            sum += match self {
                Loss::SquaredDistance => d * d,
                Loss::ManhattanDistance => d.abs(),
                Loss::RelativeSquared { eps } => {
                    let r = d / (t.abs() + eps);
                    r * r
                }
                Loss::LogSquared => (1.0 + d * d).ln(),
            };
        }
        Ok(sum / prediction.len() as f64)
    }

    /// Mean loss plus its gradient with respect to `prediction`.
    ///
    /// Writes `d_loss/d_prediction` into `gradient` and returns the loss.
    ///
    /// Shape contract: `prediction`, `truth` and `gradient` have equal length;
    /// otherwise `ShapeMismatch` is returned and `gradient` is untouched.
    pub fn loss_and_gradient(
        self,
        prediction: &[f64],
        truth: &[f64],
        gradient: &mut [f64],
    ) -> Result<f64> {
        check_len("loss truth", prediction.len(), truth.len())?;
        check_len("loss gradient", prediction.len(), gradient.len())?;
        if prediction.is_empty() {
            return Ok(0.0);
        }

        let n = prediction.len() as f64;
        let mut sum = 0.0;
        match self {
            Loss::SquaredDistance => {
                let half_n = n / 2.0;
                for i in 0..prediction.len() {
                    let d = prediction[i] - truth[i];
                    sum += d * d;
                    gradient[i] = d / half_n;
                }
            }
            Loss::ManhattanDistance => {
                for i in 0..prediction.len() {
                    let d = prediction[i] - truth[i];
                    sum += d.abs();
                    gradient[i] = if d > 0.0 {
                        1.0 / n
                    } else if d < 0.0 {
                        -1.0 / n
                    } else {
                        0.0
                    };
                }
            }
            Loss::RelativeSquared { eps } => {
                for i in 0..prediction.len() {
                    let denom = truth[i].abs() + eps;
                    let r = (prediction[i] - truth[i]) / denom;
                    sum += r * r;
                    gradient[i] = 2.0 * r / denom / n;
                }
            }
            Loss::LogSquared => {
                for i in 0..prediction.len() {
                    let d = prediction[i] - truth[i];
                    let d_sq_plus_1 = d * d + 1.0;
                    sum += d_sq_plus_1.ln();
                    gradient[i] = 2.0 * d / d_sq_plus_1 / n;
                }
            }
        }

        Ok(sum / n)
    }
}
