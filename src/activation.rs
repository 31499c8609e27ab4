//! Activation functions.
//!
//! A sum neuron computes a combination `s = w·x + b` and then applies an
//! activation `y = activate(s)`.
//!
//! The derivative takes both `s` and `y`: some activations are cheapest to
//! differentiate from the cached output (sigmoid), others need the
//! combination (the scaled tanh family). The forward cache keeps both.

/// Output scale of the tanh family (LeCun's scaled tanh).
pub const TANH_SCALE: f64 = 1.7159;
/// Input slope of the tanh family.
pub const TANH_SLOPE: f64 = 2.0 / 3.0;
/// `TANH_SCALE * TANH_SLOPE`.
pub const TANH_DERIVATIVE_SCALE: f64 = 1.143_933_333_333_333_3;
/// Slope of the linear term added by [`Activation::LinearTanh`].
pub const LINEAR_TANH_SLOPE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Element-wise activation function.
pub enum Activation {
    /// `1 / (1 + e^-s)`
    Sigmoid,
    /// `s`
    Linear,
    /// `1.7159 * tanh(2s/3)`
    Tanh,
    /// `1.7159 * tanh(2s/3) + 0.01 s`
    ///
    /// The linear term keeps the gradient from vanishing when the tanh saturates.
    LinearTanh,
}

impl Activation {
    #[inline]
    pub fn activate(self, combination: f64) -> f64 {
        match self {
            Activation::Sigmoid => 1.0 / (1.0 + (-combination).exp()),
            Activation::Linear => combination,
            Activation::Tanh => TANH_SCALE * (TANH_SLOPE * combination).tanh(),
            Activation::LinearTanh => {
                TANH_SCALE * (TANH_SLOPE * combination).tanh() + LINEAR_TANH_SLOPE * combination
            }
        }
    }

    /// Derivative of the output with respect to the combination.
    ///
    /// `output` must be `self.activate(combination)`.
    #[inline]
    pub fn derivative(self, combination: f64, output: f64) -> f64 {
        match self {
            Activation::Sigmoid => output * (1.0 - output),
            Activation::Linear => 1.0,
            Activation::Tanh => tanh_derivative(combination),
            Activation::LinearTanh => tanh_derivative(combination) + LINEAR_TANH_SLOPE,
        }
    }

    /// Stable lowercase name, used by the model format.
    pub fn name(self) -> &'static str {
        match self {
            Activation::Sigmoid => "sigmoid",
            Activation::Linear => "linear",
            Activation::Tanh => "tanh",
            Activation::LinearTanh => "linear_tanh",
        }
    }
}

#[inline]
fn tanh_derivative(combination: f64) -> f64 {
    let t = (TANH_SLOPE * combination).tanh();
    TANH_DERIVATIVE_SCALE * (1.0 - t * t)
}
