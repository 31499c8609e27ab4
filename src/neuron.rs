//! Neuron descriptors.
//!
//! A neuron owns no parameters and no mutable state. The network stores every
//! trainable value in one flat buffer and hands each neuron its sub-slice;
//! the descriptor only defines how that slice and the layer input combine into
//! an output, and how to differentiate that.
//!
//! Because descriptors are immutable (`Send + Sync`), concurrent workers share
//! them read-only.

use std::fmt;

use rand::RngCore;
use rand_distr::{Distribution, StandardNormal};

use crate::Activation;

/// Behavior of one neuron.
///
/// Shape contract for every method taking `params`:
/// `params.len() == self.num_parameters(inputs.len())`.
pub trait Neuron: Send + Sync + fmt::Debug {
    /// Number of parameters for a neuron fed `num_inputs` values.
    fn num_parameters(&self, num_inputs: usize) -> usize;

    /// Combines the inputs into a scalar (the pre-activation value).
    fn combine(&self, params: &[f64], inputs: &[f64]) -> f64;

    fn activate(&self, combination: f64) -> f64;

    /// Writes `d(combination)/d(params)` into `out` (`out.len() == params.len()`).
    fn d_combine_d_parameters(
        &self,
        params: &[f64],
        inputs: &[f64],
        combination: f64,
        out: &mut [f64],
    );

    /// Writes `d(combination)/d(inputs)` into `out` (`out.len() == inputs.len()`).
    fn d_combine_d_input(&self, params: &[f64], inputs: &[f64], combination: f64, out: &mut [f64]);

    /// `d(output)/d(combination)`, given both the combination and `activate(combination)`.
    fn d_activate_d_combination(&self, combination: f64, output: f64) -> f64;

    /// Draws a fresh initial parameter set.
    fn randomize(&self, params: &mut [f64], rng: &mut dyn RngCore);

    /// Built-in activation if this is a [`SumNeuron`]. Used by the model format.
    fn builtin_activation(&self) -> Option<Activation> {
        None
    }
}

/// Weighted sum of the inputs plus a trailing bias, fed through an [`Activation`].
///
/// Parameter layout: `[w_0, ..., w_{n-1}, bias]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SumNeuron {
    pub activation: Activation,
}

impl SumNeuron {
    pub const fn new(activation: Activation) -> Self {
        Self { activation }
    }
}

impl Neuron for SumNeuron {
    #[inline]
    fn num_parameters(&self, num_inputs: usize) -> usize {
        num_inputs + 1
    }

    #[inline]
    fn combine(&self, params: &[f64], inputs: &[f64]) -> f64 {
        debug_assert_eq!(params.len(), inputs.len() + 1);

        let mut sum = 0.0;
        for (&w, &x) in params.iter().zip(inputs) {
            sum += w * x;
        }
        sum + params[inputs.len()]
    }

    #[inline]
    fn activate(&self, combination: f64) -> f64 {
        self.activation.activate(combination)
    }

    #[inline]
    fn d_combine_d_parameters(
        &self,
        params: &[f64],
        inputs: &[f64],
        _combination: f64,
        out: &mut [f64],
    ) {
        debug_assert_eq!(params.len(), inputs.len() + 1);
        debug_assert_eq!(out.len(), params.len());

        out[..inputs.len()].copy_from_slice(inputs);
        out[inputs.len()] = 1.0;
    }

    #[inline]
    fn d_combine_d_input(
        &self,
        params: &[f64],
        inputs: &[f64],
        _combination: f64,
        out: &mut [f64],
    ) {
        debug_assert_eq!(params.len(), inputs.len() + 1);
        debug_assert_eq!(out.len(), inputs.len());

        // The bias is not an input weight.
        out.copy_from_slice(&params[..inputs.len()]);
    }

    #[inline]
    fn d_activate_d_combination(&self, combination: f64, output: f64) -> f64 {
        self.activation.derivative(combination, output)
    }

    /// Standard normal draws scaled by `1/sqrt(params.len())`, which keeps the
    /// initial combination near unit scale for unit-scale inputs.
    fn randomize(&self, params: &mut [f64], rng: &mut dyn RngCore) {
        if params.is_empty() {
            return;
        }
        let scale = (params.len() as f64).powf(-0.5);
        for p in params.iter_mut() {
            let z: f64 = StandardNormal.sample(&mut *rng);
            *p = z * scale;
        }
    }

    fn builtin_activation(&self) -> Option<Activation> {
        Some(self.activation)
    }
}
