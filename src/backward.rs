//! Backward engine (reverse-mode differentiation).
//!
//! Given a completed forward pass and `d_loss/d_prediction`, the engine walks
//! the layers from last to first. For each neuron:
//!
//! - `d_loss/d_comb = d_loss/d_out * d_out/d_comb`
//! - the neuron writes `d_comb/d_params` and `d_comb/d_inputs`, which are
//!   scaled by `d_loss/d_comb`
//!
//! A layer's outputs feed every neuron of the next layer, so the gradient
//! reaching output `j` of layer `l - 1` is the sum over all neurons `i` of
//! layer `l` of their `d_loss/d_input[j]`. The sum is formed in ascending `i`
//! order into a zeroed buffer, which keeps results bit-reproducible.
//!
//! Design notes:
//! - Parameter gradients have overwrite semantics: every entry of the
//!   per-parameter buffer is written on each call.
//! - Shape mismatches are programmer errors and panic via `assert!`.

use crate::buffers::{PerNeuron, PerNeuronInput, PerParameter};
use crate::forward::ForwardCache;
use crate::{Network, Neuron};

/// Reusable intermediate buffers for one backward pass.
#[derive(Debug, Clone)]
pub struct BackwardScratch {
    d_loss_d_output: PerNeuron,
    d_loss_d_input: PerNeuronInput,
    d_network_input: Vec<f64>,
}

impl BackwardScratch {
    pub fn new(net: &Network) -> Self {
        Self {
            d_loss_d_output: net.new_per_neuron_buffer(),
            d_loss_d_input: net.new_per_neuron_input_buffer(),
            d_network_input: vec![0.0; net.input_dim()],
        }
    }

    /// `d_loss/d_output` of every neuron from the most recent pass.
    #[inline]
    pub fn d_loss_d_output(&self) -> &PerNeuron {
        &self.d_loss_d_output
    }

    /// Per-neuron `d_loss/d_input` from the most recent pass.
    #[inline]
    pub fn d_loss_d_input(&self) -> &PerNeuronInput {
        &self.d_loss_d_input
    }

    /// `d_loss/d_input` of the network input from the most recent pass.
    #[inline]
    pub fn d_network_input(&self) -> &[f64] {
        &self.d_network_input
    }
}

/// Backward pass for one sample.
///
/// `cache` must hold the forward pass of this `input` through this `net`.
/// Writes `d_loss/d_param` for every parameter into `d_loss_d_param` and
/// returns `d_loss/d_input` for the network input.
///
/// Shape contract (panics otherwise):
/// - `input.len() == net.input_dim()`
/// - `d_loss_d_prediction.len() == net.output_dim()`
/// - `cache`, `scratch` and `d_loss_d_param` were built for this topology
pub fn backward<'a>(
    input: &[f64],
    net: &Network,
    cache: &ForwardCache,
    d_loss_d_prediction: &[f64],
    scratch: &'a mut BackwardScratch,
    d_loss_d_param: &mut PerParameter,
) -> &'a [f64] {
    let layout = net.layout();
    assert_eq!(
        input.len(),
        net.input_dim(),
        "input len {} does not match network input_dim {}",
        input.len(),
        net.input_dim()
    );
    assert_eq!(
        d_loss_d_prediction.len(),
        net.output_dim(),
        "d_loss_d_prediction len {} does not match network output_dim {}",
        d_loss_d_prediction.len(),
        net.output_dim()
    );
    assert!(
        cache.matches(layout),
        "forward cache was built for a different topology"
    );
    assert!(
        scratch.d_loss_d_output.matches(layout) && scratch.d_loss_d_input.matches(layout),
        "backward scratch was built for a different topology"
    );
    assert!(
        d_loss_d_param.layout() == layout,
        "parameter gradient buffer was built for a different topology"
    );
    assert_eq!(
        scratch.d_network_input.len(),
        net.input_dim(),
        "backward scratch d_input len {} does not match network input_dim {}",
        scratch.d_network_input.len(),
        net.input_dim()
    );

    let params = net.parameters();
    let last = net.num_layers() - 1;
    scratch
        .d_loss_d_output
        .layer_mut(last)
        .copy_from_slice(d_loss_d_prediction);

    for (l, layer) in net.layers().iter().enumerate().rev() {
        let layer_input: &[f64] = if l == 0 {
            input
        } else {
            cache.outputs().layer(l - 1)
        };
        let combinations = cache.combinations().layer(l);
        let outputs = cache.outputs().layer(l);
        let d_outputs = scratch.d_loss_d_output.layer(l);
        let d_inputs = scratch.d_loss_d_input.layer_mut(l);

        for (i, neuron) in layer.neurons().iter().enumerate() {
            neuron_backward(
                neuron.as_ref(),
                &params[layout.range(l, i)],
                layer_input,
                combinations[i],
                outputs[i],
                d_outputs[i],
                d_loss_d_param.neuron_mut(l, i),
                &mut d_inputs[i],
            );
        }

        let d_prev: &mut [f64] = if l == 0 {
            &mut scratch.d_network_input
        } else {
            scratch.d_loss_d_output.layer_mut(l - 1)
        };
        sum_fan_out(scratch.d_loss_d_input.layer(l), d_prev);
    }

    &scratch.d_network_input
}

#[inline]
#[allow(clippy::too_many_arguments)]
fn neuron_backward(
    neuron: &dyn Neuron,
    params: &[f64],
    inputs: &[f64],
    combination: f64,
    output: f64,
    d_loss_d_output: f64,
    d_params: &mut [f64],
    d_inputs: &mut [f64],
) {
    let d_loss_d_comb = d_loss_d_output * neuron.d_activate_d_combination(combination, output);

    neuron.d_combine_d_parameters(params, inputs, combination, d_params);
    for g in d_params.iter_mut() {
        *g *= d_loss_d_comb;
    }

    neuron.d_combine_d_input(params, inputs, combination, d_inputs);
    for g in d_inputs.iter_mut() {
        *g *= d_loss_d_comb;
    }
}

/// `out[j] = sum_i per_neuron[i][j]`, summed in ascending `i`.
#[inline]
fn sum_fan_out(per_neuron: &[Vec<f64>], out: &mut [f64]) {
    out.fill(0.0);
    for d_inputs in per_neuron {
        for (o, &d) in out.iter_mut().zip(d_inputs) {
            *o += d;
        }
    }
}
