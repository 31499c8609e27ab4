//! Forward engine.
//!
//! A forward pass walks the layers in order. Layer 0 reads the network input,
//! every later layer reads the previous layer's outputs. For each neuron both
//! the combination and the activated output are cached: the backward pass
//! needs the pair.

use crate::buffers::PerNeuron;
use crate::error::check_len;
use crate::network::ParamLayout;
use crate::{Layer, Network, Result};

/// Reusable per-neuron buffers for one forward pass.
///
/// The prediction of the most recent pass is the final layer of `outputs`.
/// Not shared between concurrent workers; each worker owns one.
#[derive(Debug, Clone)]
pub struct ForwardCache {
    combinations: PerNeuron,
    outputs: PerNeuron,
}

impl ForwardCache {
    pub fn new(net: &Network) -> Self {
        Self {
            combinations: net.new_per_neuron_buffer(),
            outputs: net.new_per_neuron_buffer(),
        }
    }

    #[inline]
    pub fn combinations(&self) -> &PerNeuron {
        &self.combinations
    }

    #[inline]
    pub fn outputs(&self) -> &PerNeuron {
        &self.outputs
    }

    /// Output of the final layer from the most recent pass.
    #[inline]
    pub fn prediction(&self) -> &[f64] {
        self.outputs.last()
    }

    pub(crate) fn matches(&self, layout: &ParamLayout) -> bool {
        self.combinations.matches(layout) && self.outputs.matches(layout)
    }
}

/// Runs one forward pass and returns the prediction.
///
/// The returned slice aliases the final layer of `cache`; copy it if it must
/// survive the next pass.
///
/// Returns `ShapeMismatch` if `input.len() != net.input_dim()`.
///
/// Panics if `cache` was not built for a network with this topology.
pub fn predict<'a>(input: &[f64], net: &Network, cache: &'a mut ForwardCache) -> Result<&'a [f64]> {
    check_len("network input", net.input_dim(), input.len())?;
    forward_unchecked(input, net, cache);
    Ok(cache.prediction())
}

/// Forward pass without the input check; the hot path of the accumulators.
pub(crate) fn forward_unchecked(input: &[f64], net: &Network, cache: &mut ForwardCache) {
    let layout = net.layout();
    assert!(
        cache.matches(layout),
        "forward cache was built for a different topology"
    );

    let ForwardCache {
        combinations,
        outputs,
    } = cache;
    let params = net.parameters();

    for (l, layer) in net.layers().iter().enumerate() {
        let comb = combinations.layer_mut(l);
        if l == 0 {
            let out = outputs.layer_mut(0);
            layer_forward(layout, l, layer, params, input, comb, out);
        } else {
            // Previous outputs immutably, current outputs mutably.
            let (prev, out) = outputs.split_pair(l);
            layer_forward(layout, l, layer, params, prev, comb, out);
        }
    }
}

#[inline]
fn layer_forward(
    layout: &ParamLayout,
    l: usize,
    layer: &Layer,
    params: &[f64],
    inputs: &[f64],
    comb: &mut [f64],
    out: &mut [f64],
) {
    for (i, neuron) in layer.neurons().iter().enumerate() {
        let p = &params[layout.range(l, i)];
        let s = neuron.combine(p, inputs);
        comb[i] = s;
        out[i] = neuron.activate(s);
    }
}
