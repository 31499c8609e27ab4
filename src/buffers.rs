//! Shaped working buffers.
//!
//! Each buffer mirrors one of the network's index spaces:
//!
//! - [`PerNeuron`]: one scalar per neuron (combinations, outputs, output gradients)
//! - [`PerParameter`]: one scalar per parameter, flat and addressable per neuron
//! - [`PerNeuronInput`]: one vector per neuron, as wide as that neuron's input
//!
//! Buffers are allocated once from a [`Network`](crate::Network) and reused;
//! nothing in the hot path allocates.

use std::sync::Arc;

use crate::Result;
use crate::error::check_len;
use crate::network::ParamLayout;

/// One scalar per neuron, indexed `[layer][neuron]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PerNeuron {
    layers: Vec<Vec<f64>>,
}

impl PerNeuron {
    pub(crate) fn new(layout: &ParamLayout) -> Self {
        let layers = (0..layout.num_layers())
            .map(|l| vec![0.0; layout.layer_width(l)])
            .collect();
        Self { layers }
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn layer(&self, idx: usize) -> &[f64] {
        &self.layers[idx]
    }

    #[inline]
    pub fn layer_mut(&mut self, idx: usize) -> &mut [f64] {
        &mut self.layers[idx]
    }

    /// Layer `idx - 1` immutably and layer `idx` mutably.
    #[inline]
    pub(crate) fn split_pair(&mut self, idx: usize) -> (&[f64], &mut [f64]) {
        let (left, right) = self.layers.split_at_mut(idx);
        (&left[idx - 1], &mut right[0])
    }

    /// Values of the final layer.
    #[inline]
    pub fn last(&self) -> &[f64] {
        &self.layers[self.layers.len() - 1]
    }

    pub fn fill(&mut self, value: f64) {
        for layer in &mut self.layers {
            layer.fill(value);
        }
    }

    pub(crate) fn matches(&self, layout: &ParamLayout) -> bool {
        self.layers.len() == layout.num_layers()
            && self
                .layers
                .iter()
                .enumerate()
                .all(|(l, v)| v.len() == layout.layer_width(l))
    }

    /// `ShapeMismatch` at the first layer whose width differs from `layout`.
    pub(crate) fn check(&self, what: &'static str, layout: &ParamLayout) -> Result<()> {
        check_len(what, layout.num_layers(), self.layers.len())?;
        for (l, v) in self.layers.iter().enumerate() {
            check_len(what, layout.layer_width(l), v.len())?;
        }
        Ok(())
    }
}

/// One scalar per parameter.
///
/// The flat view lines up index-for-index with
/// [`Network::parameters`](crate::Network::parameters); the per-neuron view
/// slices it with the same layout.
#[derive(Debug, Clone)]
pub struct PerParameter {
    values: Vec<f64>,
    layout: Arc<ParamLayout>,
}

impl PerParameter {
    pub(crate) fn new(layout: Arc<ParamLayout>) -> Self {
        Self {
            values: vec![0.0; layout.total()],
            layout,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn layout(&self) -> &ParamLayout {
        &self.layout
    }

    #[inline]
    pub fn flat(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub fn flat_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    #[inline]
    pub fn neuron(&self, layer: usize, neuron: usize) -> &[f64] {
        &self.values[self.layout.range(layer, neuron)]
    }

    #[inline]
    pub fn neuron_mut(&mut self, layer: usize, neuron: usize) -> &mut [f64] {
        let range = self.layout.range(layer, neuron);
        &mut self.values[range]
    }

    pub fn zero(&mut self) {
        self.values.fill(0.0);
    }

    /// `self += other`, element-wise.
    ///
    /// Panics if the two buffers have different lengths.
    pub fn add_assign(&mut self, other: &PerParameter) {
        assert_eq!(
            self.values.len(),
            other.values.len(),
            "per-parameter buffers differ in length"
        );
        for (a, &b) in self.values.iter_mut().zip(&other.values) {
            *a += b;
        }
    }

    /// `self *= factor`, element-wise.
    pub fn scale(&mut self, factor: f64) {
        for v in &mut self.values {
            *v *= factor;
        }
    }

    /// Euclidean norm of the flat buffer.
    pub fn norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }
}

impl PartialEq for PerParameter {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values && *self.layout == *other.layout
    }
}

/// One vector per neuron, indexed `[layer][neuron][input]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PerNeuronInput {
    layers: Vec<Vec<Vec<f64>>>,
}

impl PerNeuronInput {
    pub(crate) fn new(layout: &ParamLayout) -> Self {
        let layers = (0..layout.num_layers())
            .map(|l| vec![vec![0.0; layout.layer_input_width(l)]; layout.layer_width(l)])
            .collect();
        Self { layers }
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn layer(&self, idx: usize) -> &[Vec<f64>] {
        &self.layers[idx]
    }

    #[inline]
    pub fn layer_mut(&mut self, idx: usize) -> &mut [Vec<f64>] {
        &mut self.layers[idx]
    }

    #[inline]
    pub fn neuron(&self, layer: usize, neuron: usize) -> &[f64] {
        &self.layers[layer][neuron]
    }

    #[inline]
    pub fn neuron_mut(&mut self, layer: usize, neuron: usize) -> &mut [f64] {
        &mut self.layers[layer][neuron]
    }

    pub(crate) fn matches(&self, layout: &ParamLayout) -> bool {
        self.layers.len() == layout.num_layers()
            && self.layers.iter().enumerate().all(|(l, neurons)| {
                neurons.len() == layout.layer_width(l)
                    && neurons
                        .iter()
                        .all(|v| v.len() == layout.layer_input_width(l))
            })
    }

    pub(crate) fn check(&self, what: &'static str, layout: &ParamLayout) -> Result<()> {
        check_len(what, layout.num_layers(), self.layers.len())?;
        for (l, neurons) in self.layers.iter().enumerate() {
            check_len(what, layout.layer_width(l), neurons.len())?;
            for v in neurons {
                check_len(what, layout.layer_input_width(l), v.len())?;
            }
        }
        Ok(())
    }
}
