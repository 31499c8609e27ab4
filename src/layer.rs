use std::sync::Arc;

use crate::{Activation, Neuron, SumNeuron};

/// Ordered group of neuron descriptors that all read the same input vector.
///
/// A layer carries no parameters; its width fixes the input width of the
/// next layer.
#[derive(Debug, Clone, Default)]
pub struct Layer {
    neurons: Vec<Arc<dyn Neuron>>,
}

impl Layer {
    pub fn new(neurons: Vec<Arc<dyn Neuron>>) -> Self {
        Self { neurons }
    }

    /// `width` sum neurons sharing one activation.
    pub fn uniform(width: usize, activation: Activation) -> Self {
        let neuron: Arc<dyn Neuron> = Arc::new(SumNeuron::new(activation));
        Self {
            neurons: vec![neuron; width],
        }
    }

    pub fn push(&mut self, neuron: Arc<dyn Neuron>) {
        self.neurons.push(neuron);
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.neurons.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.neurons.is_empty()
    }

    #[inline]
    pub fn neurons(&self) -> &[Arc<dyn Neuron>] {
        &self.neurons
    }

    #[inline]
    pub fn neuron(&self, idx: usize) -> &dyn Neuron {
        self.neurons[idx].as_ref()
    }
}

impl FromIterator<Arc<dyn Neuron>> for Layer {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Neuron>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
