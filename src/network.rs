//! The network parameter model.
//!
//! All trainable values of a [`Network`] live in one contiguous buffer. A
//! [`ParamLayout`] partitions that buffer into per-neuron `(start, count)`
//! ranges in layer-major, neuron-minor order; the ranges tile the buffer with
//! no gaps or overlap. Neuron descriptors never own parameters: the forward and
//! backward engines borrow the buffer and slice it through the layout.
//!
//! The buffer is only ever replaced wholesale (`set_parameters_flat`) and is
//! never reallocated after construction, so ranges stay valid for the life of
//! the network.

use std::ops::Range;
use std::sync::Arc;

use rand::Rng;

use crate::buffers::{PerNeuron, PerNeuronInput, PerParameter};
use crate::error::check_len;
use crate::{Error, Layer, Loss, Result, Scaler};

/// Per-neuron parameter ranges into a network's flat parameter buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamLayout {
    /// Input width of each layer.
    input_widths: Vec<usize>,
    counts: Vec<Vec<usize>>,
    starts: Vec<Vec<usize>>,
    total: usize,
}

impl ParamLayout {
    fn new(input_dim: usize, layers: &[Layer]) -> Self {
        let mut input_widths = Vec::with_capacity(layers.len());
        let mut counts = Vec::with_capacity(layers.len());
        let mut starts = Vec::with_capacity(layers.len());
        let mut total = 0;
        let mut in_width = input_dim;

        for layer in layers {
            let mut layer_counts = Vec::with_capacity(layer.width());
            let mut layer_starts = Vec::with_capacity(layer.width());
            for neuron in layer.neurons() {
                let count = neuron.num_parameters(in_width);
                layer_starts.push(total);
                layer_counts.push(count);
                total += count;
            }
            input_widths.push(in_width);
            counts.push(layer_counts);
            starts.push(layer_starts);
            in_width = layer.width();
        }

        Self {
            input_widths,
            counts,
            starts,
            total,
        }
    }

    /// Total number of parameters.
    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn layer_width(&self, layer: usize) -> usize {
        self.counts[layer].len()
    }

    /// Width of the vector feeding `layer` (network input for layer 0).
    #[inline]
    pub fn layer_input_width(&self, layer: usize) -> usize {
        self.input_widths[layer]
    }

    #[inline]
    pub fn count(&self, layer: usize, neuron: usize) -> usize {
        self.counts[layer][neuron]
    }

    #[inline]
    pub fn start(&self, layer: usize, neuron: usize) -> usize {
        self.starts[layer][neuron]
    }

    #[inline]
    pub fn range(&self, layer: usize, neuron: usize) -> Range<usize> {
        let start = self.starts[layer][neuron];
        start..start + self.counts[layer][neuron]
    }

    /// Range covering every parameter of `layer`.
    #[inline]
    pub fn layer_range(&self, layer: usize) -> Range<usize> {
        let starts = &self.starts[layer];
        let start = starts[0];
        let last = starts.len() - 1;
        start..starts[last] + self.counts[layer][last]
    }

    /// `ShapeMismatch` at the first width where `actual` differs from `self`.
    pub(crate) fn check_same(&self, what: &'static str, actual: &ParamLayout) -> Result<()> {
        check_len(what, self.num_layers(), actual.num_layers())?;
        for l in 0..self.num_layers() {
            check_len(what, self.layer_input_width(l), actual.layer_input_width(l))?;
            check_len(what, self.layer_width(l), actual.layer_width(l))?;
            for (&e, &a) in self.counts[l].iter().zip(&actual.counts[l]) {
                check_len(what, e, a)?;
            }
        }
        Ok(())
    }
}

/// A feed-forward network: layers of stateless neuron descriptors plus the
/// flat parameter buffer they read from.
///
/// Besides the compute topology a network carries the collaborators a
/// serializer or a scaled prediction needs: its [`Loss`] and the input/output
/// [`Scaler`]s.
#[derive(Debug, Clone)]
pub struct Network {
    input_dim: usize,
    layers: Vec<Layer>,
    layout: Arc<ParamLayout>,
    params: Vec<f64>,
    loss: Loss,
    input_scaler: Scaler,
    output_scaler: Scaler,
}

impl Network {
    /// Builds a network and randomizes its parameters from the thread RNG.
    pub fn build(input_dim: usize, layers: Vec<Layer>) -> Result<Self> {
        Self::build_with_rng(input_dim, layers, &mut rand::thread_rng())
    }

    /// Builds a network and randomizes its parameters from `rng`.
    pub fn build_with_rng<R: Rng + ?Sized>(
        input_dim: usize,
        layers: Vec<Layer>,
        rng: &mut R,
    ) -> Result<Self> {
        let mut net = Self::with_zero_parameters(input_dim, layers)?;
        net.randomize_parameters(rng);
        Ok(net)
    }

    /// Builds a network around an existing parameter buffer.
    ///
    /// `params.len()` must equal the parameter count implied by the topology.
    pub fn from_parts(input_dim: usize, layers: Vec<Layer>, params: Vec<f64>) -> Result<Self> {
        let mut net = Self::with_zero_parameters(input_dim, layers)?;
        net.set_parameters_flat(&params)?;
        Ok(net)
    }

    fn with_zero_parameters(input_dim: usize, layers: Vec<Layer>) -> Result<Self> {
        validate_topology(input_dim, &layers)?;

        let layout = ParamLayout::new(input_dim, &layers);
        let output_dim = layers[layers.len() - 1].width();
        tracing::debug!(
            input_dim,
            output_dim,
            layers = layers.len(),
            parameters = layout.total(),
            "built network"
        );

        Ok(Self {
            input_dim,
            params: vec![0.0; layout.total()],
            layout: Arc::new(layout),
            layers,
            loss: Loss::default(),
            input_scaler: Scaler::identity(input_dim),
            output_scaler: Scaler::identity(output_dim),
        })
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    #[inline]
    pub fn output_dim(&self) -> usize {
        self.layers[self.layers.len() - 1].width()
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    #[inline]
    pub fn layer(&self, idx: usize) -> Option<&Layer> {
        self.layers.get(idx)
    }

    #[inline]
    pub fn layout(&self) -> &ParamLayout {
        &self.layout
    }

    #[inline]
    pub(crate) fn shared_layout(&self) -> &Arc<ParamLayout> {
        &self.layout
    }

    #[inline]
    pub fn total_parameters(&self) -> usize {
        self.layout.total()
    }

    /// Read-only view of the flat parameter buffer.
    #[inline]
    pub fn parameters(&self) -> &[f64] {
        &self.params
    }

    /// Parameters of one neuron; aliases the flat buffer.
    #[inline]
    pub fn neuron_parameters(&self, layer: usize, neuron: usize) -> &[f64] {
        &self.params[self.layout.range(layer, neuron)]
    }

    /// Mutable parameters of one neuron; writes land in the flat buffer.
    #[inline]
    pub fn neuron_parameters_mut(&mut self, layer: usize, neuron: usize) -> &mut [f64] {
        let range = self.layout.range(layer, neuron);
        &mut self.params[range]
    }

    /// Copies the parameter buffer into `dst`.
    pub fn get_parameters_flat(&self, dst: &mut [f64]) -> Result<()> {
        check_len("parameter buffer", self.params.len(), dst.len())?;
        dst.copy_from_slice(&self.params);
        Ok(())
    }

    /// Overwrites the parameter buffer in place from `src`.
    ///
    /// The buffer is not reallocated, so per-neuron ranges stay valid.
    /// Must not be called while an accumulation over this network is running.
    pub fn set_parameters_flat(&mut self, src: &[f64]) -> Result<()> {
        check_len("parameter buffer", self.params.len(), src.len())?;
        self.params.copy_from_slice(src);
        Ok(())
    }

    /// Re-draws every neuron's parameters through its descriptor.
    pub fn randomize_parameters<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut rng = rng;
        for (l, layer) in self.layers.iter().enumerate() {
            for (i, neuron) in layer.neurons().iter().enumerate() {
                let range = self.layout.range(l, i);
                neuron.randomize(&mut self.params[range], &mut rng);
            }
        }
    }

    #[inline]
    pub fn loss(&self) -> Loss {
        self.loss
    }

    pub fn set_loss(&mut self, loss: Loss) -> Result<()> {
        loss.validate()?;
        self.loss = loss;
        Ok(())
    }

    #[inline]
    pub fn input_scaler(&self) -> &Scaler {
        &self.input_scaler
    }

    #[inline]
    pub fn output_scaler(&self) -> &Scaler {
        &self.output_scaler
    }

    #[inline]
    pub fn input_scaler_mut(&mut self) -> &mut Scaler {
        &mut self.input_scaler
    }

    #[inline]
    pub fn output_scaler_mut(&mut self) -> &mut Scaler {
        &mut self.output_scaler
    }

    pub fn set_input_scaler(&mut self, scaler: Scaler) {
        self.input_scaler = scaler;
    }

    pub fn set_output_scaler(&mut self, scaler: Scaler) {
        self.output_scaler = scaler;
    }

    /// One scalar per neuron, indexed `[layer][neuron]`.
    pub fn new_per_neuron_buffer(&self) -> PerNeuron {
        PerNeuron::new(&self.layout)
    }

    /// One scalar per parameter, laid out like the parameter buffer.
    pub fn new_per_parameter_buffer(&self) -> PerParameter {
        PerParameter::new(Arc::clone(&self.layout))
    }

    /// One vector per neuron, as wide as that neuron's layer input.
    pub fn new_per_neuron_input_buffer(&self) -> PerNeuronInput {
        PerNeuronInput::new(&self.layout)
    }
}

fn validate_topology(input_dim: usize, layers: &[Layer]) -> Result<()> {
    if input_dim == 0 {
        return Err(Error::InvalidTopology("input width must be > 0".to_owned()));
    }
    if layers.is_empty() {
        return Err(Error::InvalidTopology(
            "network must have at least one layer".to_owned(),
        ));
    }
    if let Some(idx) = layers.iter().position(Layer::is_empty) {
        return Err(Error::InvalidTopology(format!("layer {idx} has no neurons")));
    }
    Ok(())
}
