//! Dataset loss and gradient accumulation.
//!
//! Per sample: forward pass, loss and `d_loss/d_prediction` (scaled by the
//! sample weight), backward pass, then add into the running totals.
//!
//! [`parallel_accumulate`] partitions the sample indices into contiguous
//! chunks before dispatch and runs one rayon task per chunk. Each task owns
//! its scratch buffers and gradient accumulator and runs the sequential
//! routine on its chunk; only the network and the dataset are shared, both
//! read-only. Chunk results are reduced in chunk order after the join, so for a
//! fixed chunk size the result does not depend on scheduling.
//!
//! Both entry points *add* into `out`. Zero it first for a fresh total.

use std::ops::Range;

use rayon::prelude::*;

use crate::backward::{BackwardScratch, backward};
use crate::buffers::PerParameter;
use crate::error::check_len;
use crate::forward::{ForwardCache, forward_unchecked};
use crate::{Dataset, Error, Network, Result};

/// Smallest chunk [`default_chunk_size`] hands out.
pub const MIN_CHUNK_SIZE: usize = 5;
/// Largest chunk [`default_chunk_size`] hands out.
pub const MAX_CHUNK_SIZE: usize = 1000;

/// Reusable buffers for single-sample loss + gradient.
///
/// Not shared between concurrent workers; each worker owns one.
#[derive(Debug, Clone)]
pub struct SampleScratch {
    pub cache: ForwardCache,
    pub backward: BackwardScratch,
    d_loss_d_prediction: Vec<f64>,
}

impl SampleScratch {
    pub fn new(net: &Network) -> Self {
        Self {
            cache: ForwardCache::new(net),
            backward: BackwardScratch::new(net),
            d_loss_d_prediction: vec![0.0; net.output_dim()],
        }
    }

    /// `d_loss/d_prediction` of the most recent sample, after weighting.
    #[inline]
    pub fn d_loss_d_prediction(&self) -> &[f64] {
        &self.d_loss_d_prediction
    }

    fn check(&self, net: &Network) -> Result<()> {
        let layout = net.layout();
        self.cache.combinations().check("forward cache", layout)?;
        self.cache.outputs().check("forward cache", layout)?;
        self.backward.d_loss_d_output().check("backward scratch", layout)?;
        self.backward.d_loss_d_input().check("backward scratch", layout)?;
        check_len(
            "backward scratch input",
            net.input_dim(),
            self.backward.d_network_input().len(),
        )?;
        check_len(
            "d_loss_d_prediction",
            net.output_dim(),
            self.d_loss_d_prediction.len(),
        )
    }
}

/// Buffers for accumulating over many samples: one sample's scratch plus a
/// per-sample gradient that is added into the running total.
#[derive(Debug, Clone)]
pub struct AccumulateScratch {
    pub sample: SampleScratch,
    sample_gradient: PerParameter,
}

impl AccumulateScratch {
    pub fn new(net: &Network) -> Self {
        Self {
            sample: SampleScratch::new(net),
            sample_gradient: net.new_per_parameter_buffer(),
        }
    }
}

/// Loss and parameter gradient of one (optionally weighted) sample.
///
/// Writes `d_loss/d_param` into `gradient` (overwrite semantics) and returns
/// `weight * loss`. `weight` multiplies both the loss and the gradient.
pub fn sample_loss_and_gradient(
    input: &[f64],
    truth: &[f64],
    weight: f64,
    net: &Network,
    scratch: &mut SampleScratch,
    gradient: &mut PerParameter,
) -> Result<f64> {
    check_len("network input", net.input_dim(), input.len())?;
    check_len("truth", net.output_dim(), truth.len())?;
    net.layout().check_same("gradient buffer", gradient.layout())?;
    scratch.check(net)?;
    sample_unchecked(input, truth, weight, net, scratch, gradient)
}

fn sample_unchecked(
    input: &[f64],
    truth: &[f64],
    weight: f64,
    net: &Network,
    scratch: &mut SampleScratch,
    gradient: &mut PerParameter,
) -> Result<f64> {
    forward_unchecked(input, net, &mut scratch.cache);
    let loss = net.loss().loss_and_gradient(
        scratch.cache.prediction(),
        truth,
        &mut scratch.d_loss_d_prediction,
    )?;
    if weight != 1.0 {
        for g in &mut scratch.d_loss_d_prediction {
            *g *= weight;
        }
    }
    backward(
        input,
        net,
        &scratch.cache,
        &scratch.d_loss_d_prediction,
        &mut scratch.backward,
        gradient,
    );
    Ok(weight * loss)
}

/// Sums weighted loss and gradient over every sample, one at a time.
///
/// Adds into `out` and returns the total loss (0 for an empty dataset).
pub fn sequential_accumulate(data: &Dataset, net: &Network, out: &mut PerParameter) -> Result<f64> {
    let mut scratch = AccumulateScratch::new(net);
    sequential_accumulate_with(data, net, out, &mut scratch)
}

/// [`sequential_accumulate`] with caller-owned scratch buffers, for loops that
/// call it repeatedly without allocating.
pub fn sequential_accumulate_with(
    data: &Dataset,
    net: &Network,
    out: &mut PerParameter,
    scratch: &mut AccumulateScratch,
) -> Result<f64> {
    check_shapes(data, net, out)?;
    net.layout()
        .check_same("accumulate scratch gradient", scratch.sample_gradient.layout())?;
    scratch.sample.check(net)?;
    accumulate_range(data, 0..data.len(), net, out, scratch)
}

/// Chunked fork-join version of [`sequential_accumulate`].
///
/// `chunk_size` must be > 0. Agrees with the sequential result up to
/// floating-point reassociation across chunk boundaries.
pub fn parallel_accumulate(
    data: &Dataset,
    net: &Network,
    out: &mut PerParameter,
    chunk_size: usize,
) -> Result<f64> {
    if chunk_size == 0 {
        return Err(Error::InvalidConfig("chunk_size must be > 0".to_owned()));
    }
    check_shapes(data, net, out)?;

    let n = data.len();
    let chunks: Vec<Range<usize>> = (0..n)
        .step_by(chunk_size)
        .map(|start| start..(start + chunk_size).min(n))
        .collect();
    tracing::debug!(samples = n, chunk_size, chunks = chunks.len(), "parallel accumulate");

    let partials: Vec<(f64, PerParameter)> = chunks
        .into_par_iter()
        .map(|range| {
            let mut scratch = AccumulateScratch::new(net);
            let mut gradient = net.new_per_parameter_buffer();
            let loss = accumulate_range(data, range, net, &mut gradient, &mut scratch)?;
            Ok((loss, gradient))
        })
        .collect::<Result<_>>()?;

    let mut total = 0.0;
    for (loss, gradient) in &partials {
        total += loss;
        out.add_assign(gradient);
    }
    Ok(total)
}

/// Chunk size that spreads `num_samples` over the rayon pool, clamped to
/// `[MIN_CHUNK_SIZE, MAX_CHUNK_SIZE]`.
pub fn default_chunk_size(num_samples: usize) -> usize {
    let threads = rayon::current_num_threads().max(1);
    (num_samples / threads).clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE)
}

fn check_shapes(data: &Dataset, net: &Network, out: &PerParameter) -> Result<()> {
    check_len("dataset input width", net.input_dim(), data.input_dim())?;
    check_len("dataset target width", net.output_dim(), data.target_dim())?;
    net.layout().check_same("gradient buffer", out.layout())
}

fn accumulate_range(
    data: &Dataset,
    range: Range<usize>,
    net: &Network,
    out: &mut PerParameter,
    scratch: &mut AccumulateScratch,
) -> Result<f64> {
    let AccumulateScratch {
        sample,
        sample_gradient,
    } = scratch;

    let mut total = 0.0;
    for idx in range {
        total += sample_unchecked(
            data.input(idx),
            data.target(idx),
            data.weight(idx),
            net,
            sample,
            sample_gradient,
        )?;
        out.add_assign(sample_gradient);
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::{Activation, Layer};

    fn net() -> Network {
        Network::build_with_rng(
            2,
            vec![
                Layer::uniform(3, Activation::Tanh),
                Layer::uniform(1, Activation::Linear),
            ],
            &mut StdRng::seed_from_u64(3),
        )
        .unwrap()
    }

    fn data(n: usize) -> Dataset {
        let inputs: Vec<f64> = (0..2 * n).map(|i| (i as f64 * 0.37).sin()).collect();
        let targets: Vec<f64> = (0..n).map(|i| (i as f64 * 0.11).cos()).collect();
        Dataset::from_flat(inputs, targets, 2, 1).unwrap()
    }

    #[test]
    fn empty_dataset_contributes_nothing() {
        let net = net();
        let empty = Dataset::from_flat(vec![], vec![], 2, 1).unwrap();
        let mut out = net.new_per_parameter_buffer();
        assert_eq!(sequential_accumulate(&empty, &net, &mut out).unwrap(), 0.0);
        assert_eq!(parallel_accumulate(&empty, &net, &mut out, 4).unwrap(), 0.0);
        assert!(out.flat().iter().all(|&g| g == 0.0));
    }

    #[test]
    fn accumulation_adds_into_out() {
        let net = net();
        let d = data(9);
        let mut once = net.new_per_parameter_buffer();
        let loss = sequential_accumulate(&d, &net, &mut once).unwrap();

        let mut twice = net.new_per_parameter_buffer();
        sequential_accumulate(&d, &net, &mut twice).unwrap();
        let loss2 = sequential_accumulate(&d, &net, &mut twice).unwrap();
        assert_eq!(loss, loss2);
        for (a, b) in once.flat().iter().zip(twice.flat()) {
            assert!((2.0 * a - b).abs() <= 1e-12 * b.abs().max(1.0));
        }
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let net = net();
        let mut out = net.new_per_parameter_buffer();
        let err = parallel_accumulate(&data(3), &net, &mut out, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn mismatched_dataset_is_rejected() {
        let net = net();
        let wide = Dataset::from_flat(vec![0.0; 6], vec![0.0; 2], 3, 1).unwrap();
        let mut out = net.new_per_parameter_buffer();
        let err = sequential_accumulate(&wide, &net, &mut out).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { expected: 2, actual: 3, .. }));
    }

    #[test]
    fn scratch_of_another_topology_is_rejected() {
        // Same parameter count (13) as `net()`, different shape.
        let other = Network::from_parts(12, vec![Layer::uniform(1, Activation::Linear)], vec![0.0; 13])
            .unwrap();
        let net = net();
        assert_eq!(net.total_parameters(), other.total_parameters());

        let mut out = net.new_per_parameter_buffer();
        let mut foreign = AccumulateScratch::new(&other);
        let err = sequential_accumulate_with(&data(4), &net, &mut out, &mut foreign).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
        assert!(out.flat().iter().all(|&g| g == 0.0));

        let mut sample = SampleScratch::new(&other);
        let mut gradient = net.new_per_parameter_buffer();
        let err = sample_loss_and_gradient(&[0.1, 0.2], &[0.3], 1.0, &net, &mut sample, &mut gradient)
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));

        let mut own = SampleScratch::new(&net);
        let mut foreign_gradient = other.new_per_parameter_buffer();
        let err = sample_loss_and_gradient(
            &[0.1, 0.2],
            &[0.3],
            1.0,
            &net,
            &mut own,
            &mut foreign_gradient,
        )
        .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn weight_scales_loss_and_gradient() {
        let net = net();
        let mut scratch = SampleScratch::new(&net);
        let mut g1 = net.new_per_parameter_buffer();
        let mut g3 = net.new_per_parameter_buffer();
        let l1 = sample_loss_and_gradient(&[0.2, -0.4], &[0.9], 1.0, &net, &mut scratch, &mut g1)
            .unwrap();
        let l3 = sample_loss_and_gradient(&[0.2, -0.4], &[0.9], 3.0, &net, &mut scratch, &mut g3)
            .unwrap();
        assert!((l3 - 3.0 * l1).abs() < 1e-14);
        for (a, b) in g1.flat().iter().zip(g3.flat()) {
            assert!((3.0 * a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn default_chunk_size_is_clamped() {
        assert_eq!(default_chunk_size(0), MIN_CHUNK_SIZE);
        assert_eq!(default_chunk_size(usize::MAX / 2), MAX_CHUNK_SIZE);
    }
}
