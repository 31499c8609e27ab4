//! A feed-forward network evaluation and gradient engine.
//!
//! `rust-nnet` computes predictions of a layered feed-forward network, the
//! gradient of a loss with respect to every trainable parameter (manual
//! reverse-mode backpropagation), and sums loss and gradient over a dataset,
//! sequentially or as a chunked fork-join over a rayon pool.
//!
//! Training-loop policy (optimizer, early stopping, folds) is left to the
//! caller: the crate hands out a flat gradient that lines up index-for-index
//! with the flat parameter buffer.
//!
//! # Design goals
//!
//! - Stateless neurons: a [`Neuron`] descriptor holds no parameters. Every
//!   trainable value lives in one contiguous buffer owned by the [`Network`],
//!   sliced per neuron through a [`ParamLayout`].
//! - Predictable performance: reuse buffers ([`ForwardCache`],
//!   [`BackwardScratch`], [`AccumulateScratch`]) instead of allocating.
//! - Reproducible reductions: fan-out sums and chunk reductions run in a fixed
//!   order.
//!
//! # Panics vs `Result`
//!
//! This crate intentionally exposes two layers of API:
//!
//! - Low-level hot path (panics on misuse):
//!   - [`backward::backward`]
//!   - buffer/cache topology checks inside [`forward::predict`]
//!     Buffers built for a different topology are programmer error and panic via `assert!`.
//!
//! - Boundary APIs (shape-checked):
//!   - [`forward::predict`], [`Loss::loss_and_gradient`]
//!   - [`aggregate::sample_loss_and_gradient`], [`aggregate::sequential_accumulate`],
//!     [`aggregate::sequential_accumulate_with`], [`aggregate::parallel_accumulate`]
//!   - [`Network::set_parameters_flat`], [`Network::predict`], [`Network::fit_scalers`]
//!     These validate widths, including the full layout of caller-supplied
//!     gradient buffers and scratch, and return [`Result`].
//!
//! # Data layout and shapes
//!
//! - Scalars are `f64`.
//! - [`Dataset`] and [`Inputs`] store samples contiguously in row-major layout.
//! - Parameters are stored layer-major, then neuron-major; a sum neuron's
//!   slice is `[w_0, ..., w_{n-1}, bias]`.
//!
//! # MSRV
//!
//! This crate's minimum supported Rust version (MSRV) is specified in `Cargo.toml`.

//! # Quick start
//!
//! ```rust
//! use rust_nnet::{Activation, Dataset, NetworkBuilder, aggregate};
//!
//! # fn main() -> rust_nnet::Result<()> {
//! let xs = vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]];
//! let ys = vec![vec![0.0], vec![1.0], vec![1.0], vec![0.0]];
//! let train = Dataset::from_rows(&xs, &ys)?;
//!
//! let mut net = NetworkBuilder::new(2)?
//!     .add_layer(8, Activation::Tanh)?
//!     .add_layer(1, Activation::Linear)?
//!     .build_with_seed(0)?;
//!
//! let mut grad = net.new_per_parameter_buffer();
//! let mut params = net.parameters().to_vec();
//! for _ in 0..100 {
//!     grad.zero();
//!     let loss = aggregate::parallel_accumulate(&train, &net, &mut grad, 2)?;
//!     assert!(loss.is_finite());
//!     for (p, g) in params.iter_mut().zip(grad.flat()) {
//!         *p -= 0.05 * g;
//!     }
//!     net.set_parameters_flat(&params)?;
//! }
//! # Ok(())
//! # }
//! ```

//! # Allocation-free single samples (advanced)
//!
//! ```rust
//! use rust_nnet::{Activation, BackwardScratch, ForwardCache, Loss, NetworkBuilder};
//! use rust_nnet::{backward::backward, forward::predict};
//!
//! # fn main() -> rust_nnet::Result<()> {
//! let net = NetworkBuilder::new(3)?
//!     .add_layer(4, Activation::LinearTanh)?
//!     .add_layer(2, Activation::Linear)?
//!     .build_with_seed(0)?;
//!
//! let mut cache = ForwardCache::new(&net);
//! let mut scratch = BackwardScratch::new(&net);
//! let mut grads = net.new_per_parameter_buffer();
//! let mut d_pred = vec![0.0; 2];
//!
//! let x = [1.0, 2.0, 3.0];
//! let y = predict(&x, &net, &mut cache)?;
//! let _loss = Loss::SquaredDistance.loss_and_gradient(y, &[1.2, 2.2], &mut d_pred)?;
//! backward(&x, &net, &cache, &d_pred, &mut scratch, &mut grads);
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod aggregate;
pub mod backward;
pub mod buffers;
pub mod builder;
pub mod data;
pub mod error;
pub mod forward;
pub mod layer;
pub mod loss;
pub mod network;
pub mod neuron;
pub mod predict;
pub mod scale;

#[cfg(feature = "serde")]
pub mod serde_model;

pub use activation::Activation;
pub use aggregate::{
    AccumulateScratch, SampleScratch, default_chunk_size, parallel_accumulate,
    sequential_accumulate,
};
pub use backward::BackwardScratch;
pub use buffers::{PerNeuron, PerNeuronInput, PerParameter};
pub use builder::NetworkBuilder;
pub use data::{Dataset, Inputs};
pub use error::{Error, Result};
pub use forward::ForwardCache;
pub use layer::Layer;
pub use loss::Loss;
pub use network::{Network, ParamLayout};
pub use neuron::{Neuron, SumNeuron};
pub use scale::{ScaleKind, Scaler};
