//! Contiguous dataset helpers.
//!
//! The accumulators operate on slices to avoid per-sample allocations. `Inputs`
//! and `Dataset` provide validated, row-major storage for feature/target
//! matrices, plus optional per-sample weights.

use std::slice::ChunksExact;

use crate::{Error, Result};

/// A collection of input samples (X).
///
/// Stored as a contiguous buffer with row-major layout:
/// - `inputs.len() == len * input_dim`
#[derive(Debug, Clone, PartialEq)]
pub struct Inputs {
    inputs: Vec<f64>,
    len: usize,
    input_dim: usize,
}

impl Inputs {
    /// Build inputs from a flat buffer with shape `(len, input_dim)`.
    ///
    /// An empty buffer is a valid zero-sample collection.
    pub fn from_flat(inputs: Vec<f64>, input_dim: usize) -> Result<Self> {
        if input_dim == 0 {
            return Err(Error::InvalidData("input_dim must be > 0".to_owned()));
        }
        if !inputs.len().is_multiple_of(input_dim) {
            return Err(Error::InvalidData(format!(
                "inputs length {} is not divisible by input_dim {}",
                inputs.len(),
                input_dim
            )));
        }

        let len = inputs.len() / input_dim;

        Ok(Self {
            inputs,
            len,
            input_dim,
        })
    }

    /// Build inputs from per-sample rows.
    ///
    /// This is a convenience constructor (it copies into contiguous storage).
    pub fn from_rows(inputs: &[Vec<f64>]) -> Result<Self> {
        let (inputs, input_dim) = flatten_rows("input", inputs)?;
        let len = inputs.len() / input_dim;
        Ok(Self {
            inputs,
            len,
            input_dim,
        })
    }

    #[inline]
    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    /// Returns true if there are no samples.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    /// Returns the per-sample input dimension.
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    #[inline]
    /// Returns the `idx`-th input row (shape: `(input_dim,)`).
    ///
    /// Panics if `idx >= len`.
    pub fn input(&self, idx: usize) -> &[f64] {
        let start = idx * self.input_dim;
        &self.inputs[start..start + self.input_dim]
    }

    #[inline]
    pub(crate) fn input_mut(&mut self, idx: usize) -> &mut [f64] {
        let start = idx * self.input_dim;
        &mut self.inputs[start..start + self.input_dim]
    }

    /// Iterates over the rows in order.
    #[inline]
    pub fn rows(&self) -> ChunksExact<'_, f64> {
        self.inputs.chunks_exact(self.input_dim)
    }
}

/// A supervised dataset: inputs (X), targets (Y) and optional weights.
///
/// Stored as contiguous buffers with row-major layout:
/// - `inputs.len() == len * input_dim`
/// - `targets.len() == len * target_dim`
/// - `weights.len() == len` when present
///
/// Without weights every sample counts with weight 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    inputs: Inputs,
    targets: Vec<f64>,
    target_dim: usize,
    weights: Option<Vec<f64>>,
}

impl Dataset {
    /// Build a dataset from flat buffers.
    ///
    /// `inputs` is `(len, input_dim)` and `targets` is `(len, target_dim)`.
    pub fn from_flat(
        inputs: Vec<f64>,
        targets: Vec<f64>,
        input_dim: usize,
        target_dim: usize,
    ) -> Result<Self> {
        let inputs = Inputs::from_flat(inputs, input_dim)?;
        if target_dim == 0 {
            return Err(Error::InvalidData("target_dim must be > 0".to_owned()));
        }

        if targets.len() != inputs.len() * target_dim {
            return Err(Error::InvalidData(format!(
                "targets length {} does not match len * target_dim ({} * {})",
                targets.len(),
                inputs.len(),
                target_dim
            )));
        }

        Ok(Self {
            inputs,
            targets,
            target_dim,
            weights: None,
        })
    }

    /// Build a dataset from per-sample rows.
    ///
    /// This is a convenience constructor (it copies into contiguous storage).
    pub fn from_rows(inputs: &[Vec<f64>], targets: &[Vec<f64>]) -> Result<Self> {
        if inputs.len() != targets.len() {
            return Err(Error::InvalidData(format!(
                "inputs/targets length mismatch: {} vs {}",
                inputs.len(),
                targets.len()
            )));
        }

        let inputs = Inputs::from_rows(inputs)?;
        let (targets, target_dim) = flatten_rows("target", targets)?;

        Ok(Self {
            inputs,
            targets,
            target_dim,
            weights: None,
        })
    }

    /// Attaches one non-negative, finite weight per sample.
    pub fn with_weights(mut self, weights: Vec<f64>) -> Result<Self> {
        if weights.len() != self.len() {
            return Err(Error::InvalidData(format!(
                "weights length {} does not match sample count {}",
                weights.len(),
                self.len()
            )));
        }
        if let Some(i) = weights.iter().position(|w| !(w.is_finite() && *w >= 0.0)) {
            return Err(Error::InvalidData(format!(
                "weight {i} is {}, expected a finite value >= 0",
                weights[i]
            )));
        }
        self.weights = Some(weights);
        Ok(self)
    }

    #[inline]
    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    #[inline]
    /// Returns true if there are no samples.
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    #[inline]
    /// Returns the per-sample input dimension.
    pub fn input_dim(&self) -> usize {
        self.inputs.input_dim()
    }

    #[inline]
    /// Returns the per-sample target dimension.
    pub fn target_dim(&self) -> usize {
        self.target_dim
    }

    #[inline]
    /// Returns a view of the inputs (X).
    pub fn inputs(&self) -> &Inputs {
        &self.inputs
    }

    #[inline]
    /// Returns the `idx`-th input row (shape: `(input_dim,)`).
    ///
    /// Panics if `idx >= len`.
    pub fn input(&self, idx: usize) -> &[f64] {
        self.inputs.input(idx)
    }

    #[inline]
    /// Returns the `idx`-th target row (shape: `(target_dim,)`).
    ///
    /// Panics if `idx >= len`.
    pub fn target(&self, idx: usize) -> &[f64] {
        let start = idx * self.target_dim;
        &self.targets[start..start + self.target_dim]
    }

    #[inline]
    /// Weight of the `idx`-th sample (1 when the dataset is unweighted).
    pub fn weight(&self, idx: usize) -> f64 {
        match &self.weights {
            Some(w) => w[idx],
            None => 1.0,
        }
    }

    #[inline]
    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }

    /// Iterates over the target rows in order.
    #[inline]
    pub fn target_rows(&self) -> ChunksExact<'_, f64> {
        self.targets.chunks_exact(self.target_dim)
    }

    #[inline]
    pub(crate) fn input_mut(&mut self, idx: usize) -> &mut [f64] {
        self.inputs.input_mut(idx)
    }

    #[inline]
    pub(crate) fn target_mut(&mut self, idx: usize) -> &mut [f64] {
        let start = idx * self.target_dim;
        &mut self.targets[start..start + self.target_dim]
    }
}

fn flatten_rows(what: &str, rows: &[Vec<f64>]) -> Result<(Vec<f64>, usize)> {
    if rows.is_empty() {
        return Err(Error::InvalidData(format!("{what}s must not be empty")));
    }

    let dim = rows[0].len();
    if dim == 0 {
        return Err(Error::InvalidData(format!("{what}_dim must be > 0")));
    }
    for (i, row) in rows.iter().enumerate() {
        if row.len() != dim {
            return Err(Error::InvalidData(format!(
                "{what} row {i} has len {}, expected {dim}",
                row.len()
            )));
        }
    }

    let mut flat = Vec::with_capacity(rows.len() * dim);
    for row in rows {
        flat.extend_from_slice(row);
    }
    Ok((flat, dim))
}
