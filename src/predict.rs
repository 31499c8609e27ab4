//! Scaled prediction front-end.
//!
//! The engines in [`crate::forward`] and [`crate::aggregate`] work in scaled
//! space. These methods wrap them for raw data: inputs go through the input
//! scaler, predictions come back through the output scaler's `unscale`.

use rayon::prelude::*;

use crate::error::check_len;
use crate::forward::{ForwardCache, predict};
use crate::{Dataset, Error, Inputs, Network, Result};

/// Samples per rayon task in [`Network::predict_batch`].
pub const PREDICT_CHUNK_SIZE: usize = 100;

impl Network {
    /// Predicts one raw input.
    ///
    /// Allocates its own buffers; for many samples prefer [`Network::predict_batch`].
    pub fn predict(&self, input: &[f64]) -> Result<Vec<f64>> {
        self.check_scalers()?;
        check_len("network input", self.input_dim(), input.len())?;

        let mut x = input.to_vec();
        self.input_scaler().scale(&mut x)?;
        let mut cache = ForwardCache::new(self);
        let mut y = predict(&x, self, &mut cache)?.to_vec();
        self.output_scaler().unscale(&mut y)?;
        Ok(y)
    }

    /// Predicts every row of `inputs`, in parallel chunks.
    ///
    /// Returns a flat `(inputs.len(), output_dim)` row-major buffer.
    pub fn predict_batch(&self, inputs: &Inputs) -> Result<Vec<f64>> {
        self.check_scalers()?;
        check_len("batch input width", self.input_dim(), inputs.input_dim())?;

        let out_dim = self.output_dim();
        let mut outputs = vec![0.0; inputs.len() * out_dim];
        outputs
            .par_chunks_mut(PREDICT_CHUNK_SIZE * out_dim)
            .enumerate()
            .try_for_each(|(chunk, out)| -> Result<()> {
                let mut cache = ForwardCache::new(self);
                let mut x = vec![0.0; self.input_dim()];
                let first = chunk * PREDICT_CHUNK_SIZE;
                for (k, y) in out.chunks_exact_mut(out_dim).enumerate() {
                    x.copy_from_slice(inputs.input(first + k));
                    self.input_scaler().scale(&mut x)?;
                    y.copy_from_slice(predict(&x, self, &mut cache)?);
                    self.output_scaler().unscale(y)?;
                }
                Ok(())
            })?;
        Ok(outputs)
    }

    /// Fits the input scaler to `data`'s inputs and the output scaler to its
    /// targets.
    ///
    /// Both scalers are always fitted when the data is usable. A constant
    /// dimension is reported as `DegenerateScale` after both fits, with input
    /// dimensions taking precedence.
    pub fn fit_scalers(&mut self, data: &Dataset) -> Result<()> {
        check_len("dataset input width", self.input_dim(), data.input_dim())?;
        check_len("dataset target width", self.output_dim(), data.target_dim())?;

        let input = self.input_scaler_mut().set_scale(data.inputs().rows());
        let output = self.output_scaler_mut().set_scale(data.target_rows());
        let hard = |r: &Result<()>| matches!(r, Err(e) if !matches!(e, Error::DegenerateScale { .. }));
        if hard(&input) {
            return input;
        }
        if hard(&output) {
            return output;
        }
        input.and(output)
    }

    /// Copy of `data` with inputs and targets mapped into scaled space, ready
    /// for the accumulators.
    pub fn scale_dataset(&self, data: &Dataset) -> Result<Dataset> {
        self.check_scalers()?;
        check_len("dataset input width", self.input_dim(), data.input_dim())?;
        check_len("dataset target width", self.output_dim(), data.target_dim())?;

        let mut scaled = data.clone();
        for idx in 0..scaled.len() {
            self.input_scaler().scale(scaled.input_mut(idx))?;
            self.output_scaler().scale(scaled.target_mut(idx))?;
        }
        Ok(scaled)
    }

    fn check_scalers(&self) -> Result<()> {
        if !self.input_scaler().is_scaled() || !self.output_scaler().is_scaled() {
            return Err(Error::NotScaled);
        }
        Ok(())
    }
}
