#![allow(dead_code)]

use rust_nnet::forward::predict;
use rust_nnet::{Dataset, ForwardCache, Network};

pub const FD_STEP: f64 = 1e-6;

pub fn assert_close(analytic: f64, numeric: f64, abs_tol: f64, rel_tol: f64) {
    let diff = (analytic - numeric).abs();
    let scale = analytic.abs().max(numeric.abs()).max(1.0);
    assert!(
        diff <= abs_tol || diff / scale <= rel_tol,
        "analytic={analytic} numeric={numeric} diff={diff}"
    );
}

/// Weighted loss summed over `data`, computed with forward passes only.
pub fn total_loss(net: &Network, data: &Dataset) -> f64 {
    let mut cache = ForwardCache::new(net);
    let mut total = 0.0;
    for i in 0..data.len() {
        let pred = predict(data.input(i), net, &mut cache).unwrap();
        total += data.weight(i) * net.loss().loss(pred, data.target(i)).unwrap();
    }
    total
}

/// Central-difference gradient of [`total_loss`] with respect to every parameter.
pub fn numeric_gradient(net: &mut Network, data: &Dataset, step: f64) -> Vec<f64> {
    let mut params = net.parameters().to_vec();
    let mut grad = vec![0.0; params.len()];
    for p in 0..params.len() {
        let orig = params[p];

        params[p] = orig + step;
        net.set_parameters_flat(&params).unwrap();
        let plus = total_loss(net, data);

        params[p] = orig - step;
        net.set_parameters_flat(&params).unwrap();
        let minus = total_loss(net, data);

        params[p] = orig;
        grad[p] = (plus - minus) / (2.0 * step);
    }
    net.set_parameters_flat(&params).unwrap();
    grad
}

/// Deterministic pseudo-random dataset for `net`'s widths.
pub fn synthetic_dataset(net: &Network, len: usize, seed: u64) -> Dataset {
    let s = seed as f64;
    let inputs: Vec<f64> = (0..len * net.input_dim())
        .map(|i| ((i as f64 + 1.0) * 0.618_033_988_75 + s).sin() * 1.5)
        .collect();
    let targets: Vec<f64> = (0..len * net.output_dim())
        .map(|i| ((i as f64 + 1.0) * 0.414_213_562_37 + 2.0 * s).cos())
        .collect();
    Dataset::from_flat(inputs, targets, net.input_dim(), net.output_dim()).unwrap()
}
