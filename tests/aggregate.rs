mod common;

use approx::assert_relative_eq;

use rust_nnet::{
    AccumulateScratch, Activation, Error, Network, NetworkBuilder, default_chunk_size,
    parallel_accumulate, sequential_accumulate,
};
use rust_nnet::aggregate::sequential_accumulate_with;

use common::synthetic_dataset;

fn network() -> Network {
    NetworkBuilder::new(4)
        .unwrap()
        .add_layer(6, Activation::LinearTanh)
        .unwrap()
        .add_layer(5, Activation::Sigmoid)
        .unwrap()
        .add_layer(3, Activation::Linear)
        .unwrap()
        .build_with_seed(42)
        .unwrap()
}

#[test]
fn parallel_matches_sequential_for_any_chunk_size() {
    let net = network();
    let data = synthetic_dataset(&net, 123, 1);

    let mut seq = net.new_per_parameter_buffer();
    let seq_loss = sequential_accumulate(&data, &net, &mut seq).unwrap();
    assert!(seq_loss > 0.0);

    for chunk_size in [1, 2, 7, 50, 122, 123, 1000, default_chunk_size(data.len())] {
        let mut par = net.new_per_parameter_buffer();
        let par_loss = parallel_accumulate(&data, &net, &mut par, chunk_size).unwrap();

        assert_relative_eq!(par_loss, seq_loss, max_relative = 1e-10);
        for (&p, &s) in par.flat().iter().zip(seq.flat()) {
            assert_relative_eq!(p, s, epsilon = 1e-12, max_relative = 1e-10);
        }
    }
}

#[test]
fn parallel_result_is_reproducible() {
    let net = network();
    let data = synthetic_dataset(&net, 200, 3);

    let mut a = net.new_per_parameter_buffer();
    let mut b = net.new_per_parameter_buffer();
    let loss_a = parallel_accumulate(&data, &net, &mut a, 9).unwrap();
    let loss_b = parallel_accumulate(&data, &net, &mut b, 9).unwrap();
    assert_eq!(loss_a.to_bits(), loss_b.to_bits());
    assert_eq!(a, b);
}

#[test]
fn single_chunk_equals_sequential_exactly() {
    let net = network();
    let data = synthetic_dataset(&net, 40, 5);

    let mut seq = net.new_per_parameter_buffer();
    let mut par = net.new_per_parameter_buffer();
    let seq_loss = sequential_accumulate(&data, &net, &mut seq).unwrap();
    let par_loss = parallel_accumulate(&data, &net, &mut par, data.len()).unwrap();
    assert_eq!(seq_loss, par_loss);
    assert_eq!(seq.flat(), par.flat());
}

#[test]
fn weighted_parallel_matches_weighted_sequential() {
    let net = network();
    let data = synthetic_dataset(&net, 31, 8);
    let weights = (0..data.len()).map(|i| (i % 4) as f64 * 0.5).collect();
    let data = data.with_weights(weights).unwrap();

    let mut seq = net.new_per_parameter_buffer();
    let mut par = net.new_per_parameter_buffer();
    let seq_loss = sequential_accumulate(&data, &net, &mut seq).unwrap();
    let par_loss = parallel_accumulate(&data, &net, &mut par, 4).unwrap();

    assert_relative_eq!(par_loss, seq_loss, max_relative = 1e-10);
    for (&p, &s) in par.flat().iter().zip(seq.flat()) {
        assert_relative_eq!(p, s, epsilon = 1e-12, max_relative = 1e-10);
    }
}

#[test]
fn reused_scratch_gives_identical_results() {
    let net = network();
    let data = synthetic_dataset(&net, 17, 2);
    let mut scratch = AccumulateScratch::new(&net);

    let mut first = net.new_per_parameter_buffer();
    let mut second = net.new_per_parameter_buffer();
    let l1 = sequential_accumulate_with(&data, &net, &mut first, &mut scratch).unwrap();
    let l2 = sequential_accumulate_with(&data, &net, &mut second, &mut scratch).unwrap();
    assert_eq!(l1, l2);
    assert_eq!(first, second);
}

#[test]
fn gradient_buffer_of_another_network_is_rejected() {
    let net = network();
    let other = NetworkBuilder::new(4)
        .unwrap()
        .add_layer(2, Activation::Linear)
        .unwrap()
        .build_with_seed(0)
        .unwrap();
    let data = synthetic_dataset(&net, 3, 0);
    let mut wrong = other.new_per_parameter_buffer();

    let err = parallel_accumulate(&data, &net, &mut wrong, 2).unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { .. }));
    let err = sequential_accumulate(&data, &net, &mut wrong).unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { .. }));

    // Same parameter count, different layout.
    let same_count = NetworkBuilder::new(82)
        .unwrap()
        .add_layer(1, Activation::Linear)
        .unwrap()
        .build_with_seed(0)
        .unwrap();
    assert_eq!(same_count.total_parameters(), net.total_parameters());
    let mut wrong = same_count.new_per_parameter_buffer();
    let err = sequential_accumulate(&data, &net, &mut wrong).unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { .. }));
    let err = parallel_accumulate(&data, &net, &mut wrong, 2).unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { .. }));
    assert!(wrong.flat().iter().all(|&g| g == 0.0));
}
