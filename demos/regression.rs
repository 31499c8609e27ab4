use rand::SeedableRng;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use tracing_subscriber::EnvFilter;

use rust_nnet::{Dataset, NetworkBuilder, default_chunk_size, parallel_accumulate};

fn main() -> rust_nnet::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Task: learn y = sin(x0) * x1 on raw inputs x0 in [0, 6], x1 in [10, 20].
    let mut rng = StdRng::seed_from_u64(1);
    let d0 = Uniform::new(0.0, 6.0);
    let d1 = Uniform::new(10.0, 20.0);

    let mut xs = Vec::with_capacity(512);
    let mut ys = Vec::with_capacity(512);
    for _ in 0..512 {
        let x0: f64 = d0.sample(&mut rng);
        let x1: f64 = d1.sample(&mut rng);
        xs.push(vec![x0, x1]);
        ys.push(vec![x0.sin() * x1]);
    }
    let raw = Dataset::from_rows(&xs, &ys)?;

    let mut net = NetworkBuilder::default_regression(2, 1, 2, 12)?.build_with_seed(0)?;
    net.fit_scalers(&raw)?;
    let train = net.scale_dataset(&raw)?;

    // Plain full-batch gradient descent on the mean loss.
    let chunk = default_chunk_size(train.len());
    let lr = 0.05 / train.len() as f64;
    let mut grad = net.new_per_parameter_buffer();
    let mut params = net.parameters().to_vec();
    for epoch in 0..=2000 {
        grad.zero();
        let loss = parallel_accumulate(&train, &net, &mut grad, chunk)?;
        if epoch % 200 == 0 {
            println!("epoch={epoch} mean_loss={:.6}", loss / train.len() as f64);
        }
        for (p, g) in params.iter_mut().zip(grad.flat()) {
            *p -= lr * g;
        }
        net.set_parameters_flat(&params)?;
    }

    for x in [[1.0, 12.0], [3.0, 15.0], [5.0, 18.0]] {
        let y = net.predict(&x)?;
        println!("x={x:?} predicted={:.3} expected={:.3}", y[0], x[0].sin() * x[1]);
    }
    Ok(())
}
