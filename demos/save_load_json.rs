#[cfg(not(feature = "serde"))]
fn main() {
    println!("enable the `serde` feature: cargo run --example save_load_json --features serde");
}

#[cfg(feature = "serde")]
fn main() -> rust_nnet::Result<()> {
    use rust_nnet::{Activation, Dataset, Loss, Network, NetworkBuilder, Scaler};

    let xs = vec![vec![0.0, 10.0], vec![1.0, 20.0], vec![2.0, 30.0], vec![3.0, 40.0]];
    let ys = vec![vec![1.0], vec![3.0], vec![5.0], vec![7.0]];
    let raw = Dataset::from_rows(&xs, &ys)?;

    let mut net = NetworkBuilder::new(2)?
        .add_layer(4, Activation::LinearTanh)?
        .add_layer(1, Activation::Linear)?
        .loss(Loss::LogSquared)?
        .input_scaler(Scaler::linear())
        .output_scaler(Scaler::normal())
        .build_with_seed(0)?;
    net.fit_scalers(&raw)?;

    let path = "target/tmp_network.json";
    net.save_json(path)?;

    let loaded = Network::load_json(path)?;
    assert_eq!(loaded.predict(&[1.5, 25.0])?, net.predict(&[1.5, 25.0])?);
    println!("saved and loaded network: {path}");
    Ok(())
}
