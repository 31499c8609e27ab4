//! Network builder.
//!
//! `NetworkBuilder` is the recommended way to define a network.
//!
//! It makes the structure explicit (layer widths + activations, or custom
//! layers) and carries the collaborators a network is configured with: the
//! loss and the input/output scalers. Parameters are drawn by each neuron
//! descriptor's `randomize` when the network is built.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Activation, Error, Layer, Loss, Network, Result, Scaler};

#[derive(Debug, Clone)]
/// Builder for a [`Network`].
///
/// Example:
///
/// ```rust
/// use rust_nnet::{Activation, Loss, NetworkBuilder};
///
/// # fn main() -> rust_nnet::Result<()> {
/// let net = NetworkBuilder::new(2)?
///     .add_layer(8, Activation::Tanh)?
///     .add_layer(1, Activation::Linear)?
///     .loss(Loss::SquaredDistance)?
///     .build_with_seed(0)?;
/// assert_eq!(net.total_parameters(), 8 * 3 + 9);
/// # Ok(())
/// # }
/// ```
pub struct NetworkBuilder {
    input_dim: usize,
    layers: Vec<Layer>,
    loss: Loss,
    input_scaler: Option<Scaler>,
    output_scaler: Option<Scaler>,
}

impl NetworkBuilder {
    /// Start building a network that accepts inputs of length `input_dim`.
    pub fn new(input_dim: usize) -> Result<Self> {
        if input_dim == 0 {
            return Err(Error::InvalidTopology("input_dim must be > 0".to_owned()));
        }
        Ok(Self {
            input_dim,
            layers: Vec::new(),
            loss: Loss::default(),
            input_scaler: None,
            output_scaler: None,
        })
    }

    /// Convenience constructor from a sizes list + activations.
    ///
    /// `sizes` includes input and output dimensions, so its length must be at least 2.
    /// `activations` must have length `sizes.len() - 1`.
    pub fn from_sizes(sizes: &[usize], activations: &[Activation]) -> Result<Self> {
        if sizes.len() < 2 {
            return Err(Error::InvalidTopology(
                "sizes must include input and output dims".to_owned(),
            ));
        }
        if activations.len() != sizes.len() - 1 {
            return Err(Error::InvalidConfig(format!(
                "activations length {} does not match sizes.len() - 1 ({})",
                activations.len(),
                sizes.len() - 1
            )));
        }

        let mut b = Self::new(sizes[0])?;
        for (&width, &act) in sizes[1..].iter().zip(activations) {
            b = b.add_layer(width, act)?;
        }
        Ok(b)
    }

    /// Regression preset: `num_hidden_layers` tanh layers of `hidden_width`
    /// neurons, a linear output layer, squared-distance loss and (unfitted)
    /// normal scalers on both ends.
    pub fn default_regression(
        input_dim: usize,
        output_dim: usize,
        num_hidden_layers: usize,
        hidden_width: usize,
    ) -> Result<Self> {
        if num_hidden_layers == 0 {
            return Err(Error::InvalidTopology(
                "regression preset needs at least one hidden layer".to_owned(),
            ));
        }
        if hidden_width == 0 {
            return Err(Error::InvalidTopology("hidden width must be > 0".to_owned()));
        }
        let mut b = Self::new(input_dim)?;
        for _ in 0..num_hidden_layers {
            b = b.add_layer(hidden_width, Activation::Tanh)?;
        }
        Ok(b.add_layer(output_dim, Activation::Linear)?
            .loss(Loss::SquaredDistance)?
            .input_scaler(Scaler::normal())
            .output_scaler(Scaler::normal()))
    }

    /// Add a layer of `width` sum neurons sharing `activation`.
    pub fn add_layer(self, width: usize, activation: Activation) -> Result<Self> {
        if width == 0 {
            return Err(Error::InvalidTopology("layer width must be > 0".to_owned()));
        }
        self.add_custom_layer(Layer::uniform(width, activation))
    }

    /// Add a layer of arbitrary neuron descriptors.
    pub fn add_custom_layer(mut self, layer: Layer) -> Result<Self> {
        if layer.is_empty() {
            return Err(Error::InvalidTopology(format!(
                "layer {} has no neurons",
                self.layers.len()
            )));
        }
        self.layers.push(layer);
        Ok(self)
    }

    pub fn loss(mut self, loss: Loss) -> Result<Self> {
        loss.validate()?;
        self.loss = loss;
        Ok(self)
    }

    /// Defaults to an identity scaler of the input width.
    pub fn input_scaler(mut self, scaler: Scaler) -> Self {
        self.input_scaler = Some(scaler);
        self
    }

    /// Defaults to an identity scaler of the output width.
    pub fn output_scaler(mut self, scaler: Scaler) -> Self {
        self.output_scaler = Some(scaler);
        self
    }

    /// Build with parameters drawn from the thread RNG.
    pub fn build(self) -> Result<Network> {
        self.build_with_rng(&mut rand::thread_rng())
    }

    /// Build using a deterministic seed.
    pub fn build_with_seed(self, seed: u64) -> Result<Network> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.build_with_rng(&mut rng)
    }

    /// Build using the provided RNG.
    pub fn build_with_rng<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Network> {
        let mut net = Network::build_with_rng(self.input_dim, self.layers, rng)?;
        net.set_loss(self.loss)?;
        if let Some(s) = self.input_scaler {
            net.set_input_scaler(s);
        }
        if let Some(s) = self.output_scaler {
            net.set_output_scaler(s);
        }
        Ok(net)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::ScaleKind;

    #[test]
    fn builder_validates_widths() {
        assert!(NetworkBuilder::new(0).is_err());
        let b = NetworkBuilder::new(2).unwrap();
        assert!(matches!(
            b.clone().add_layer(0, Activation::Tanh),
            Err(Error::InvalidTopology(_))
        ));
        assert!(matches!(
            b.clone().add_custom_layer(Layer::default()),
            Err(Error::InvalidTopology(_))
        ));
        assert!(matches!(b.build_with_seed(0), Err(Error::InvalidTopology(_))));
    }

    #[test]
    fn from_sizes_matches_manual_builder() {
        let a = NetworkBuilder::from_sizes(&[3, 4, 2], &[Activation::LinearTanh, Activation::Linear])
            .unwrap()
            .build_with_seed(11)
            .unwrap();
        let b = NetworkBuilder::new(3)
            .unwrap()
            .add_layer(4, Activation::LinearTanh)
            .unwrap()
            .add_layer(2, Activation::Linear)
            .unwrap()
            .build_with_seed(11)
            .unwrap();
        assert_eq!(a.parameters(), b.parameters());
        assert_eq!(a.total_parameters(), 4 * 4 + 2 * 5);

        assert!(NetworkBuilder::from_sizes(&[3], &[]).is_err());
        assert!(NetworkBuilder::from_sizes(&[3, 2], &[]).is_err());
    }

    #[test]
    fn default_regression_preset() {
        let net = NetworkBuilder::default_regression(3, 2, 2, 5)
            .unwrap()
            .build_with_seed(0)
            .unwrap();
        assert_eq!(net.num_layers(), 3);
        assert_eq!(net.output_dim(), 2);
        assert_eq!(
            net.layers()[0].neuron(0).builtin_activation(),
            Some(Activation::Tanh)
        );
        assert_eq!(
            net.layers()[2].neuron(1).builtin_activation(),
            Some(Activation::Linear)
        );
        assert_eq!(net.loss(), Loss::SquaredDistance);
        assert_eq!(net.input_scaler().kind(), ScaleKind::Normal);
        assert!(!net.output_scaler().is_scaled());
    }

    #[test]
    fn default_regression_rejects_zero_sizes() {
        for (hidden_layers, width) in [(0, 5), (0, 0), (2, 0)] {
            assert!(matches!(
                NetworkBuilder::default_regression(2, 1, hidden_layers, width),
                Err(Error::InvalidTopology(_))
            ));
        }
        assert!(NetworkBuilder::default_regression(0, 1, 1, 3).is_err());
        assert!(NetworkBuilder::default_regression(2, 0, 1, 3).is_err());
    }

    #[test]
    fn invalid_loss_is_rejected() {
        let b = NetworkBuilder::new(1).unwrap();
        assert!(matches!(
            b.loss(Loss::RelativeSquared { eps: -1.0 }),
            Err(Error::InvalidConfig(_))
        ));
    }
}
