//! Network serialization/deserialization (feature: `serde`).
//!
//! This module defines a versioned, stable on-disk format for `Network`: the
//! input width, one descriptor per neuron, the flat parameter buffer, the loss
//! and both scalers.
//!
//! Design notes:
//! - We do NOT directly serialize internal `Network`/`Layer` structs, to keep the
//!   file format stable even if internal representation changes.
//! - Only built-in sum neurons have a descriptor; a network holding custom
//!   neuron types cannot be saved.
//! - All deserialization validates the topology, the parameter count, that all
//!   parameters are finite, the loss configuration and the scaler shapes.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    Activation, Error, Layer, Loss, Network, Neuron, Result, ScaleKind, Scaler, SumNeuron,
};

pub const MODEL_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedNetwork {
    pub format_version: u32,
    pub input_dim: usize,
    /// Neuron descriptors, `[layer][neuron]`.
    pub layers: Vec<Vec<SerializedNeuron>>,
    /// Flat parameter buffer, layer-major then neuron-major.
    pub parameters: Vec<f64>,
    pub loss: SerializedLoss,
    pub input_scaler: SerializedScaler,
    pub output_scaler: SerializedScaler,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SerializedNeuron {
    Sum { activation: SerializedActivation },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializedActivation {
    Sigmoid,
    Linear,
    Tanh,
    LinearTanh,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SerializedLoss {
    SquaredDistance,
    ManhattanDistance,
    RelativeSquared { eps: f64 },
    LogSquared,
}

/// Empty `offset`/`span` means the scaler was not fitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedScaler {
    pub kind: ScaleKind,
    pub offset: Vec<f64>,
    pub span: Vec<f64>,
}

impl From<Activation> for SerializedActivation {
    fn from(value: Activation) -> Self {
        match value {
            Activation::Sigmoid => SerializedActivation::Sigmoid,
            Activation::Linear => SerializedActivation::Linear,
            Activation::Tanh => SerializedActivation::Tanh,
            Activation::LinearTanh => SerializedActivation::LinearTanh,
        }
    }
}

impl SerializedActivation {
    fn into_activation(self) -> Activation {
        match self {
            SerializedActivation::Sigmoid => Activation::Sigmoid,
            SerializedActivation::Linear => Activation::Linear,
            SerializedActivation::Tanh => Activation::Tanh,
            SerializedActivation::LinearTanh => Activation::LinearTanh,
        }
    }
}

impl From<Loss> for SerializedLoss {
    fn from(value: Loss) -> Self {
        match value {
            Loss::SquaredDistance => SerializedLoss::SquaredDistance,
            Loss::ManhattanDistance => SerializedLoss::ManhattanDistance,
            Loss::RelativeSquared { eps } => SerializedLoss::RelativeSquared { eps },
            Loss::LogSquared => SerializedLoss::LogSquared,
        }
    }
}

impl SerializedLoss {
    fn into_loss(self) -> Loss {
        match self {
            SerializedLoss::SquaredDistance => Loss::SquaredDistance,
            SerializedLoss::ManhattanDistance => Loss::ManhattanDistance,
            SerializedLoss::RelativeSquared { eps } => Loss::RelativeSquared { eps },
            SerializedLoss::LogSquared => Loss::LogSquared,
        }
    }
}

impl From<&Scaler> for SerializedScaler {
    fn from(value: &Scaler) -> Self {
        Self {
            kind: value.kind(),
            offset: value.offset().to_vec(),
            span: value.span().to_vec(),
        }
    }
}

impl SerializedScaler {
    fn into_scaler(self, what: &str) -> Result<Scaler> {
        if self.offset.is_empty() && self.span.is_empty() {
            return Ok(Scaler::unfitted(self.kind));
        }
        Scaler::from_parts(self.kind, self.offset, self.span)
            .map_err(|e| Error::InvalidData(format!("{what} scaler invalid: {e}")))
    }
}

impl SerializedNetwork {
    pub fn validate(&self) -> Result<()> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(Error::InvalidData(format!(
                "unsupported model format_version {}; expected {}",
                self.format_version, MODEL_FORMAT_VERSION
            )));
        }
        if self.input_dim == 0 {
            return Err(Error::InvalidData("input_dim must be > 0".to_owned()));
        }
        if self.layers.is_empty() {
            return Err(Error::InvalidData(
                "serialized network must have at least one layer".to_owned(),
            ));
        }
        if let Some(i) = self.layers.iter().position(Vec::is_empty) {
            return Err(Error::InvalidData(format!("layer {i} has no neurons")));
        }
        if self.parameters.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidData(
                "parameters must contain only finite values".to_owned(),
            ));
        }
        self.loss
            .into_loss()
            .validate()
            .map_err(|e| Error::InvalidData(format!("invalid loss: {e}")))?;
        Ok(())
    }
}

impl TryFrom<&Network> for SerializedNetwork {
    type Error = Error;

    fn try_from(net: &Network) -> std::result::Result<Self, Self::Error> {
        let mut layers = Vec::with_capacity(net.num_layers());
        for (l, layer) in net.layers().iter().enumerate() {
            let mut neurons = Vec::with_capacity(layer.width());
            for (i, neuron) in layer.neurons().iter().enumerate() {
                let activation = neuron.builtin_activation().ok_or_else(|| {
                    Error::Serialization(format!(
                        "neuron ({l}, {i}) is a custom type with no serialized form"
                    ))
                })?;
                neurons.push(SerializedNeuron::Sum {
                    activation: activation.into(),
                });
            }
            layers.push(neurons);
        }

        Ok(Self {
            format_version: MODEL_FORMAT_VERSION,
            input_dim: net.input_dim(),
            layers,
            parameters: net.parameters().to_vec(),
            loss: net.loss().into(),
            input_scaler: net.input_scaler().into(),
            output_scaler: net.output_scaler().into(),
        })
    }
}

impl TryFrom<SerializedNetwork> for Network {
    type Error = Error;

    fn try_from(value: SerializedNetwork) -> std::result::Result<Self, Self::Error> {
        value.validate()?;

        let layers: Vec<Layer> = value
            .layers
            .into_iter()
            .map(|neurons| {
                neurons
                    .into_iter()
                    .map(|n| match n {
                        SerializedNeuron::Sum { activation } => {
                            Arc::new(SumNeuron::new(activation.into_activation()))
                                as Arc<dyn Neuron>
                        }
                    })
                    .collect()
            })
            .collect();

        // `from_parts` checks the parameter count against the topology.
        let mut net = Network::from_parts(value.input_dim, layers, value.parameters)
            .map_err(|e| Error::InvalidData(format!("network invalid: {e}")))?;
        net.set_loss(value.loss.into_loss())?;

        let input_scaler = value.input_scaler.into_scaler("input")?;
        let output_scaler = value.output_scaler.into_scaler("output")?;
        check_scaler_width("input", &input_scaler, net.input_dim())?;
        check_scaler_width("output", &output_scaler, net.output_dim())?;
        net.set_input_scaler(input_scaler);
        net.set_output_scaler(output_scaler);
        Ok(net)
    }
}

fn check_scaler_width(what: &str, scaler: &Scaler, width: usize) -> Result<()> {
    if scaler.is_scaled() && scaler.dimensions() != width {
        return Err(Error::InvalidData(format!(
            "{what} scaler has {} dimensions, network has {width}",
            scaler.dimensions()
        )));
    }
    Ok(())
}

impl Network {
    /// Serialize the network to a pretty-printed JSON string.
    pub fn to_json_string_pretty(&self) -> Result<String> {
        let ser = SerializedNetwork::try_from(self)?;
        serde_json::to_string_pretty(&ser)
            .map_err(|e| Error::Serialization(format!("failed to serialize network: {e}")))
    }

    /// Serialize the network to a compact JSON string.
    pub fn to_json_string(&self) -> Result<String> {
        let ser = SerializedNetwork::try_from(self)?;
        serde_json::to_string(&ser)
            .map_err(|e| Error::Serialization(format!("failed to serialize network: {e}")))
    }

    /// Parse a network from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let ser: SerializedNetwork = serde_json::from_str(s)
            .map_err(|e| Error::Serialization(format!("failed to parse network json: {e}")))?;
        ser.try_into()
    }

    /// Save the network to a JSON file (pretty-printed).
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let s = self.to_json_string_pretty()?;
        let p = path.as_ref();
        std::fs::write(p, s).map_err(|e| Error::Io(format!("failed to write {}: {e}", p.display())))?;
        tracing::debug!(path = %p.display(), "saved network");
        Ok(())
    }

    /// Load a network from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let s = std::fs::read_to_string(p)
            .map_err(|e| Error::Io(format!("failed to read {}: {e}", p.display())))?;
        Self::from_json_str(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::NetworkBuilder;

    fn sample_network() -> Network {
        let mut net = NetworkBuilder::new(2)
            .unwrap()
            .add_layer(3, Activation::LinearTanh)
            .unwrap()
            .add_layer(1, Activation::Sigmoid)
            .unwrap()
            .loss(Loss::RelativeSquared { eps: 0.25 })
            .unwrap()
            .input_scaler(Scaler::linear())
            .build_with_seed(5)
            .unwrap();
        let rows = [vec![0.0, 1.0], vec![2.0, 5.0]];
        net.input_scaler_mut()
            .set_scale(rows.iter().map(Vec::as_slice))
            .unwrap();
        net
    }

    #[test]
    fn json_roundtrip_preserves_everything() {
        let net = sample_network();
        let json = net.to_json_string_pretty().unwrap();
        let loaded = Network::from_json_str(&json).unwrap();

        assert_eq!(loaded.parameters(), net.parameters());
        assert_eq!(loaded.layout(), net.layout());
        assert_eq!(loaded.loss(), net.loss());
        assert_eq!(loaded.input_scaler(), net.input_scaler());
        assert_eq!(loaded.output_scaler(), net.output_scaler());
        assert_eq!(loaded.to_json_string_pretty().unwrap(), json);
    }

    #[test]
    fn format_uses_snake_case_tags() {
        let json = sample_network().to_json_string().unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["format_version"], 1);
        assert_eq!(v["layers"][0][0]["kind"], "sum");
        assert_eq!(v["layers"][0][0]["activation"], "linear_tanh");
        assert_eq!(v["loss"]["kind"], "relative_squared");
        assert_eq!(v["loss"]["eps"], 0.25);
        assert_eq!(v["input_scaler"]["kind"], "linear");
        assert_eq!(v["parameters"].as_array().unwrap().len(), 3 * 3 + 4);
    }

    #[test]
    fn rejects_unknown_version() {
        let bad = r#"{"format_version":999,"input_dim":1,"layers":[],"parameters":[],
            "loss":{"kind":"log_squared"},
            "input_scaler":{"kind":"identity","offset":[],"span":[]},
            "output_scaler":{"kind":"identity","offset":[],"span":[]}}"#;
        let err = Network::from_json_str(bad).unwrap_err();
        assert!(format!("{err}").contains("format_version"));
    }

    #[test]
    fn rejects_wrong_parameter_count() {
        let net = sample_network();
        let mut ser = SerializedNetwork::try_from(&net).unwrap();
        ser.parameters.pop();
        assert!(matches!(Network::try_from(ser), Err(Error::InvalidData(_))));
    }

    #[test]
    fn rejects_scaler_of_wrong_width() {
        let net = sample_network();
        let mut ser = SerializedNetwork::try_from(&net).unwrap();
        ser.output_scaler = SerializedScaler {
            kind: ScaleKind::Normal,
            offset: vec![0.0, 0.0],
            span: vec![1.0, 1.0],
        };
        assert!(matches!(Network::try_from(ser), Err(Error::InvalidData(_))));
    }

    #[test]
    fn custom_neurons_cannot_be_saved() {
        #[derive(Debug)]
        struct Square;
        impl Neuron for Square {
            fn num_parameters(&self, _num_inputs: usize) -> usize {
                0
            }
            fn combine(&self, _params: &[f64], inputs: &[f64]) -> f64 {
                inputs.iter().map(|x| x * x).sum()
            }
            fn activate(&self, combination: f64) -> f64 {
                combination
            }
            fn d_combine_d_parameters(&self, _: &[f64], _: &[f64], _: f64, _: &mut [f64]) {}
            fn d_combine_d_input(&self, _: &[f64], inputs: &[f64], _: f64, out: &mut [f64]) {
                for (o, x) in out.iter_mut().zip(inputs) {
                    *o = 2.0 * x;
                }
            }
            fn d_activate_d_combination(&self, _: f64, _: f64) -> f64 {
                1.0
            }
            fn randomize(&self, _: &mut [f64], _: &mut dyn rand::RngCore) {}
        }

        let net = NetworkBuilder::new(2)
            .unwrap()
            .add_layer(2, Activation::Tanh)
            .unwrap()
            .add_custom_layer(Layer::new(vec![Arc::new(Square)]))
            .unwrap()
            .build_with_seed(0)
            .unwrap();
        assert!(matches!(
            net.to_json_string(),
            Err(Error::Serialization(_))
        ));
    }
}
