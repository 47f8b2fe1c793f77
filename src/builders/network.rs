use rand::Rng;

use crate::activations::Activation;
use crate::error::{PolyakError, Result};
use crate::layers::{DenseLayer, WeightInit};
use crate::network::NeuralNetwork;

/// Builder for constructing neural networks with a fluent API.
///
/// Layers draw their initial weights from the borrowed generator in the order
/// they are added.
pub struct NetworkBuilder<'r, R: Rng + ?Sized> {
    layers: Vec<DenseLayer>,
    init: WeightInit,
    rng: &'r mut R,
}

impl<'r, R: Rng + ?Sized> NetworkBuilder<'r, R> {
    pub fn new(rng: &'r mut R) -> Self {
        NetworkBuilder {
            layers: Vec::new(),
            init: WeightInit::default(),
            rng,
        }
    }

    /// Initialization used by layers added after this call
    pub fn init(mut self, init: WeightInit) -> Self {
        self.init = init;
        self
    }

    /// Add a dense layer to the network
    pub fn add_dense(mut self, input_size: usize, output_size: usize, activation: Activation) -> Self {
        self.layers.push(DenseLayer::new(input_size, output_size, activation, self.init, &mut *self.rng));
        self
    }

    /// Add a sequence of dense layers. `layer_sizes` includes the input size.
    pub fn add_layers(mut self, layer_sizes: &[usize], activations: &[Activation]) -> Result<Self> {
        if layer_sizes.len() < 2 {
            return Err(PolyakError::invalid_parameter(
                "layer_sizes",
                "network needs at least an input and an output size",
            ));
        }

        if layer_sizes.len() - 1 != activations.len() {
            return Err(PolyakError::dimension_mismatch(
                format!("{} activations", layer_sizes.len() - 1),
                format!("{} activations", activations.len()),
            ));
        }

        for (window, &activation) in layer_sizes.windows(2).zip(activations.iter()) {
            self = self.add_dense(window[0], window[1], activation);
        }

        Ok(self)
    }

    /// Build the network, checking that consecutive layers connect
    pub fn build(self) -> Result<NeuralNetwork> {
        if self.layers.is_empty() {
            return Err(PolyakError::InvalidParameter {
                name: "layers".to_string(),
                reason: "Network must have at least one layer".to_string(),
            });
        }

        for pair in self.layers.windows(2) {
            if pair[0].output_size() != pair[1].input_size() {
                return Err(PolyakError::DimensionMismatch {
                    expected: format!("input size {}", pair[0].output_size()),
                    actual: format!("input size {}", pair[1].input_size()),
                });
            }
        }

        Ok(NeuralNetwork { layers: self.layers })
    }
}
