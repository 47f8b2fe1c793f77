use ndarray::{Array1, Array2, ArrayD, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::activations::Activation;
use crate::builders::NetworkBuilder;
use crate::error::{PolyakError, Result};
use crate::layers::{DenseLayer, LayerGradients, WeightInit};

/// Gradients for every layer of a parameterized model, in layer order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gradients {
    pub layers: Vec<LayerGradients>,
}

impl Gradients {
    pub fn new(layers: Vec<LayerGradients>) -> Self {
        Gradients { layers }
    }

    /// Zero gradients matching the parameters of `model`
    pub fn zeros_like<M: Parameterized + ?Sized>(model: &M) -> Self {
        Gradients {
            layers: model.layers().into_iter().map(LayerGradients::zeros_like).collect(),
        }
    }

    /// L2 norm over all gradient entries
    pub fn global_norm(&self) -> f32 {
        self.layers.iter().map(LayerGradients::squared_norm).sum::<f32>().sqrt()
    }

    /// Rescale the gradients so their global norm is at most `max_norm`.
    ///
    /// Returns the norm before clipping. `None` or an infinite bound leaves the
    /// gradients untouched.
    pub fn clip_norm(&mut self, max_norm: Option<f32>) -> f32 {
        let norm = self.global_norm();
        if let Some(max_norm) = max_norm.filter(|m| m.is_finite()) {
            if norm > max_norm {
                self.scale(max_norm / (norm + 1e-6));
            }
        }
        norm
    }

    pub fn scale(&mut self, factor: f32) {
        for layer in &mut self.layers {
            layer.weights.mapv_inplace(|g| g * factor);
            layer.biases.mapv_inplace(|g| g * factor);
        }
    }

    /// Accumulate `other` into `self`
    pub fn add_assign(&mut self, other: &Gradients) -> Result<()> {
        if self.layers.len() != other.layers.len() {
            return Err(PolyakError::dimension_mismatch(
                format!("{} layers", self.layers.len()),
                format!("{} layers", other.layers.len()),
            ));
        }
        for (acc, g) in self.layers.iter_mut().zip(&other.layers) {
            if acc.weights.dim() != g.weights.dim() || acc.biases.dim() != g.biases.dim() {
                return Err(PolyakError::dimension_mismatch(
                    format!("{:?}", acc.weights.dim()),
                    format!("{:?}", g.weights.dim()),
                ));
            }
            acc.weights += &g.weights;
            acc.biases += &g.biases;
        }
        Ok(())
    }

    /// Concatenate the gradients of several models (e.g. both critic streams)
    pub fn chain(parts: Vec<Gradients>) -> Self {
        Gradients {
            layers: parts.into_iter().flat_map(|g| g.layers).collect(),
        }
    }
}

/// Anything exposing an ordered, mutable parameter set.
///
/// Online and target twins of the same type always yield layers in the same
/// order with identical shapes, which is what target synchronisation relies on.
pub trait Parameterized {
    fn layers(&self) -> Vec<&DenseLayer>;

    fn layers_mut(&mut self) -> Vec<&mut DenseLayer>;

    /// Total number of trainable scalars
    fn param_count(&self) -> usize {
        self.layers().iter().map(|l| l.param_count()).sum()
    }

    /// Named snapshot of every parameter tensor
    fn state_dict(&self) -> NamedParameters {
        let mut tensors = BTreeMap::new();
        for (i, layer) in self.layers().into_iter().enumerate() {
            tensors.insert(format!("layers.{}.weight", i), layer.weights.clone().into_dyn());
            tensors.insert(format!("layers.{}.bias", i), layer.biases.clone().into_dyn());
        }
        NamedParameters { tensors }
    }

    /// Overwrite every parameter from a snapshot. Names and shapes must match exactly.
    fn load_state_dict(&mut self, params: &NamedParameters) -> Result<()> {
        let expected = self.layers().len() * 2;
        if params.tensors.len() != expected {
            return Err(PolyakError::dimension_mismatch(
                format!("{} tensors", expected),
                format!("{} tensors", params.tensors.len()),
            ));
        }
        for (i, layer) in self.layers_mut().into_iter().enumerate() {
            let weight = params.get(&format!("layers.{}.weight", i))?;
            let bias = params.get(&format!("layers.{}.bias", i))?;
            layer.weights = to_fixed(weight, layer.weights.raw_dim())?;
            layer.biases = to_fixed(bias, layer.biases.raw_dim())?;
        }
        Ok(())
    }
}

fn to_fixed<D: ndarray::Dimension>(tensor: &ArrayD<f32>, dim: D) -> Result<ndarray::Array<f32, D>> {
    if tensor.shape() != dim.slice() {
        return Err(PolyakError::dimension_mismatch(
            format!("{:?}", dim.slice()),
            format!("{:?}", tensor.shape()),
        ));
    }
    tensor
        .clone()
        .into_dimensionality::<D>()
        .map_err(|e| PolyakError::Serialization(e.to_string()))
}

/// Serialized parameter snapshot keyed by parameter name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct NamedParameters {
    pub tensors: BTreeMap<String, ArrayD<f32>>,
}

impl NamedParameters {
    pub fn get(&self, name: &str) -> Result<&ArrayD<f32>> {
        self.tensors.get(name).ok_or_else(|| {
            PolyakError::invalid_parameter(name.to_string(), "missing from snapshot".to_string())
        })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = bincode::serialize(self)?;
        fs::write(path, serialized)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path)?;
        Ok(bincode::deserialize(&data)?)
    }
}

/// A feed-forward neural network: a stack of dense layers.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NeuralNetwork {
    pub layers: Vec<DenseLayer>,
}

impl NeuralNetwork {
    /// Create a new network with the given layer sizes and activations.
    ///
    /// `layer_sizes` includes the input size, so `activations.len()` must equal
    /// `layer_sizes.len() - 1`.
    pub fn new<R: Rng + ?Sized>(
        layer_sizes: &[usize],
        activations: &[Activation],
        init: WeightInit,
        rng: &mut R,
    ) -> Result<Self> {
        NetworkBuilder::new(rng).init(init).add_layers(layer_sizes, activations)?.build()
    }

    /// MLP with ReLU hidden layers and the given output activation
    pub fn mlp<R: Rng + ?Sized>(
        input_size: usize,
        hidden_sizes: &[usize],
        output_size: usize,
        output_activation: Activation,
        rng: &mut R,
    ) -> Result<Self> {
        let mut sizes = vec![input_size];
        sizes.extend_from_slice(hidden_sizes);
        sizes.push(output_size);

        let activations = vec![Activation::Relu; hidden_sizes.len()]
            .into_iter()
            .chain(std::iter::once(output_activation))
            .collect::<Vec<_>>();

        Self::new(&sizes, &activations, WeightInit::FanInUniform, rng)
    }

    pub fn with_layers(mut self, layers: Vec<DenseLayer>) -> Self {
        self.layers = layers;
        self
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |l| l.input_size())
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, |l| l.output_size())
    }

    /// Forward pass for a single input vector. Does not touch the backward cache.
    pub fn forward(&self, input: ArrayView1<f32>) -> Array1<f32> {
        let output = self.predict_batch(input.insert_axis(Axis(0)));
        output.index_axis_move(Axis(0), 0)
    }

    /// Forward pass for a batch without caching activations
    pub fn predict_batch(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let mut current_output = inputs.to_owned();
        for layer in &self.layers {
            current_output = layer.predict_batch(current_output.view());
        }
        current_output
    }

    /// Forward pass for a batch, caching what [`NeuralNetwork::backward_batch`] needs.
    pub fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let mut current_output = inputs.to_owned();
        for layer in &mut self.layers {
            current_output = layer.forward_batch(current_output.view());
        }
        current_output
    }

    /// Backpropagate `dL/doutput` from the most recent `forward_batch`.
    ///
    /// Returns the parameter gradients and `dL/dinput`.
    pub fn backward_batch(&self, output_errors: ArrayView2<f32>) -> Result<(Gradients, Array2<f32>)> {
        let mut gradients = Vec::with_capacity(self.layers.len());
        let mut current_error = output_errors.to_owned();

        for layer in self.layers.iter().rev() {
            let (input_error, layer_gradients) = layer.backward_batch(current_error.view())?;
            gradients.push(layer_gradients);
            current_error = input_error;
        }

        gradients.reverse();
        Ok((Gradients::new(gradients), current_error))
    }

    /// Save the network to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = bincode::serialize(self)?;
        fs::write(path, serialized)?;
        Ok(())
    }

    /// Load a network from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path)?;
        Ok(bincode::deserialize(&data)?)
    }
}

impl Parameterized for NeuralNetwork {
    fn layers(&self) -> Vec<&DenseLayer> {
        self.layers.iter().collect()
    }

    fn layers_mut(&mut self) -> Vec<&mut DenseLayer> {
        self.layers.iter_mut().collect()
    }
}

/// Concatenate two batches column-wise (`[a | b]`), e.g. states and actions for a critic.
pub fn concat_columns(a: ArrayView2<f32>, b: ArrayView2<f32>) -> Result<Array2<f32>> {
    ndarray::concatenate(Axis(1), &[a.view(), b.view()])
        .map_err(|e| PolyakError::dimension_mismatch(format!("{} rows", a.nrows()), format!("{} rows ({})", b.nrows(), e)))
}
