use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;
use serde::{Serialize, Deserialize};
use crate::activations::Activation;
use crate::error::{PolyakError, Result};
use super::initialization::WeightInit;

/// Gradients of a single dense layer's parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerGradients {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
}

impl LayerGradients {
    /// Zero gradients shaped like `layer`
    pub fn zeros_like(layer: &DenseLayer) -> Self {
        LayerGradients {
            weights: Array2::zeros(layer.weights.dim()),
            biases: Array1::zeros(layer.biases.dim()),
        }
    }

    /// Sum of squared gradient entries
    pub fn squared_norm(&self) -> f32 {
        self.weights.iter().map(|&g| g * g).sum::<f32>()
            + self.biases.iter().map(|&g| g * g).sum::<f32>()
    }
}

/// A fully connected (dense) layer in a neural network
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DenseLayer {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    pub activation: Activation,
    #[serde(skip)]
    pre_activation_output: Option<Array2<f32>>,
    #[serde(skip)]
    inputs: Option<Array2<f32>>,
}

impl DenseLayer {
    /// Create a new dense layer with the given input size, output size, and activation function.
    /// Parameters are drawn from `init` using the caller's random generator.
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        init: WeightInit,
        rng: &mut R,
    ) -> Self {
        let weights = init.initialize_weights((input_size, output_size), rng);
        let biases = init.initialize_biases(input_size, output_size, rng);
        DenseLayer {
            weights,
            biases,
            activation,
            pre_activation_output: None,
            inputs: None,
        }
    }

    /// Replace the weights; the shape must match `(input_size, output_size)`.
    pub fn with_weights(mut self, weights: Array2<f32>) -> Result<Self> {
        if weights.dim() != self.weights.dim() {
            return Err(PolyakError::dimension_mismatch(
                format!("weights of shape {:?}", self.weights.dim()),
                format!("{:?}", weights.dim()),
            ));
        }
        self.weights = weights;
        Ok(self)
    }

    pub fn with_biases(mut self, biases: Array1<f32>) -> Result<Self> {
        if biases.dim() != self.biases.dim() {
            return Err(PolyakError::dimension_mismatch(
                format!("{} biases", self.biases.dim()),
                format!("{}", biases.dim()),
            ));
        }
        self.biases = biases;
        Ok(self)
    }

    pub fn input_size(&self) -> usize {
        self.weights.shape()[0]
    }

    pub fn output_size(&self) -> usize {
        self.weights.shape()[1]
    }

    /// Number of trainable scalars in this layer
    pub fn param_count(&self) -> usize {
        self.weights.len() + self.biases.len()
    }

    /// Forward pass for a batch of inputs; caches what `backward_batch` needs.
    pub fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Array2<f32> {
        self.inputs = Some(inputs.to_owned());
        let mut outputs = inputs.dot(&self.weights) + &self.biases.view().insert_axis(Axis(0));
        self.pre_activation_output = Some(outputs.clone());
        self.activation.apply_batch(&mut outputs);
        outputs
    }

    /// Forward pass without touching the backward cache.
    pub fn predict_batch(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let mut outputs = inputs.dot(&self.weights) + &self.biases.view().insert_axis(Axis(0));
        self.activation.apply_batch(&mut outputs);
        outputs
    }

    /// Backward pass for a batch of output errors `dL/dy`.
    ///
    /// Returns `(dL/dx, gradients)` for the most recent `forward_batch` call.
    pub fn backward_batch(&self, output_errors: ArrayView2<f32>) -> Result<(Array2<f32>, LayerGradients)> {
        let (pre_activation_output, inputs) = match (&self.pre_activation_output, &self.inputs) {
            (Some(z), Some(x)) => (z, x),
            _ => {
                return Err(PolyakError::Numerical(
                    "forward_batch() must be called before backward_batch()".to_string(),
                ))
            }
        };
        if output_errors.dim() != pre_activation_output.dim() {
            return Err(PolyakError::dimension_mismatch(
                format!("{:?}", pre_activation_output.dim()),
                format!("{:?}", output_errors.dim()),
            ));
        }

        let activation_deriv = self.activation.derivative_batch(pre_activation_output.view());
        let adjusted_error = &output_errors * &activation_deriv;
        let weight_gradients = inputs.t().dot(&adjusted_error);
        let bias_gradients = adjusted_error.sum_axis(Axis(0));
        let input_errors = adjusted_error.dot(&self.weights.t());

        Ok((
            input_errors,
            LayerGradients {
                weights: weight_gradients,
                biases: bias_gradients,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn linear_layer() -> DenseLayer {
        let mut rng = StdRng::seed_from_u64(0);
        DenseLayer::new(2, 1, Activation::Linear, WeightInit::Zeros, &mut rng)
            .with_weights(array![[2.0], [-1.0]])
            .unwrap()
            .with_biases(array![0.5])
            .unwrap()
    }

    #[test]
    fn test_forward_linear() {
        let mut layer = linear_layer();
        let out = layer.forward_batch(array![[1.0, 1.0], [2.0, 0.0]].view());
        assert_eq!(out, array![[1.5], [4.5]]);
    }

    #[test]
    fn test_backward_gradients() {
        let mut layer = linear_layer();
        layer.forward_batch(array![[1.0, 3.0]].view());
        let (input_err, grads) = layer.backward_batch(array![[1.0]].view()).unwrap();

        assert_eq!(grads.weights, array![[1.0], [3.0]]);
        assert_eq!(grads.biases, array![1.0]);
        assert_eq!(input_err, array![[2.0, -1.0]]);
    }

    #[test]
    fn test_backward_without_forward_fails() {
        let layer = linear_layer();
        assert!(layer.backward_batch(array![[1.0]].view()).is_err());
    }
}
