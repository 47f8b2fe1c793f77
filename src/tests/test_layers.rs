use ndarray::{array, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use crate::activations::Activation;
use crate::layers::{DenseLayer, WeightInit};

#[test]
fn test_layer_creation() {
    let mut rng = StdRng::seed_from_u64(0);
    let layer = DenseLayer::new(3, 2, Activation::Relu, WeightInit::FanInUniform, &mut rng);

    assert_eq!(layer.weights.shape(), [3, 2]);
    assert_eq!(layer.biases.shape(), [2]);
    assert_eq!(layer.input_size(), 3);
    assert_eq!(layer.output_size(), 2);
    assert_eq!(layer.param_count(), 8);
}

#[test]
fn test_fan_in_uniform_bounds() {
    let mut rng = StdRng::seed_from_u64(1);
    let layer = DenseLayer::new(16, 8, Activation::Relu, WeightInit::FanInUniform, &mut rng);
    let limit = 1.0 / 4.0;
    assert!(layer.weights.iter().chain(layer.biases.iter()).all(|&w| (-limit..=limit).contains(&w)));
}

#[test]
fn test_weight_initialization_variants() {
    let mut rng = StdRng::seed_from_u64(2);
    let layer = DenseLayer::new(10, 20, Activation::Relu, WeightInit::XavierUniform, &mut rng);
    let limit = (6.0 / 30.0_f32).sqrt();
    assert!(layer.weights.iter().all(|&w| w >= -limit && w <= limit));
    assert!(layer.biases.iter().all(|&b| b == 0.0));

    let layer = DenseLayer::new(4, 4, Activation::Linear, WeightInit::Zeros, &mut rng);
    assert!(layer.weights.iter().all(|&w| w == 0.0));
}

#[test]
fn test_forward_and_predict_agree() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut layer = DenseLayer::new(3, 2, Activation::Tanh, WeightInit::FanInUniform, &mut rng);
    let input = array![[1.0, 2.0, 3.0], [-1.0, 0.0, 0.5]];

    let predicted = layer.predict_batch(input.view());
    let forwarded = layer.forward_batch(input.view());
    assert_eq!(predicted, forwarded);
}

#[test]
fn test_backward_gradients_linear_layer() {
    let mut rng = StdRng::seed_from_u64(4);
    let mut layer = DenseLayer::new(2, 1, Activation::Linear, WeightInit::Zeros, &mut rng)
        .with_weights(array![[2.0], [-1.0]])
        .unwrap()
        .with_biases(array![0.5])
        .unwrap();

    let input = array![[1.0, 3.0]];
    let output = layer.forward_batch(input.view());
    assert_eq!(output, array![[-0.5]]);

    let (input_err, grads) = layer.backward_batch(array![[1.0]].view()).unwrap();
    assert_eq!(grads.weights, array![[1.0], [3.0]]);
    assert_eq!(grads.biases, array![1.0]);
    assert_eq!(input_err, array![[2.0, -1.0]]);
}

#[test]
fn test_backward_requires_forward() {
    let mut rng = StdRng::seed_from_u64(5);
    let layer = DenseLayer::new(2, 2, Activation::Relu, WeightInit::FanInUniform, &mut rng);
    assert!(layer.backward_batch(Array2::zeros((1, 2)).view()).is_err());
}

#[test]
fn test_backward_rejects_wrong_error_shape() {
    let mut rng = StdRng::seed_from_u64(6);
    let mut layer = DenseLayer::new(2, 2, Activation::Relu, WeightInit::FanInUniform, &mut rng);
    layer.forward_batch(Array2::ones((3, 2)).view());
    assert!(layer.backward_batch(Array2::zeros((3, 1)).view()).is_err());
}

#[test]
fn test_with_weights_rejects_wrong_shape() {
    let mut rng = StdRng::seed_from_u64(5);
    let layer = DenseLayer::new(2, 1, Activation::Linear, WeightInit::Zeros, &mut rng);
    assert!(layer.clone().with_weights(array![[1.0, 2.0]]).is_err());
    assert!(layer.clone().with_biases(array![1.0, 2.0]).is_err());
    let layer = layer.with_weights(array![[1.0], [2.0]]).unwrap();
    assert_eq!(layer.weights, array![[1.0], [2.0]]);
}
