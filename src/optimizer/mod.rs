//! Gradient-descent optimizers.
//!
//! An optimizer is bound to one parameter set (one network, or both streams of a
//! twin critic) and applies a step from a freshly computed [`Gradients`] value.
//! There is no separate `zero_grad`: backward passes return new gradients rather
//! than accumulating into the parameters.

pub mod gradient_clipper;

use ndarray::{Array1, Array2};
use serde::{Serialize, Deserialize};

use crate::error::{PolyakError, Result};
use crate::layers::{DenseLayer, LayerGradients};
use crate::network::Gradients;

pub use gradient_clipper::GradientClipper;

pub trait Optimizer {
    /// Apply one update to `layers` using `gradients` (same order and shapes).
    fn step(&mut self, layers: &mut [&mut DenseLayer], gradients: &Gradients) -> Result<()>;

    fn learning_rate(&self) -> f32;
}

fn check_shapes(layers: &[&mut DenseLayer], gradients: &Gradients) -> Result<()> {
    if layers.len() != gradients.layers.len() {
        return Err(PolyakError::dimension_mismatch(
            format!("{} layer gradients", layers.len()),
            format!("{} layer gradients", gradients.layers.len()),
        ));
    }
    for (layer, grad) in layers.iter().zip(&gradients.layers) {
        if layer.weights.dim() != grad.weights.dim() || layer.biases.dim() != grad.biases.dim() {
            return Err(PolyakError::dimension_mismatch(
                format!("{:?}", layer.weights.dim()),
                format!("{:?}", grad.weights.dim()),
            ));
        }
    }
    Ok(())
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum OptimizerWrapper {
    SGD(SGD),
    Adam(Adam),
    RMSProp(RMSProp),
}

impl OptimizerWrapper {
    pub fn sgd(learning_rate: f32) -> Self {
        OptimizerWrapper::SGD(SGD::new(learning_rate))
    }

    pub fn adam(learning_rate: f32) -> Self {
        OptimizerWrapper::Adam(Adam::default(learning_rate))
    }

    pub fn rmsprop(learning_rate: f32) -> Self {
        OptimizerWrapper::RMSProp(RMSProp::default(learning_rate))
    }
}

impl Optimizer for OptimizerWrapper {
    fn step(&mut self, layers: &mut [&mut DenseLayer], gradients: &Gradients) -> Result<()> {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.step(layers, gradients),
            OptimizerWrapper::Adam(optimizer) => optimizer.step(layers, gradients),
            OptimizerWrapper::RMSProp(optimizer) => optimizer.step(layers, gradients),
        }
    }

    fn learning_rate(&self) -> f32 {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.learning_rate(),
            OptimizerWrapper::Adam(optimizer) => optimizer.learning_rate(),
            OptimizerWrapper::RMSProp(optimizer) => optimizer.learning_rate(),
        }
    }
}

/// Plain stochastic gradient descent
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SGD {
    pub learning_rate: f32,
}

impl SGD {
    pub fn new(learning_rate: f32) -> SGD {
        SGD { learning_rate }
    }
}

impl Optimizer for SGD {
    fn step(&mut self, layers: &mut [&mut DenseLayer], gradients: &Gradients) -> Result<()> {
        check_shapes(layers, gradients)?;
        let lr = self.learning_rate;
        for (layer, grad) in layers.iter_mut().zip(&gradients.layers) {
            layer.weights.zip_mut_with(&grad.weights, |w, &g| *w -= lr * g);
            layer.biases.zip_mut_with(&grad.biases, |b, &g| *b -= lr * g);
        }
        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}

/// Adam with bias correction. Moment buffers are created on the first step.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Adam {
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    m: Vec<LayerGradients>,
    v: Vec<LayerGradients>,
    pub t: i32,
}

impl Adam {
    pub fn new(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Adam {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            m: Vec::new(),
            v: Vec::new(),
            t: 0,
        }
    }

    pub fn default(learning_rate: f32) -> Self {
        Self::new(learning_rate, 0.9, 0.999, 1e-8)
    }

    fn adam_update<D: ndarray::Dimension>(
        param: &mut ndarray::Array<f32, D>,
        grad: &ndarray::Array<f32, D>,
        m: &mut ndarray::Array<f32, D>,
        v: &mut ndarray::Array<f32, D>,
        (beta1, beta2, epsilon, lr, t): (f32, f32, f32, f32, i32),
    ) {
        let bias1 = 1.0 - beta1.powi(t);
        let bias2 = 1.0 - beta2.powi(t);
        m.zip_mut_with(grad, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        v.zip_mut_with(grad, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);
        ndarray::Zip::from(param).and(&*m).and(&*v).for_each(|p, &m, &v| {
            let m_hat = m / bias1;
            let v_hat = v / bias2;
            *p -= lr * m_hat / (v_hat.sqrt() + epsilon);
        });
    }
}

impl Optimizer for Adam {
    fn step(&mut self, layers: &mut [&mut DenseLayer], gradients: &Gradients) -> Result<()> {
        check_shapes(layers, gradients)?;
        if self.m.len() != layers.len() {
            self.m = layers.iter().map(|l| LayerGradients::zeros_like(l)).collect();
            self.v = self.m.clone();
            self.t = 0;
        }
        self.t += 1;
        let hyper = (self.beta1, self.beta2, self.epsilon, self.learning_rate, self.t);

        for (i, (layer, grad)) in layers.iter_mut().zip(&gradients.layers).enumerate() {
            let (m, v) = (&mut self.m[i], &mut self.v[i]);
            Self::adam_update(&mut layer.weights, &grad.weights, &mut m.weights, &mut v.weights, hyper);
            Self::adam_update(&mut layer.biases, &grad.biases, &mut m.biases, &mut v.biases, hyper);
        }
        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}

/// RMSProp optimizer
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RMSProp {
    pub learning_rate: f32,
    pub alpha: f32,
    pub epsilon: f32,
    v_weights: Vec<Array2<f32>>,
    v_biases: Vec<Array1<f32>>,
}

impl RMSProp {
    pub fn new(learning_rate: f32, alpha: f32, epsilon: f32) -> Self {
        RMSProp {
            learning_rate,
            alpha,
            epsilon,
            v_weights: Vec::new(),
            v_biases: Vec::new(),
        }
    }

    pub fn default(learning_rate: f32) -> Self {
        Self::new(learning_rate, 0.99, 1e-8)
    }
}

impl Optimizer for RMSProp {
    fn step(&mut self, layers: &mut [&mut DenseLayer], gradients: &Gradients) -> Result<()> {
        check_shapes(layers, gradients)?;
        if self.v_weights.len() != layers.len() {
            self.v_weights = layers.iter().map(|l| Array2::zeros(l.weights.dim())).collect();
            self.v_biases = layers.iter().map(|l| Array1::zeros(l.biases.dim())).collect();
        }
        let (alpha, eps, lr) = (self.alpha, self.epsilon, self.learning_rate);

        for (i, (layer, grad)) in layers.iter_mut().zip(&gradients.layers).enumerate() {
            let v = &mut self.v_weights[i];
            v.zip_mut_with(&grad.weights, |v, &g| *v = alpha * *v + (1.0 - alpha) * g * g);
            ndarray::Zip::from(&mut layer.weights).and(&grad.weights).and(&*v)
                .for_each(|w, &g, &v| *w -= lr * g / (v.sqrt() + eps));

            let v = &mut self.v_biases[i];
            v.zip_mut_with(&grad.biases, |v, &g| *v = alpha * *v + (1.0 - alpha) * g * g);
            ndarray::Zip::from(&mut layer.biases).and(&grad.biases).and(&*v)
                .for_each(|b, &g, &v| *b -= lr * g / (v.sqrt() + eps));
        }
        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}
