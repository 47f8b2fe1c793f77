use ndarray::{Array2, ArrayView2};

/// Trait defining the interface for loss functions over batches
pub trait Loss: Send + Sync {
    /// Compute the loss for a batch of predictions and targets
    fn compute_batch(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> f32;

    /// Compute the gradient of the loss with respect to the predictions
    fn gradient_batch(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> Array2<f32>;
}

/// Halved mean squared error: `0.5 * mean((p - t)^2)`.
///
/// The gradient is `(p - t) / N` where `N` is the number of elements.
pub struct MSE;

impl Loss for MSE {
    fn compute_batch(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> f32 {
        let diff = &predictions - &targets;
        0.5 * diff.mapv(|d| d * d).mean().unwrap_or(0.0)
    }

    fn gradient_batch(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> Array2<f32> {
        let n = predictions.len().max(1) as f32;
        (&predictions - &targets) / n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_mse_value_and_gradient() {
        let p = array![[1.0], [3.0]];
        let t = array![[0.0], [1.0]];

        assert!((MSE.compute_batch(p.view(), t.view()) - 1.25).abs() < 1e-6);
        assert_eq!(MSE.gradient_batch(p.view(), t.view()), array![[0.5], [1.0]]);
    }
}
