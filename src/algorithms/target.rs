use serde::{Serialize, Deserialize};

use crate::error::{PolyakError, Result};
use crate::network::Parameterized;

/// How a target network follows its online twin
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum SyncMode {
    /// `target = (1 - tau) * target + tau * online`, elementwise
    Polyak { tau: f32 },
    /// `target = online`
    Hard,
}

/// An online network and its slow-moving target copy.
///
/// The target starts as an exact copy, so both always share one architecture.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TargetPair<N> {
    pub online: N,
    pub target: N,
}

impl<N: Parameterized + Clone> TargetPair<N> {
    pub fn new(online: N) -> Self {
        let target = online.clone();
        TargetPair { online, target }
    }
}

impl<N: Parameterized> TargetPair<N> {
    /// Mix `tau` of the online parameters into the target.
    pub fn polyak(&mut self, tau: f32) -> Result<()> {
        if !(tau > 0.0 && tau <= 1.0) {
            return Err(PolyakError::configuration(format!("tau must lie in (0, 1], got {}", tau)));
        }
        let online = self.online.layers();
        let target = self.target.layers_mut();
        if online.len() != target.len() {
            return Err(PolyakError::dimension_mismatch(
                format!("{} layers", online.len()),
                format!("{} layers", target.len()),
            ));
        }
        for (t, o) in target.into_iter().zip(online) {
            if t.weights.dim() != o.weights.dim() || t.biases.dim() != o.biases.dim() {
                return Err(PolyakError::dimension_mismatch(
                    format!("{:?}", o.weights.dim()),
                    format!("{:?}", t.weights.dim()),
                ));
            }
            t.weights.zip_mut_with(&o.weights, |t, &o| *t = (1.0 - tau) * *t + tau * o);
            t.biases.zip_mut_with(&o.biases, |t, &o| *t = (1.0 - tau) * *t + tau * o);
        }
        Ok(())
    }

    /// Overwrite the target with the online parameters.
    pub fn hard_copy(&mut self) -> Result<()> {
        let snapshot = self.online.state_dict();
        self.target.load_state_dict(&snapshot)
    }

    pub fn sync(&mut self, mode: SyncMode) -> Result<()> {
        match mode {
            SyncMode::Polyak { tau } => self.polyak(tau),
            SyncMode::Hard => self.hard_copy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activations::Activation;
    use crate::layers::{DenseLayer, WeightInit};
    use crate::network::NeuralNetwork;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scalar_net(value: f32) -> NeuralNetwork {
        let mut rng = StdRng::seed_from_u64(0);
        let layer = DenseLayer::new(1, 1, Activation::Linear, WeightInit::Zeros, &mut rng)
            .with_weights(array![[value]])
            .unwrap()
            .with_biases(array![value])
            .unwrap();
        NeuralNetwork { layers: vec![layer] }
    }

    #[test]
    fn test_polyak_mixes_exactly() {
        let mut pair = TargetPair { online: scalar_net(2.0), target: scalar_net(1.0) };
        pair.sync(SyncMode::Polyak { tau: 0.01 }).unwrap();
        assert!((pair.target.layers[0].weights[[0, 0]] - 1.01).abs() < 1e-6);
        assert!((pair.target.layers[0].biases[0] - 1.01).abs() < 1e-6);
        assert_eq!(pair.online.layers[0].weights[[0, 0]], 2.0);
    }

    #[test]
    fn test_hard_copy() {
        let mut pair = TargetPair { online: scalar_net(2.0), target: scalar_net(1.0) };
        pair.sync(SyncMode::Hard).unwrap();
        assert_eq!(pair.target.layers[0].weights, pair.online.layers[0].weights);
    }

    #[test]
    fn test_new_starts_identical() {
        let mut rng = StdRng::seed_from_u64(5);
        let net = NeuralNetwork::mlp(3, &[4], 2, Activation::Linear, &mut rng).unwrap();
        let pair = TargetPair::new(net);
        assert_eq!(pair.online.state_dict(), pair.target.state_dict());
    }

    #[test]
    fn test_tau_out_of_range() {
        let mut pair = TargetPair::new(scalar_net(1.0));
        assert!(pair.polyak(0.0).is_err());
        assert!(pair.polyak(1.5).is_err());
    }
}
