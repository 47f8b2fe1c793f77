//! Function approximators used by the actor-critic agents.
//!
//! Each model wraps one or more [`NeuralNetwork`]s and exposes its parameters
//! through [`Parameterized`], so optimizers and target syncing never need to
//! know which architecture they are working on.

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activations::{argmax, softmax, Activation};
use crate::error::{PolyakError, Result};
use crate::exploration::Model;
use crate::layers::DenseLayer;
use crate::network::{concat_columns, Gradients, NeuralNetwork, Parameterized};
use crate::types::ActionBounds;

/// Deterministic policy: ReLU hidden layers and a tanh output rescaled from
/// `[-1, 1]` onto the action bounds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeterministicPolicy {
    net: NeuralNetwork,
    bounds: ActionBounds,
}

impl DeterministicPolicy {
    pub fn new<R: Rng + ?Sized>(state_dim: usize, bounds: ActionBounds, hidden_dims: &[usize], rng: &mut R) -> Result<Self> {
        let net = NeuralNetwork::mlp(state_dim, hidden_dims, bounds.dim(), Activation::Tanh, rng)?;
        Ok(DeterministicPolicy { net, bounds })
    }

    pub fn bounds(&self) -> &ActionBounds {
        &self.bounds
    }

    pub fn state_dim(&self) -> usize {
        self.net.input_size()
    }

    pub fn action_dim(&self) -> usize {
        self.bounds.dim()
    }

    pub fn network(&self) -> &NeuralNetwork {
        &self.net
    }

    fn half_range(&self) -> Array1<f32> {
        self.bounds.range() * 0.5
    }

    fn rescale(&self, mut squashed: Array2<f32>) -> Array2<f32> {
        let half_range = self.half_range();
        for mut row in squashed.axis_iter_mut(Axis(0)) {
            ndarray::Zip::from(&mut row)
                .and(self.bounds.low())
                .and(&half_range)
                .for_each(|a, &low, &half| *a = low + (*a + 1.0) * half);
        }
        squashed
    }

    /// Actions for a batch of states, without caching
    pub fn predict_batch(&self, states: ArrayView2<f32>) -> Array2<f32> {
        self.rescale(self.net.predict_batch(states))
    }

    /// Actions for a batch of states, caching for [`DeterministicPolicy::backward_batch`]
    pub fn forward_batch(&mut self, states: ArrayView2<f32>) -> Array2<f32> {
        let squashed = self.net.forward_batch(states);
        self.rescale(squashed)
    }

    /// Backpropagate `dL/daction` through the rescale and the network.
    pub fn backward_batch(&self, action_errors: ArrayView2<f32>) -> Result<(Gradients, Array2<f32>)> {
        let squashed_errors = &action_errors * &self.half_range().insert_axis(Axis(0));
        self.net.backward_batch(squashed_errors.view())
    }
}

impl Model for DeterministicPolicy {
    fn predict(&self, state: ArrayView1<f32>) -> Array1<f32> {
        self.predict_batch(state.insert_axis(Axis(0))).index_axis_move(Axis(0), 0)
    }
}

impl Parameterized for DeterministicPolicy {
    fn layers(&self) -> Vec<&DenseLayer> {
        self.net.layers()
    }

    fn layers_mut(&mut self) -> Vec<&mut DenseLayer> {
        self.net.layers_mut()
    }
}

/// Two independent Q-value streams over `concat(state, action)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TwinCritic {
    stream_a: NeuralNetwork,
    stream_b: NeuralNetwork,
    state_dim: usize,
}

impl TwinCritic {
    pub fn new<R: Rng + ?Sized>(state_dim: usize, action_dim: usize, hidden_dims: &[usize], rng: &mut R) -> Result<Self> {
        let stream_a = NeuralNetwork::mlp(state_dim + action_dim, hidden_dims, 1, Activation::Linear, rng)?;
        let stream_b = NeuralNetwork::mlp(state_dim + action_dim, hidden_dims, 1, Activation::Linear, rng)?;
        Ok(TwinCritic { stream_a, stream_b, state_dim })
    }

    pub fn stream_a(&self) -> &NeuralNetwork {
        &self.stream_a
    }

    pub fn stream_b(&self) -> &NeuralNetwork {
        &self.stream_b
    }

    fn inputs(&self, states: ArrayView2<f32>, actions: ArrayView2<f32>) -> Result<Array2<f32>> {
        if states.ncols() != self.state_dim || states.ncols() + actions.ncols() != self.stream_a.input_size() {
            return Err(PolyakError::dimension_mismatch(
                format!("{} state+action columns", self.stream_a.input_size()),
                format!("{}+{}", states.ncols(), actions.ncols()),
            ));
        }
        concat_columns(states, actions)
    }

    fn column(values: Array2<f32>) -> Array1<f32> {
        values.index_axis_move(Axis(1), 0)
    }

    /// `(Qa, Qb)` for each row, without caching
    pub fn forward(&self, states: ArrayView2<f32>, actions: ArrayView2<f32>) -> Result<(Array1<f32>, Array1<f32>)> {
        let x = self.inputs(states, actions)?;
        Ok((
            Self::column(self.stream_a.predict_batch(x.view())),
            Self::column(self.stream_b.predict_batch(x.view())),
        ))
    }

    /// `Qa` alone, without caching
    pub fn qa(&self, states: ArrayView2<f32>, actions: ArrayView2<f32>) -> Result<Array1<f32>> {
        let x = self.inputs(states, actions)?;
        Ok(Self::column(self.stream_a.predict_batch(x.view())))
    }

    /// `(Qa, Qb)`, caching both streams for [`TwinCritic::backward`]
    pub fn forward_batch(&mut self, states: ArrayView2<f32>, actions: ArrayView2<f32>) -> Result<(Array1<f32>, Array1<f32>)> {
        let x = self.inputs(states, actions)?;
        Ok((
            Self::column(self.stream_a.forward_batch(x.view())),
            Self::column(self.stream_b.forward_batch(x.view())),
        ))
    }

    /// `Qa`, caching stream a for [`TwinCritic::action_gradient`]
    pub fn qa_forward_batch(&mut self, states: ArrayView2<f32>, actions: ArrayView2<f32>) -> Result<Array1<f32>> {
        let x = self.inputs(states, actions)?;
        Ok(Self::column(self.stream_a.forward_batch(x.view())))
    }

    /// Parameter gradients of both streams given `dL/dQa` and `dL/dQb`.
    pub fn backward(&self, qa_errors: ArrayView1<f32>, qb_errors: ArrayView1<f32>) -> Result<Gradients> {
        let (grad_a, _) = self.stream_a.backward_batch(qa_errors.insert_axis(Axis(1)))?;
        let (grad_b, _) = self.stream_b.backward_batch(qb_errors.insert_axis(Axis(1)))?;
        Ok(Gradients::chain(vec![grad_a, grad_b]))
    }

    /// `dL/daction` given `dL/dQa`, from the last [`TwinCritic::qa_forward_batch`].
    pub fn action_gradient(&self, qa_errors: ArrayView1<f32>) -> Result<Array2<f32>> {
        let (_, input_errors) = self.stream_a.backward_batch(qa_errors.insert_axis(Axis(1)))?;
        Ok(input_errors.slice(s![.., self.state_dim..]).to_owned())
    }
}

impl Parameterized for TwinCritic {
    fn layers(&self) -> Vec<&DenseLayer> {
        self.stream_a.layers.iter().chain(self.stream_b.layers.iter()).collect()
    }

    fn layers_mut(&mut self) -> Vec<&mut DenseLayer> {
        self.stream_a.layers.iter_mut().chain(self.stream_b.layers.iter_mut()).collect()
    }
}

/// One stochastic step of a [`CategoricalPolicy`]
#[derive(Clone, Debug, PartialEq)]
pub struct PolicySample {
    pub action: usize,
    pub log_prob: f32,
    pub entropy: f32,
}

/// Softmax policy over a discrete action set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CategoricalPolicy {
    net: NeuralNetwork,
}

impl CategoricalPolicy {
    pub fn new<R: Rng + ?Sized>(state_dim: usize, n_actions: usize, hidden_dims: &[usize], rng: &mut R) -> Result<Self> {
        let net = NeuralNetwork::mlp(state_dim, hidden_dims, n_actions, Activation::Linear, rng)?;
        Ok(CategoricalPolicy { net })
    }

    pub fn n_actions(&self) -> usize {
        self.net.output_size()
    }

    pub fn probabilities(&self, state: ArrayView1<f32>) -> Array1<f32> {
        softmax(self.net.forward(state).view())
    }

    /// Sample an action and report its log-probability and the policy entropy.
    pub fn full_pass<R: Rng + ?Sized>(&self, state: ArrayView1<f32>, rng: &mut R) -> Result<PolicySample> {
        let probs = self.probabilities(state);
        let dist = WeightedIndex::new(probs.iter().copied()).map_err(|e| PolyakError::Numerical(e.to_string()))?;
        let action = dist.sample(rng);
        Ok(PolicySample {
            action,
            log_prob: probs[action].max(f32::MIN_POSITIVE).ln(),
            entropy: entropy(probs.view()),
        })
    }

    pub fn select_action<R: Rng + ?Sized>(&self, state: ArrayView1<f32>, rng: &mut R) -> Result<usize> {
        Ok(self.full_pass(state, rng)?.action)
    }

    pub fn select_greedy_action(&self, state: ArrayView1<f32>) -> usize {
        argmax(self.net.forward(state).view())
    }

    /// Logits for a batch of states, cached for [`CategoricalPolicy::backward_batch`]
    pub fn forward_batch(&mut self, states: ArrayView2<f32>) -> Array2<f32> {
        self.net.forward_batch(states)
    }

    pub fn backward_batch(&self, logit_errors: ArrayView2<f32>) -> Result<Gradients> {
        Ok(self.net.backward_batch(logit_errors)?.0)
    }
}

/// Shannon entropy of a probability vector (natural log)
pub fn entropy(probs: ArrayView1<f32>) -> f32 {
    -probs.iter().filter(|&&p| p > 0.0).map(|&p| p * p.ln()).sum::<f32>()
}

impl Model for CategoricalPolicy {
    fn predict(&self, state: ArrayView1<f32>) -> Array1<f32> {
        self.net.forward(state)
    }
}

impl Parameterized for CategoricalPolicy {
    fn layers(&self) -> Vec<&DenseLayer> {
        self.net.layers()
    }

    fn layers_mut(&mut self) -> Vec<&mut DenseLayer> {
        self.net.layers_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn bounds() -> ActionBounds {
        ActionBounds::new(array![-2.0, 0.0], array![2.0, 1.0]).unwrap()
    }

    #[test]
    fn test_policy_output_within_bounds() {
        let mut rng = StdRng::seed_from_u64(0);
        let policy = DeterministicPolicy::new(3, bounds(), &[16], &mut rng).unwrap();
        let states = Array2::from_shape_fn((20, 3), |(i, j)| (i as f32 - 10.0) * (j as f32 + 1.0));
        for row in policy.predict_batch(states.view()).rows() {
            assert!(bounds().contains(row));
        }
    }

    #[test]
    fn test_policy_cached_and_uncached_agree() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut policy = DeterministicPolicy::new(3, bounds(), &[8], &mut rng).unwrap();
        let states = array![[0.1, 0.2, 0.3], [-0.5, 0.0, 1.0]];
        assert_eq!(policy.predict_batch(states.view()), policy.forward_batch(states.view()));
    }

    #[test]
    fn test_twin_streams_are_independent() {
        let mut rng = StdRng::seed_from_u64(2);
        let critic = TwinCritic::new(3, 2, &[8], &mut rng).unwrap();
        let states = array![[0.1, 0.2, 0.3]];
        let actions = array![[0.5, -0.5]];
        let (qa, qb) = critic.forward(states.view(), actions.view()).unwrap();
        assert_ne!(qa, qb);
        assert_eq!(critic.qa(states.view(), actions.view()).unwrap(), qa);
        assert_eq!(critic.layers().len(), 4);
    }

    #[test]
    fn test_twin_critic_rejects_wrong_action_width() {
        let mut rng = StdRng::seed_from_u64(2);
        let critic = TwinCritic::new(3, 2, &[8], &mut rng).unwrap();
        assert!(critic.forward(array![[0.0, 0.0, 0.0]].view(), array![[0.0]].view()).is_err());
    }

    #[test]
    fn test_action_gradient_shape() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut critic = TwinCritic::new(3, 2, &[8], &mut rng).unwrap();
        let states = Array2::zeros((4, 3));
        let actions = Array2::ones((4, 2));
        critic.qa_forward_batch(states.view(), actions.view()).unwrap();
        let grad = critic.action_gradient(Array1::from_elem(4, -0.25).view()).unwrap();
        assert_eq!(grad.dim(), (4, 2));
    }

    #[test]
    fn test_categorical_full_pass() {
        let mut rng = StdRng::seed_from_u64(4);
        let policy = CategoricalPolicy::new(4, 2, &[8], &mut rng).unwrap();
        let sample = policy.full_pass(array![0.1, 0.0, -0.1, 0.2].view(), &mut rng).unwrap();
        assert!(sample.action < 2);
        assert!(sample.log_prob <= 0.0);
        assert!(sample.entropy >= 0.0 && sample.entropy <= (2.0f32).ln() + 1e-6);
    }
}
