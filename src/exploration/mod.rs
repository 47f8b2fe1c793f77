//! Action-selection strategies layered over a model.
//!
//! Each strategy owns only its scalar schedule state; the random generator is
//! passed in by the caller so that noise draws stay independent of any other
//! component's use of randomness.
//!
//! ```
//! use polyak::exploration::{ExplorationStrategy, NormalNoiseDecayStrategy};
//! use polyak::network::NeuralNetwork;
//! use polyak::activations::Activation;
//! use polyak::types::ActionBounds;
//! use ndarray::array;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(0);
//! let model = NeuralNetwork::mlp(3, &[8], 1, Activation::Tanh, &mut rng).unwrap();
//! let bounds = ActionBounds::new(array![-2.0], array![2.0]).unwrap();
//! let mut strategy = ExplorationStrategy::NormalNoiseDecay(
//!     NormalNoiseDecayStrategy::new(bounds.clone(), 0.5, 0.1, 1000).unwrap(),
//! );
//!
//! let action = strategy
//!     .select_action(&model, array![0.1, 0.2, 0.3].view(), false, &mut rng)
//!     .unwrap();
//! assert!(bounds.contains(action.to_continuous().unwrap().view()));
//! ```

pub mod continuous;
pub mod discrete;
pub mod schedule;

use ndarray::{Array1, ArrayView1};
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::error::Result;
use crate::network::NeuralNetwork;
use crate::types::Action;

pub use continuous::{GreedyStrategy, NormalNoiseDecayStrategy};
pub use discrete::{EGreedyExpStrategy, EGreedyLinearStrategy, EGreedyStrategy, SoftMaxStrategy};

/// Inference-only view of a model: one state in, one output vector out.
pub trait Model {
    fn predict(&self, state: ArrayView1<f32>) -> Array1<f32>;
}

impl Model for NeuralNetwork {
    fn predict(&self, state: ArrayView1<f32>) -> Array1<f32> {
        self.forward(state)
    }
}

/// The available strategies, dispatched by variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ExplorationStrategy {
    Greedy(GreedyStrategy),
    NormalNoiseDecay(NormalNoiseDecayStrategy),
    EGreedy(EGreedyStrategy),
    EGreedyLinear(EGreedyLinearStrategy),
    EGreedyExp(EGreedyExpStrategy),
    SoftMax(SoftMaxStrategy),
}

impl ExplorationStrategy {
    /// Pick an action for `state`.
    ///
    /// `max_exploration` asks for the most exploratory behaviour the variant
    /// has (used while the replay buffer warms up); it is ignored by `Greedy`.
    /// Decaying variants advance their counter exactly once per call.
    pub fn select_action<M: Model + ?Sized, R: Rng + ?Sized>(
        &mut self,
        model: &M,
        state: ArrayView1<f32>,
        max_exploration: bool,
        rng: &mut R,
    ) -> Result<Action> {
        match self {
            ExplorationStrategy::Greedy(s) => s.select_action(model, state),
            ExplorationStrategy::NormalNoiseDecay(s) => s.select_action(model, state, max_exploration, rng),
            ExplorationStrategy::EGreedy(s) => s.select_action(model, state, max_exploration, rng),
            ExplorationStrategy::EGreedyLinear(s) => s.select_action(model, state, max_exploration, rng),
            ExplorationStrategy::EGreedyExp(s) => s.select_action(model, state, max_exploration, rng),
            ExplorationStrategy::SoftMax(s) => s.select_action(model, state, max_exploration, rng),
        }
    }

    /// Whether the last discrete selection deviated from the greedy action
    pub fn exploratory_action_taken(&self) -> Option<bool> {
        match self {
            ExplorationStrategy::EGreedy(s) => Some(s.exploratory_action_taken()),
            ExplorationStrategy::EGreedyLinear(s) => Some(s.exploratory_action_taken()),
            ExplorationStrategy::EGreedyExp(s) => Some(s.exploratory_action_taken()),
            ExplorationStrategy::SoftMax(s) => Some(s.exploratory_action_taken()),
            ExplorationStrategy::Greedy(_) | ExplorationStrategy::NormalNoiseDecay(_) => None,
        }
    }

    /// Current value of the decaying parameter (noise ratio, epsilon or temperature)
    pub fn exploration_parameter(&self) -> Option<f32> {
        match self {
            ExplorationStrategy::Greedy(_) => None,
            ExplorationStrategy::NormalNoiseDecay(s) => Some(s.noise_ratio()),
            ExplorationStrategy::EGreedy(s) => Some(s.epsilon()),
            ExplorationStrategy::EGreedyLinear(s) => Some(s.epsilon()),
            ExplorationStrategy::EGreedyExp(s) => Some(s.epsilon()),
            ExplorationStrategy::SoftMax(s) => Some(s.temperature()),
        }
    }
}
