use ndarray::{Array1, ArrayView1};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activations::{argmax, softmax};
use crate::error::{PolyakError, Result};
use crate::types::Action;
use super::schedule::{exponential_decay, linear_decay, softmax_temperature};
use super::Model;

fn q_values<M: Model + ?Sized>(model: &M, state: ArrayView1<f32>) -> Result<Array1<f32>> {
    let q = model.predict(state);
    if q.is_empty() {
        return Err(PolyakError::invalid_parameter("model", "produced no action values"));
    }
    Ok(q)
}

/// Returns the chosen index and whether it differs from the greedy one.
fn epsilon_greedy<R: Rng + ?Sized>(q: &Array1<f32>, epsilon: f32, rng: &mut R) -> (usize, bool) {
    let greedy = argmax(q.view());
    let action = if rng.gen::<f32>() > epsilon {
        greedy
    } else {
        rng.gen_range(0..q.len())
    };
    (action, action != greedy)
}

/// Epsilon-greedy with a fixed epsilon
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EGreedyStrategy {
    epsilon: f32,
    exploratory_action_taken: bool,
}

impl EGreedyStrategy {
    pub fn new(epsilon: f32) -> Self {
        EGreedyStrategy { epsilon, exploratory_action_taken: false }
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    pub fn exploratory_action_taken(&self) -> bool {
        self.exploratory_action_taken
    }

    pub fn select_action<M: Model + ?Sized, R: Rng + ?Sized>(
        &mut self,
        model: &M,
        state: ArrayView1<f32>,
        max_exploration: bool,
        rng: &mut R,
    ) -> Result<Action> {
        let q = q_values(model, state)?;
        let epsilon = if max_exploration { 1.0 } else { self.epsilon };
        let (action, explored) = epsilon_greedy(&q, epsilon, rng);
        self.exploratory_action_taken = explored;
        Ok(Action::Discrete(action))
    }
}

impl Default for EGreedyStrategy {
    fn default() -> Self {
        Self::new(0.1)
    }
}

/// Epsilon-greedy with epsilon decaying linearly over `decay_steps` selections
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EGreedyLinearStrategy {
    init_epsilon: f32,
    min_epsilon: f32,
    decay_steps: usize,
    t: usize,
    epsilon: f32,
    exploratory_action_taken: bool,
}

impl EGreedyLinearStrategy {
    pub fn new(init_epsilon: f32, min_epsilon: f32, decay_steps: usize) -> Self {
        EGreedyLinearStrategy {
            init_epsilon,
            min_epsilon,
            decay_steps,
            t: 0,
            epsilon: init_epsilon,
            exploratory_action_taken: false,
        }
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    pub fn steps(&self) -> usize {
        self.t
    }

    pub fn exploratory_action_taken(&self) -> bool {
        self.exploratory_action_taken
    }

    pub fn select_action<M: Model + ?Sized, R: Rng + ?Sized>(
        &mut self,
        model: &M,
        state: ArrayView1<f32>,
        max_exploration: bool,
        rng: &mut R,
    ) -> Result<Action> {
        let q = q_values(model, state)?;
        self.epsilon = linear_decay(self.init_epsilon, self.min_epsilon, self.decay_steps, self.t);
        self.t += 1;

        let epsilon = if max_exploration { 1.0 } else { self.epsilon };
        let (action, explored) = epsilon_greedy(&q, epsilon, rng);
        self.exploratory_action_taken = explored;
        Ok(Action::Discrete(action))
    }
}

impl Default for EGreedyLinearStrategy {
    fn default() -> Self {
        Self::new(1.0, 0.1, 20_000)
    }
}

/// Epsilon-greedy with epsilon decaying exponentially over `decay_steps` selections
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EGreedyExpStrategy {
    init_epsilon: f32,
    min_epsilon: f32,
    decay_steps: usize,
    t: usize,
    epsilon: f32,
    exploratory_action_taken: bool,
}

impl EGreedyExpStrategy {
    pub fn new(init_epsilon: f32, min_epsilon: f32, decay_steps: usize) -> Self {
        EGreedyExpStrategy {
            init_epsilon,
            min_epsilon,
            decay_steps,
            t: 0,
            epsilon: init_epsilon,
            exploratory_action_taken: false,
        }
    }

    /// Epsilon the next selection will use (`init_epsilon` before the first)
    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    pub fn steps(&self) -> usize {
        self.t
    }

    pub fn exploratory_action_taken(&self) -> bool {
        self.exploratory_action_taken
    }

    pub fn select_action<M: Model + ?Sized, R: Rng + ?Sized>(
        &mut self,
        model: &M,
        state: ArrayView1<f32>,
        max_exploration: bool,
        rng: &mut R,
    ) -> Result<Action> {
        let q = q_values(model, state)?;
        let epsilon = if max_exploration { 1.0 } else { self.epsilon };
        let (action, explored) = epsilon_greedy(&q, epsilon, rng);
        self.exploratory_action_taken = explored;

        // Decay after selecting, so the first selection uses init_epsilon
        self.epsilon = exponential_decay(self.init_epsilon, self.min_epsilon, self.decay_steps, self.t);
        self.t += 1;
        Ok(Action::Discrete(action))
    }
}

impl Default for EGreedyExpStrategy {
    fn default() -> Self {
        Self::new(1.0, 0.1, 20_000)
    }
}

/// Boltzmann exploration over action values with a decaying temperature
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SoftMaxStrategy {
    init_temp: f32,
    min_temp: f32,
    exploration_ratio: f32,
    max_steps: usize,
    t: usize,
    temperature: f32,
    exploratory_action_taken: bool,
}

impl SoftMaxStrategy {
    pub fn new(init_temp: f32, min_temp: f32, exploration_ratio: f32, max_steps: usize) -> Result<Self> {
        if !(min_temp > 0.0 && min_temp <= init_temp) {
            return Err(PolyakError::configuration(format!(
                "softmax temperatures must satisfy 0 < min ({}) <= init ({})",
                min_temp, init_temp
            )));
        }
        Ok(SoftMaxStrategy {
            init_temp,
            min_temp,
            exploration_ratio,
            max_steps,
            t: 0,
            temperature: init_temp,
            exploratory_action_taken: false,
        })
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn steps(&self) -> usize {
        self.t
    }

    pub fn exploratory_action_taken(&self) -> bool {
        self.exploratory_action_taken
    }

    /// Action probabilities for `q` at temperature `temp`
    pub fn probabilities(q: ArrayView1<f32>, temp: f32) -> Result<Array1<f32>> {
        let probs = softmax(q.mapv(|v| v / temp).view());
        let total = probs.sum();
        if !total.is_finite() || (total - 1.0).abs() > 1e-4 {
            return Err(PolyakError::Numerical(format!(
                "softmax probabilities sum to {} instead of 1",
                total
            )));
        }
        Ok(probs)
    }

    pub fn select_action<M: Model + ?Sized, R: Rng + ?Sized>(
        &mut self,
        model: &M,
        state: ArrayView1<f32>,
        max_exploration: bool,
        rng: &mut R,
    ) -> Result<Action> {
        let q = q_values(model, state)?;
        self.temperature = softmax_temperature(self.init_temp, self.min_temp, self.max_steps, self.exploration_ratio, self.t);
        self.t += 1;

        let action = if max_exploration {
            rng.gen_range(0..q.len())
        } else {
            let probs = Self::probabilities(q.view(), self.temperature)?;
            let dist = WeightedIndex::new(probs.iter().copied())
                .map_err(|e| PolyakError::Numerical(e.to_string()))?;
            dist.sample(rng)
        };
        self.exploratory_action_taken = action != argmax(q.view());
        Ok(Action::Discrete(action))
    }
}

impl Default for SoftMaxStrategy {
    fn default() -> Self {
        SoftMaxStrategy {
            init_temp: 1.0,
            min_temp: 0.3,
            exploration_ratio: 0.8,
            max_steps: 25_000,
            t: 0,
            temperature: 1.0,
            exploratory_action_taken: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Fixed(Array1<f32>);

    impl Model for Fixed {
        fn predict(&self, _state: ArrayView1<f32>) -> Array1<f32> {
            self.0.clone()
        }
    }

    #[test]
    fn test_zero_epsilon_is_greedy() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut strategy = EGreedyStrategy::new(0.0);
        let model = Fixed(array![0.0, 3.0, 1.0]);
        for _ in 0..50 {
            let action = strategy.select_action(&model, array![0.0].view(), false, &mut rng).unwrap();
            assert_eq!(action, Action::Discrete(1));
            assert!(!strategy.exploratory_action_taken());
        }
    }

    #[test]
    fn test_linear_epsilon_counts_each_selection_once() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut strategy = EGreedyLinearStrategy::new(1.0, 0.1, 10);
        let model = Fixed(array![0.0, 1.0]);
        for _ in 0..30 {
            strategy.select_action(&model, array![0.0].view(), false, &mut rng).unwrap();
        }
        assert_eq!(strategy.steps(), 30);
        assert_eq!(strategy.epsilon(), 0.1);
    }

    #[test]
    fn test_exp_epsilon_reaches_floor() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut strategy = EGreedyExpStrategy::new(1.0, 0.05, 20);
        let model = Fixed(array![0.0, 1.0]);
        for _ in 0..21 {
            strategy.select_action(&model, array![0.0].view(), false, &mut rng).unwrap();
        }
        assert_eq!(strategy.epsilon(), 0.05);
    }

    #[test]
    fn test_exp_first_selection_uses_init_epsilon() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut strategy = EGreedyExpStrategy::new(0.0, 0.0, 10);
        let model = Fixed(array![0.0, 1.0]);
        strategy.select_action(&model, array![0.0].view(), false, &mut rng).unwrap();
        assert!(!strategy.exploratory_action_taken());

        let mut strategy = EGreedyExpStrategy::new(1.0, 0.1, 100);
        assert_eq!(strategy.epsilon(), 1.0);
        strategy.select_action(&model, array![0.0].view(), false, &mut rng).unwrap();
        assert_eq!(strategy.epsilon(), exponential_decay(1.0, 0.1, 100, 0));
        strategy.select_action(&model, array![0.0].view(), false, &mut rng).unwrap();
        assert_eq!(strategy.epsilon(), exponential_decay(1.0, 0.1, 100, 1));
        assert_eq!(strategy.steps(), 2);
    }

    #[test]
    fn test_softmax_probabilities_normalised() {
        let probs = SoftMaxStrategy::probabilities(array![1000.0, 999.0, -5.0].view(), 0.3).unwrap();
        assert!((probs.sum() - 1.0).abs() < 1e-5);
        assert!(probs[0] > probs[1]);
    }

    #[test]
    fn test_softmax_rejects_nan_values() {
        assert!(SoftMaxStrategy::probabilities(array![f32::NAN, 1.0].view(), 1.0).is_err());
    }

    #[test]
    fn test_softmax_selection_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut strategy = SoftMaxStrategy::new(1.0, 0.3, 0.8, 100).unwrap();
        let model = Fixed(array![0.2, 0.1, 0.4, 0.3]);
        for _ in 0..100 {
            let action = strategy.select_action(&model, array![0.0].view(), false, &mut rng).unwrap();
            assert!(action.to_discrete().unwrap() < 4);
        }
        assert_eq!(strategy.temperature(), 0.3);
    }
}
