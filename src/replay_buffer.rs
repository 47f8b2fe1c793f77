use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Serialize, Deserialize};

use crate::error::{PolyakError, Result};

/// One environment step: `(state, action, reward, next_state, done)`.
///
/// `done` is `1.0` when the episode ended for any reason (termination or
/// truncation) and `0.0` otherwise.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub state: Array1<f32>,
    pub action: Array1<f32>,
    pub reward: f32,
    pub next_state: Array1<f32>,
    pub done: f32,
}

impl Transition {
    pub fn new(state: Array1<f32>, action: Array1<f32>, reward: f32, next_state: Array1<f32>, done: bool) -> Self {
        Transition {
            state,
            action,
            reward,
            next_state,
            done: if done { 1.0 } else { 0.0 },
        }
    }
}

/// A sampled minibatch. Row `i` of every array belongs to the same transition.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    pub states: Array2<f32>,
    pub actions: Array2<f32>,
    pub rewards: Array1<f32>,
    pub next_states: Array2<f32>,
    pub dones: Array1<f32>,
}

impl Batch {
    /// Stack transitions into row-aligned arrays
    pub fn from_transitions<'a, I>(transitions: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Transition>,
    {
        let transitions: Vec<&Transition> = transitions.into_iter().collect();
        let first = transitions.first().ok_or(PolyakError::InsufficientData {
            requested: 1,
            available: 0,
        })?;
        let (n, state_dim, action_dim) = (transitions.len(), first.state.len(), first.action.len());

        let mut states = Array2::zeros((n, state_dim));
        let mut actions = Array2::zeros((n, action_dim));
        let mut next_states = Array2::zeros((n, state_dim));
        let mut rewards = Array1::zeros(n);
        let mut dones = Array1::zeros(n);

        for (i, t) in transitions.iter().enumerate() {
            if t.state.len() != state_dim || t.next_state.len() != state_dim || t.action.len() != action_dim {
                return Err(PolyakError::dimension_mismatch(
                    format!("state {} / action {}", state_dim, action_dim),
                    format!("state {} / action {}", t.state.len(), t.action.len()),
                ));
            }
            states.row_mut(i).assign(&t.state);
            actions.row_mut(i).assign(&t.action);
            next_states.row_mut(i).assign(&t.next_state);
            rewards[i] = t.reward;
            dones[i] = t.done;
        }

        Ok(Batch { states, actions, rewards, next_states, dones })
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }
}

/// Fixed-capacity ring buffer of transitions with uniform sampling.
///
/// Once full, each `add` overwrites the oldest slot at the write cursor.
/// Sampling draws indices with replacement and never removes anything.
#[derive(Clone, Debug)]
pub struct ReplayBuffer {
    storage: Vec<Transition>,
    capacity: usize,
    cursor: usize,
    batch_size: usize,
    rng: StdRng,
}

impl ReplayBuffer {
    pub fn new(capacity: usize, batch_size: usize, seed: u64) -> Result<Self> {
        if capacity == 0 {
            return Err(PolyakError::configuration("replay buffer capacity must be greater than 0"));
        }
        if batch_size == 0 {
            return Err(PolyakError::configuration("replay buffer batch size must be greater than 0"));
        }
        Ok(ReplayBuffer {
            storage: Vec::with_capacity(capacity.min(1 << 16)),
            capacity,
            cursor: 0,
            batch_size,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Store a transition at the cursor and advance it modulo capacity.
    pub fn add(&mut self, transition: Transition) -> Result<()> {
        if let Some(first) = self.storage.first() {
            if first.state.len() != transition.state.len()
                || first.action.len() != transition.action.len()
                || first.next_state.len() != transition.next_state.len()
            {
                return Err(PolyakError::dimension_mismatch(
                    format!("state {} / action {}", first.state.len(), first.action.len()),
                    format!("state {} / action {}", transition.state.len(), transition.action.len()),
                ));
            }
        }

        if self.storage.len() < self.capacity {
            self.storage.push(transition);
        } else {
            self.storage[self.cursor] = transition;
        }
        self.cursor = (self.cursor + 1) % self.capacity;
        Ok(())
    }

    /// Sample a minibatch of the configured batch size.
    pub fn sample(&mut self) -> Result<Batch> {
        self.sample_batch(self.batch_size)
    }

    /// Sample `batch_size` transitions uniformly with replacement.
    pub fn sample_batch(&mut self, batch_size: usize) -> Result<Batch> {
        let available = self.storage.len();
        if batch_size == 0 || available < batch_size {
            return Err(PolyakError::InsufficientData {
                requested: batch_size,
                available,
            });
        }
        let indices: Vec<usize> = (0..batch_size).map(|_| self.rng.gen_range(0..available)).collect();
        Batch::from_transitions(indices.iter().map(|&i| &self.storage[i]))
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Slot the next `add` writes to
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Stored transitions in slot order
    pub fn as_slice(&self) -> &[Transition] {
        &self.storage
    }

    /// Stored transitions from oldest to newest
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = &Transition> {
        let split = if self.storage.len() == self.capacity { self.cursor } else { 0 };
        self.storage[split..].iter().chain(self.storage[..split].iter())
    }
}
