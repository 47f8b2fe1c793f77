//! Environment interface consumed by the agents, plus two classic-control tasks.

pub mod cartpole;
pub mod pendulum;

use ndarray::Array1;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::types::{Action, ActionBounds};

pub use cartpole::CartPole;
pub use pendulum::Pendulum;

/// Free-form diagnostics returned by `reset` and `step`
pub type Info = BTreeMap<String, f32>;

/// Outcome of one environment step
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    pub next_state: Array1<f32>,
    pub reward: f32,
    /// The task reached a terminal state
    pub terminated: bool,
    /// The episode was cut off, e.g. by a step limit
    pub truncated: bool,
    pub info: Info,
}

impl Step {
    /// The episode is over for either reason
    pub fn is_done(&self) -> bool {
        self.terminated || self.truncated
    }
}

pub trait Environment {
    /// Start a new episode. A seed reseeds the environment's own generator.
    fn reset(&mut self, seed: Option<u64>) -> Result<(Array1<f32>, Info)>;

    fn step(&mut self, action: &Action) -> Result<Step>;

    fn observation_dim(&self) -> usize;

    fn close(&mut self) {}
}

pub trait ContinuousEnvironment: Environment {
    /// Per-dimension `(low, high)` of the action space
    fn action_bounds(&self) -> Result<ActionBounds>;
}

pub trait DiscreteEnvironment: Environment {
    fn n_actions(&self) -> usize;
}
